//! Core data types: addresses, index documents and errors.

pub mod address;
pub mod error;
pub mod package_index;

pub use address::Address;
pub use error::{Error, ErrorKind, Result};
pub use package_index::{Dist, PackageIndex, VersionRecord};
