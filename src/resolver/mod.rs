//! Version resolution.
//!
//! Turns the version part of an address (dist-tag, exact version or npm
//! range) into one exact published version. Resolution is pure: the
//! package index is fetched beforehand.

pub mod range;
pub mod version;

pub use range::VersionRange;
pub use version::{resolve, Resolution, ResolvedVersion};
