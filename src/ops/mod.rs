//! High-level operations.
//!
//! This module contains the retrieval entry points: the buffered strategy
//! (`download_file`, `read_file`) and the streaming strategy
//! (`create_read_stream`).

pub mod inflight;
pub mod retrieve;
pub mod stream;

pub use inflight::ExtractionGate;
pub use retrieve::Retriever;
pub use stream::{FileStream, StreamOptions, DEFAULT_CHUNK_SIZE};
