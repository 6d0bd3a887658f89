//! Converts SFF pyrosequencing reads into an assembler fragment-message
//! stream: decode, ingest, filter (quality, prefix-duplicates, linker
//! detection), then emit.

pub mod byte_reader;
pub mod config;
pub mod constants;
pub mod decompress;
pub mod emit;
pub mod error;
pub mod filters;
pub mod ingest;
pub mod library;
pub mod logging;
pub mod sff;
pub mod store;
pub mod tempstore;

pub use config::Config;
pub use error::{Result, SffError};
