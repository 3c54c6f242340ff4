//! Error types for scene loading, packing and upload.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Asset file does not exist
    #[error("Asset not found: {0}")]
    AssetNotFound(PathBuf),

    /// Extension is neither OBJ nor glTF
    #[error("Unsupported asset format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Malformed record or unresolvable index reference
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Primitive that cannot be turned into triangles
    #[error("Unsupported topology in {path}: {topology}")]
    UnsupportedTopology { path: PathBuf, topology: String },

    /// BVH permutation does not cover the current triangle list
    #[error("BVH is stale: {permutation} permuted indices for {triangles} triangles")]
    StaleBvh { triangles: usize, permutation: usize },

    /// Buffer exceeds the device's storage binding limit
    #[error("{buffer} buffer needs {size} bytes, device allows {limit}")]
    BufferTooLarge {
        buffer: &'static str,
        size: u64,
        limit: u64,
    },

    #[error("GPU ran out of memory while allocating scene buffers")]
    OutOfMemory,

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
