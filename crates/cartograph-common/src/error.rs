//! Error types for Cartograph.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for Cartograph operations.
#[derive(Debug, Error)]
pub enum CartographError {
    /// Container format errors
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument passed by a caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Reasons a region container yields no data for a slot.
///
/// Every variant is a soft failure: the loader logs it and treats the chunk
/// as having nothing to show yet.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Container missing or unopenable
    #[error("cannot open {path}: {source}")]
    Open {
        /// Container path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Container shorter than the location table
    #[error("header truncated: {len} bytes, need {needed}")]
    HeaderTruncated {
        /// Measured file size
        len: u64,
        /// Required size
        needed: u64,
    },

    /// Location entry has a zero sector offset
    #[error("slot {slot} is unallocated")]
    Unallocated {
        /// Slot index
        slot: usize,
    },

    /// Payload sub-header lies past the end of the file
    #[error("payload header at {offset} unreadable: file is {len} bytes")]
    SubHeaderTruncated {
        /// Byte offset of the sub-header
        offset: u64,
        /// Measured file size
        len: u64,
    },

    /// Declared length is zero or exceeds the reserved sectors
    #[error("declared length {declared} does not fit capacity {capacity}")]
    InvalidLength {
        /// Declared payload length
        declared: u32,
        /// Capacity reserved by the location table
        capacity: u64,
    },

    /// File ends before the declared payload does
    #[error("payload truncated: need {needed} bytes, file is {len}")]
    PayloadTruncated {
        /// Required file size
        needed: u64,
        /// Measured file size
        len: u64,
    },

    /// Read outside the validated bounds was requested
    #[error("range {offset}+{len} outside file of {file_len} bytes")]
    OutOfBounds {
        /// Start of the requested range
        offset: u64,
        /// Length of the requested range
        len: u64,
        /// Measured file size
        file_len: u64,
    },

    /// IO failure while reading a validated range
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    /// Whether this is an ordinary sparse-world outcome rather than damage.
    #[must_use]
    pub fn is_sparse(&self) -> bool {
        match self {
            Self::Open { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::Unallocated { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Result type alias for Cartograph operations.
pub type CartographResult<T> = Result<T, CartographError>;
