//! # Cartograph Common
//!
//! Common types shared by the Cartograph crates:
//! - Chunk, region, and slot coordinates
//! - Naming of a world's container files
//! - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod layout;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::layout::*;
}

pub use prelude::*;
