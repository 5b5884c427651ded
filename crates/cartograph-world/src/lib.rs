//! # Cartograph World
//!
//! On-demand loading of a world's region containers into shared chunk
//! records.
//!
//! This crate handles:
//! - Reading location tables and payloads from region containers
//! - Dispatching decoded trees to chunk population
//! - A concurrent fetch-or-create chunk cache
//! - Asynchronous load tasks and their completion notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod chunk;
pub mod config;
pub mod decode;
pub mod events;
pub mod loader;
pub mod region;
pub mod task;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::*;
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::decode::*;
    pub use crate::events::*;
    pub use crate::loader::*;
    pub use crate::region::*;
    pub use crate::task::*;
}

pub use prelude::*;
