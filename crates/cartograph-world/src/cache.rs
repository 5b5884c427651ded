//! Shared chunk cache.

use std::sync::Arc;

use cartograph_common::ChunkCoord;
use dashmap::DashMap;

use crate::chunk::StoredChunk;

/// Fetch-or-create access to shared chunk records.
pub trait ChunkCache: Send + Sync {
    /// Chunk record type handed to load tasks.
    type Chunk: Send + Sync + ?Sized;

    /// Returns the record for a coordinate, creating an empty one on first
    /// access. Concurrent callers for the same coordinate get the same record.
    fn fetch_cached(&self, coord: ChunkCoord) -> Arc<Self::Chunk>;
}

/// Default cache backed by a concurrent map. Records live until the map is
/// dropped.
pub struct ChunkMap<T> {
    chunks: DashMap<ChunkCoord, Arc<StoredChunk<T>>>,
}

impl<T> Default for ChunkMap<T> {
    fn default() -> Self {
        Self {
            chunks: DashMap::new(),
        }
    }
}

impl<T> ChunkMap<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an existing record without creating one.
    #[must_use]
    pub fn cached(&self, coord: ChunkCoord) -> Option<Arc<StoredChunk<T>>> {
        self.chunks.get(&coord).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the cache holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl<T: Send + Sync> ChunkCache for ChunkMap<T> {
    type Chunk = StoredChunk<T>;

    fn fetch_cached(&self, coord: ChunkCoord) -> Arc<StoredChunk<T>> {
        // The entry holds the shard lock, so racing first accesses create
        // exactly one record.
        let entry = self
            .chunks
            .entry(coord)
            .or_insert_with(|| Arc::new(StoredChunk::new(coord)));
        Arc::clone(entry.value())
    }
}

impl<T> std::fmt::Debug for ChunkMap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkMap")
            .field("len", &self.chunks.len())
            .finish()
    }
}
