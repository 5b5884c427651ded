//! Chunk records populated by load tasks.

use std::sync::Arc;

use cartograph_common::ChunkCoord;
use parking_lot::RwLock;

/// Receives decoded trees for one chunk.
///
/// Both calls may run more than once per load (a primary payload feeds
/// both) and concurrently with readers of the same chunk, so implementations
/// must publish each update atomically and tolerate overlapping data.
pub trait PopulateChunk<T>: Send + Sync {
    /// Populates block and other main data from a decoded tree.
    fn populate_main(&self, tree: Arc<T>);

    /// Populates entity data from a decoded tree.
    fn populate_entities(&self, tree: Arc<T>);
}

/// Immutable view of a chunk's loaded data.
#[derive(Debug)]
pub struct ChunkSnapshot<T> {
    /// Latest main tree
    pub main: Option<Arc<T>>,
    /// Latest entity tree
    pub entities: Option<Arc<T>>,
    /// Times main data was populated
    pub main_loads: u32,
    /// Times entity data was populated
    pub entity_loads: u32,
}

impl<T> Default for ChunkSnapshot<T> {
    fn default() -> Self {
        Self {
            main: None,
            entities: None,
            main_loads: 0,
            entity_loads: 0,
        }
    }
}

impl<T> Clone for ChunkSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            main: self.main.clone(),
            entities: self.entities.clone(),
            main_loads: self.main_loads,
            entity_loads: self.entity_loads,
        }
    }
}

/// Default chunk record: keeps the latest tree of each kind.
///
/// Entity population replaces the previous entity tree, so feeding the same
/// data twice is harmless and the dedicated entity container, loaded after
/// the primary one, wins.
#[derive(Debug)]
pub struct StoredChunk<T> {
    coord: ChunkCoord,
    state: RwLock<ChunkSnapshot<T>>,
}

impl<T> StoredChunk<T> {
    /// Creates an empty chunk record.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            state: RwLock::new(ChunkSnapshot::default()),
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Copies out the current state.
    #[must_use]
    pub fn snapshot(&self) -> ChunkSnapshot<T> {
        self.state.read().clone()
    }

    /// Whether main data has been populated.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.read().main.is_some()
    }

    /// Whether entity data has been populated.
    #[must_use]
    pub fn has_entities(&self) -> bool {
        self.state.read().entities.is_some()
    }
}

impl<T: Send + Sync> PopulateChunk<T> for StoredChunk<T> {
    fn populate_main(&self, tree: Arc<T>) {
        let mut state = self.state.write();
        state.main = Some(tree);
        state.main_loads = state.main_loads.saturating_add(1);
    }

    fn populate_entities(&self, tree: Arc<T>) {
        let mut state = self.state.write();
        state.entities = Some(tree);
        state.entity_loads = state.entity_loads.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_creation() {
        let chunk: StoredChunk<u32> = StoredChunk::new(ChunkCoord::new(3, -4));
        assert_eq!(chunk.coord(), ChunkCoord::new(3, -4));
        assert!(!chunk.is_loaded());
        assert!(!chunk.has_entities());
        assert_eq!(chunk.snapshot().main_loads, 0);
    }

    #[test]
    fn test_populate_replaces() {
        let chunk = StoredChunk::new(ChunkCoord::new(0, 0));
        chunk.populate_main(Arc::new(1));
        chunk.populate_entities(Arc::new(1));
        chunk.populate_entities(Arc::new(2));

        let snap = chunk.snapshot();
        assert_eq!(snap.main.as_deref(), Some(&1));
        assert_eq!(snap.entities.as_deref(), Some(&2));
        assert_eq!(snap.main_loads, 1);
        assert_eq!(snap.entity_loads, 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let chunk = StoredChunk::new(ChunkCoord::new(0, 0));
        let before = chunk.snapshot();
        chunk.populate_main(Arc::new("tree"));
        assert!(before.main.is_none());
        assert!(chunk.is_loaded());
    }

    #[test]
    fn test_concurrent_population_is_consistent() {
        let chunk = Arc::new(StoredChunk::new(ChunkCoord::new(0, 0)));
        let writers: Vec<_> = (0..8)
            .map(|i| {
                let chunk = Arc::clone(&chunk);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        chunk.populate_main(Arc::new(i));
                        let snap = chunk.snapshot();
                        assert!(snap.main.is_some());
                        assert!(snap.main_loads > 0);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer panicked");
        }
        assert_eq!(chunk.snapshot().main_loads, 800);
    }
}
