//! The load task: one chunk coordinate, read from disk into the cache.

use std::sync::Arc;

use cartograph_common::{ChunkCoord, ChunkLocation, ContainerKind, WorldLayout};
use tracing::{trace, warn};

use crate::cache::ChunkCache;
use crate::chunk::PopulateChunk;
use crate::decode::{dispatch, TagDecoder};
use crate::events::{ChunkLoaded, LoadEvents};
use crate::region::{read_location, read_payload};

/// Loads one chunk's payloads from a single container and dispatches them.
///
/// Returns `false` when the container has nothing usable for the chunk,
/// whether because it was never generated or because the container is
/// damaged. Returns `true` once a validated payload reached dispatch, even
/// if the decoder then rejected it.
pub fn load_from_container<D, C>(
    decoder: &D,
    location: &ChunkLocation,
    kind: ContainerKind,
    chunk: &C,
) -> bool
where
    D: TagDecoder + ?Sized,
    C: PopulateChunk<D::Tree> + ?Sized,
{
    let path = location.path(kind);

    let Some(entry) = read_location(path, location.slot) else {
        return false;
    };
    let Some(payload) = read_payload(path, entry) else {
        return false;
    };

    if let Err(e) = dispatch(decoder, &payload, kind, chunk) {
        warn!(
            "Failed to decode {} payload for chunk {}: {e}",
            kind.label(),
            location.chunk
        );
    }
    true
}

/// One unit of asynchronous loading work.
///
/// Runs to completion once started. Touches the cache exactly once and
/// always publishes a [`ChunkLoaded`] notification at the end.
pub struct LoadTask<D, C> {
    coord: ChunkCoord,
    layout: Arc<WorldLayout>,
    decoder: Arc<D>,
    cache: Arc<C>,
    events: Arc<LoadEvents>,
    separate_entities: bool,
}

impl<D, C> LoadTask<D, C>
where
    D: TagDecoder,
    C: ChunkCache,
    C::Chunk: PopulateChunk<D::Tree>,
{
    /// Creates a task for one coordinate.
    #[must_use]
    pub fn new(
        coord: ChunkCoord,
        layout: Arc<WorldLayout>,
        decoder: Arc<D>,
        cache: Arc<C>,
        events: Arc<LoadEvents>,
    ) -> Self {
        Self {
            coord,
            layout,
            decoder,
            cache,
            events,
            separate_entities: true,
        }
    }

    /// Sets whether the entity-only container is read after the primary one.
    #[must_use]
    pub fn with_separate_entities(mut self, enabled: bool) -> Self {
        self.separate_entities = enabled;
        self
    }

    /// Returns the coordinate this task loads.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Runs the task and returns whether the primary container supplied data.
    ///
    /// The entity container's outcome never affects the result.
    pub fn run(self) -> bool {
        let chunk = self.cache.fetch_cached(self.coord);
        let location = self.layout.locate(self.coord);

        let main_ok = load_from_container(
            self.decoder.as_ref(),
            &location,
            ContainerKind::Primary,
            chunk.as_ref(),
        );

        if self.separate_entities {
            let _ = load_from_container(
                self.decoder.as_ref(),
                &location,
                ContainerKind::EntitiesOnly,
                chunk.as_ref(),
            );
        }

        trace!("Load task for chunk {} finished (main: {main_ok})", self.coord);
        self.events.publish(ChunkLoaded { coord: self.coord });
        main_ok
    }
}

impl<D, C> std::fmt::Debug for LoadTask<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadTask")
            .field("coord", &self.coord)
            .field("root", &self.layout.root())
            .field("separate_entities", &self.separate_entities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ChunkMap;
    use crate::decode::testing::{CountingDecoder, RecordingChunk};
    use crate::region::{LocationEntry, RegionWriter};
    use dashmap::DashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Cache double handing out recording chunks and counting fetches.
    #[derive(Default)]
    struct RecordingCache {
        chunks: DashMap<ChunkCoord, Arc<RecordingChunk>>,
        fetches: AtomicUsize,
    }

    impl ChunkCache for RecordingCache {
        type Chunk = RecordingChunk;

        fn fetch_cached(&self, coord: ChunkCoord) -> Arc<RecordingChunk> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Arc::clone(self.chunks.entry(coord).or_default().value())
        }
    }

    struct Fixture {
        dir: TempDir,
        decoder: Arc<CountingDecoder>,
        cache: Arc<RecordingCache>,
        events: Arc<LoadEvents>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().expect("temp dir"),
                decoder: Arc::new(CountingDecoder::default()),
                cache: Arc::new(RecordingCache::default()),
                events: Arc::new(LoadEvents::new()),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn write(&self, kind: ContainerKind, coord: ChunkCoord, writer: &RegionWriter) {
            let path = WorldLayout::new(self.root()).container_path(kind, coord.region());
            writer.write_to(&path).expect("write container");
        }

        fn task(&self, coord: ChunkCoord) -> LoadTask<CountingDecoder, RecordingCache> {
            LoadTask::new(
                coord,
                Arc::new(WorldLayout::new(self.root())),
                Arc::clone(&self.decoder),
                Arc::clone(&self.cache),
                Arc::clone(&self.events),
            )
        }

        fn chunk(&self, coord: ChunkCoord) -> Arc<RecordingChunk> {
            self.cache.fetch_cached(coord)
        }
    }

    fn container(coord: ChunkCoord, body: &[u8]) -> RegionWriter {
        let mut writer = RegionWriter::new();
        writer.push(coord.slot(), 2, body).expect("push");
        writer
    }

    #[test]
    fn test_missing_primary_container() {
        let fx = Fixture::new();
        let rx = fx.events.subscribe();
        let coord = ChunkCoord::new(5, 5);

        assert!(!fx.task(coord).run());
        assert_eq!(fx.decoder.calls(), 0);
        assert_eq!(rx.try_recv().ok(), Some(ChunkLoaded { coord }));

        let chunk = fx.chunk(coord);
        assert!(chunk.main.lock().is_empty());
        assert!(chunk.entities.lock().is_empty());
    }

    #[test]
    fn test_round_trip_primary() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(0, 0);
        fx.write(ContainerKind::Primary, coord, &container(coord, b"payload P"));

        assert!(fx.task(coord).run());
        assert_eq!(fx.cache.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(fx.decoder.calls(), 1);

        let chunk = fx.chunk(coord);
        let main = chunk.main.lock();
        let entities = chunk.entities.lock();
        assert_eq!(main.len(), 1);
        assert_eq!(entities.len(), 1);
        assert_eq!(main[0].as_slice(), b"payload P");
        assert!(Arc::ptr_eq(&main[0], &entities[0]));
    }

    #[test]
    fn test_entity_container_only() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(-33, 70);
        fx.write(ContainerKind::EntitiesOnly, coord, &container(coord, b"mobs"));

        assert!(!fx.task(coord).run());

        let chunk = fx.chunk(coord);
        assert!(chunk.main.lock().is_empty());
        let entities = chunk.entities.lock();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].as_slice(), b"mobs");
    }

    #[test]
    fn test_split_layout_populates_entities_twice() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(1, 2);
        fx.write(ContainerKind::Primary, coord, &container(coord, b"blocks"));
        fx.write(ContainerKind::EntitiesOnly, coord, &container(coord, b"mobs"));

        assert!(fx.task(coord).run());

        let chunk = fx.chunk(coord);
        assert_eq!(chunk.main.lock().len(), 1);
        let entities = chunk.entities.lock();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].as_slice(), b"blocks");
        assert_eq!(entities[1].as_slice(), b"mobs");
    }

    #[test]
    fn test_separate_entities_disabled() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(1, 2);
        fx.write(ContainerKind::EntitiesOnly, coord, &container(coord, b"mobs"));

        assert!(!fx.task(coord).with_separate_entities(false).run());
        assert_eq!(fx.decoder.calls(), 0);
        assert!(fx.chunk(coord).entities.lock().is_empty());
    }

    #[test]
    fn test_unallocated_slot_reads_no_payload() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(3, 3);
        let neighbour = ChunkCoord::new(4, 3);
        fx.write(ContainerKind::Primary, coord, &container(neighbour, b"other"));

        assert!(!fx.task(coord).run());
        assert_eq!(fx.decoder.calls(), 0);
    }

    #[test]
    fn test_invalid_declared_length_never_decoded() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(0, 0);

        let mut zero = RegionWriter::new();
        zero.push_raw(coord.slot(), 1, &[0, 0, 0, 0, 2]).expect("push");
        fx.write(ContainerKind::Primary, coord, &zero);
        assert!(!fx.task(coord).run());

        let mut oversized = RegionWriter::new();
        let mut record = 5000u32.to_be_bytes().to_vec();
        record.push(2);
        record.resize(5004, 0);
        oversized.push_raw(coord.slot(), 1, &record).expect("push");
        fx.write(ContainerKind::Primary, coord, &oversized);
        assert!(!fx.task(coord).run());

        assert_eq!(fx.decoder.calls(), 0);
    }

    #[test]
    fn test_short_file_despite_capacity() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(0, 0);
        let mut writer = container(coord, &[7u8; 64]);
        writer.unpadded();
        let mut bytes = writer.finish();
        bytes.truncate(bytes.len() - 1);

        let path = WorldLayout::new(fx.root()).container_path(ContainerKind::Primary, coord.region());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, bytes).expect("write");

        assert_eq!(
            crate::region::read_location(&path, coord.slot()),
            Some(LocationEntry::new(1, 1))
        );
        assert!(!fx.task(coord).run());
        assert_eq!(fx.decoder.calls(), 0);
    }

    #[test]
    fn test_decode_failure_is_soft() {
        let fx = Fixture::new();
        let rx = fx.events.subscribe();
        let coord = ChunkCoord::new(0, 0);
        fx.write(ContainerKind::Primary, coord, &container(coord, b"!corrupt"));

        assert!(fx.task(coord).run());
        assert_eq!(rx.len(), 1);
        assert_eq!(fx.decoder.calls(), 1);
    }

    #[test]
    fn test_undecodable_payload_still_counts_as_dispatched() {
        let fx = Fixture::new();
        let coord = ChunkCoord::new(3, -4);
        fx.write(ContainerKind::Primary, coord, &container(coord, b"!bad"));

        let decoder = CountingDecoder::default();
        let chunk = RecordingChunk::default();
        let location = WorldLayout::new(fx.root()).locate(coord);

        assert!(load_from_container(
            &decoder,
            &location,
            ContainerKind::Primary,
            &chunk
        ));
        assert_eq!(decoder.calls(), 1);
        assert!(chunk.main.lock().is_empty());
        assert!(chunk.entities.lock().is_empty());
    }

    #[test]
    fn test_stored_chunk_through_chunk_map() {
        let dir = TempDir::new().expect("temp dir");
        let coord = ChunkCoord::new(-1, -1);
        let layout = WorldLayout::new(dir.path());
        container(coord, b"tree")
            .write_to(&layout.container_path(ContainerKind::Primary, coord.region()))
            .expect("write");

        let cache: Arc<ChunkMap<Vec<u8>>> = Arc::new(ChunkMap::new());
        let task = LoadTask::new(
            coord,
            Arc::new(layout),
            Arc::new(CountingDecoder::default()),
            Arc::clone(&cache),
            Arc::new(LoadEvents::new()),
        );
        assert!(task.run());

        let chunk = cache.cached(coord).expect("cached");
        let snap = chunk.snapshot();
        assert_eq!(snap.main.as_deref().map(Vec::as_slice), Some(&b"tree"[..]));
        assert_eq!(snap.entity_loads, 1);
    }
}
