//! Loader service: submits load tasks to a caller-owned runtime.

use std::path::Path;
use std::sync::Arc;

use cartograph_common::ChunkCoord;
use crossbeam_channel::Receiver;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::ChunkCache;
use crate::chunk::PopulateChunk;
use crate::config::LoaderConfig;
use crate::decode::TagDecoder;
use crate::events::{ChunkLoaded, LoadEvents};
use crate::task::LoadTask;

/// Submits chunk loads without blocking the caller.
///
/// The runtime handle belongs to the caller; the loader never sizes or owns
/// a worker pool. Each load runs as its own blocking task and ends with
/// exactly one [`ChunkLoaded`] notification.
pub struct ChunkLoader<D, C> {
    decoder: Arc<D>,
    cache: Arc<C>,
    events: Arc<LoadEvents>,
    config: LoaderConfig,
    runtime: Handle,
}

impl<D, C> ChunkLoader<D, C>
where
    D: TagDecoder + 'static,
    C: ChunkCache + 'static,
    C::Chunk: PopulateChunk<D::Tree>,
{
    /// Creates a loader around an explicitly constructed cache.
    #[must_use]
    pub fn new(decoder: D, cache: Arc<C>, config: LoaderConfig, runtime: Handle) -> Self {
        Self {
            decoder: Arc::new(decoder),
            cache,
            events: Arc::new(LoadEvents::new()),
            config,
            runtime,
        }
    }

    /// Subscribes to completion notifications.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ChunkLoaded> {
        self.events.subscribe()
    }

    /// Returns the completion bus.
    #[must_use]
    pub fn events(&self) -> &Arc<LoadEvents> {
        &self.events
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Builds the task for one coordinate without running it.
    #[must_use]
    pub fn task(&self, world_root: &Path, coord: ChunkCoord) -> LoadTask<D, C> {
        LoadTask::new(
            coord,
            Arc::new(self.config.layout(world_root)),
            Arc::clone(&self.decoder),
            Arc::clone(&self.cache),
            Arc::clone(&self.events),
        )
        .with_separate_entities(self.config.separate_entities)
    }

    /// Submits a load for one coordinate.
    ///
    /// The handle resolves to whether the primary container supplied data;
    /// callers that only watch notifications may drop it.
    pub fn load(&self, world_root: &Path, coord: ChunkCoord) -> JoinHandle<bool> {
        let task = self.task(world_root, coord);
        debug!("Submitting load for chunk {coord}");
        self.runtime.spawn_blocking(move || task.run())
    }

    /// Submits loads for the square of chunks within `radius` of `center`.
    pub fn load_area(
        &self,
        world_root: &Path,
        center: ChunkCoord,
        radius: u32,
    ) -> Vec<JoinHandle<bool>> {
        area(center, radius)
            .map(|coord| self.load(world_root, coord))
            .collect()
    }
}

impl<D, C> std::fmt::Debug for ChunkLoader<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkLoader")
            .field("config", &self.config)
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Coordinates of the square of chunks within `radius` of `center`, row by row.
pub fn area(center: ChunkCoord, radius: u32) -> impl Iterator<Item = ChunkCoord> {
    let r = i32::try_from(radius).unwrap_or(i32::MAX);
    let (x0, x1) = (center.x.saturating_sub(r), center.x.saturating_add(r));
    let (z0, z1) = (center.z.saturating_sub(r), center.z.saturating_add(r));
    (z0..=z1).flat_map(move |z| (x0..=x1).map(move |x| ChunkCoord::new(x, z)))
}
