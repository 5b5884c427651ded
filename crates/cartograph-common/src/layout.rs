//! On-disk layout of a world's region containers.
//!
//! ```text
//! <world-root>/region/r.<rx>.<rz>.<ext>      primary chunk containers
//! <world-root>/entities/r.<rx>.<rz>.<ext>    entity-only containers
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coords::{ChunkCoord, RegionCoord, SlotIndex};

/// Default directory holding primary containers.
pub const DEFAULT_REGION_DIR: &str = "region";

/// Default directory holding entity-only containers.
pub const DEFAULT_ENTITIES_DIR: &str = "entities";

/// Default container file extension.
pub const DEFAULT_EXTENSION: &str = "mca";

/// Which container a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Primary chunk container (block data, and entities in older worlds).
    Primary,
    /// Dedicated entity container used by the split layout.
    EntitiesOnly,
}

impl ContainerKind {
    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::EntitiesOnly => "entities",
        }
    }
}

/// Naming scheme for a world's container files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldLayout {
    root: PathBuf,
    region_dir: String,
    entities_dir: String,
    extension: String,
}

impl WorldLayout {
    /// Layout with the default directory names and extension.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_names(root, DEFAULT_REGION_DIR, DEFAULT_ENTITIES_DIR, DEFAULT_EXTENSION)
    }

    /// Layout with custom directory names and extension.
    #[must_use]
    pub fn with_names<P: AsRef<Path>>(
        root: P,
        region_dir: &str,
        entities_dir: &str,
        extension: &str,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            region_dir: region_dir.to_owned(),
            entities_dir: entities_dir.to_owned(),
            extension: extension.to_owned(),
        }
    }

    /// World root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding containers of the given kind.
    #[must_use]
    pub fn container_dir(&self, kind: ContainerKind) -> PathBuf {
        match kind {
            ContainerKind::Primary => self.root.join(&self.region_dir),
            ContainerKind::EntitiesOnly => self.root.join(&self.entities_dir),
        }
    }

    /// Path of the container of the given kind for a region.
    #[must_use]
    pub fn container_path(&self, kind: ContainerKind, region: RegionCoord) -> PathBuf {
        self.container_dir(kind)
            .join(region.file_name(&self.extension))
    }

    /// Resolves everything needed to load one chunk. Pure; touches no files.
    #[must_use]
    pub fn locate(&self, chunk: ChunkCoord) -> ChunkLocation {
        let (region, slot) = chunk.locate();
        ChunkLocation {
            chunk,
            region,
            slot,
            primary: self.container_path(ContainerKind::Primary, region),
            entities: self.container_path(ContainerKind::EntitiesOnly, region),
        }
    }
}

/// Where a chunk lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLocation {
    /// The chunk itself
    pub chunk: ChunkCoord,
    /// Region holding the chunk
    pub region: RegionCoord,
    /// Slot in the region's location table
    pub slot: SlotIndex,
    /// Primary container path
    pub primary: PathBuf,
    /// Entity container path
    pub entities: PathBuf,
}

impl ChunkLocation {
    /// Container path for the given kind.
    #[must_use]
    pub fn path(&self, kind: ContainerKind) -> &Path {
        match kind {
            ContainerKind::Primary => &self.primary,
            ContainerKind::EntitiesOnly => &self.entities,
        }
    }
}
