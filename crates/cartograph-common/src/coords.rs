//! Coordinate types for chunks, regions, and region-local slots.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Number of chunks along one edge of a region (32x32).
pub const CHUNKS_PER_REGION: i32 = 32;

/// Bits to shift a chunk coordinate by to get its region coordinate.
pub const REGION_SHIFT: u32 = 5;

/// Total slots in a region's location table.
pub const SLOTS_PER_REGION: usize = (CHUNKS_PER_REGION * CHUNKS_PER_REGION) as usize;

const LOCAL_MASK: i32 = CHUNKS_PER_REGION - 1;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the region containing this chunk.
    #[must_use]
    pub const fn region(self) -> RegionCoord {
        RegionCoord::from_chunk(self)
    }

    /// Returns this chunk's slot in its region's location table.
    #[must_use]
    pub const fn slot(self) -> SlotIndex {
        SlotIndex::from_chunk(self)
    }

    /// Resolves both the region and the slot in one call.
    #[must_use]
    pub const fn locate(self) -> (RegionCoord, SlotIndex) {
        (self.region(), self.slot())
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Region coordinate (identifies one container file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct RegionCoord {
    /// Region X
    pub x: i32,
    /// Region Z
    pub z: i32,
}

impl RegionCoord {
    /// Creates a new region coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing the given chunk.
    ///
    /// The shift is arithmetic, so negative chunks floor toward negative
    /// infinity: chunk -33 lives in region -2, not -1.
    #[must_use]
    pub const fn from_chunk(chunk: ChunkCoord) -> Self {
        Self {
            x: chunk.x >> REGION_SHIFT,
            z: chunk.z >> REGION_SHIFT,
        }
    }

    /// Chunk at the given slot of this region.
    #[must_use]
    pub const fn chunk_at(self, slot: SlotIndex) -> ChunkCoord {
        let local_x = (slot.0 as i32) & LOCAL_MASK;
        let local_z = (slot.0 as i32) >> REGION_SHIFT;
        ChunkCoord {
            x: (self.x << REGION_SHIFT) + local_x,
            z: (self.z << REGION_SHIFT) + local_z,
        }
    }

    /// Container file name with the given extension, e.g. `r.-2.0.mca`.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("r.{}.{}.{extension}", self.x, self.z)
    }
}

/// Index of a chunk inside its region's location table, always in `0..1024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotIndex(u16);

impl SlotIndex {
    /// Size in bytes of one location table entry.
    pub const ENTRY_SIZE: u64 = 4;

    /// Slot for the given chunk: `(x & 31) + (z & 31) * 32`.
    #[must_use]
    pub const fn from_chunk(chunk: ChunkCoord) -> Self {
        let local_x = chunk.x & LOCAL_MASK;
        let local_z = chunk.z & LOCAL_MASK;
        Self((local_x + local_z * CHUNKS_PER_REGION) as u16)
    }

    /// Wraps a raw index, returning `None` when it is out of range.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index < SLOTS_PER_REGION {
            Some(Self(index as u16))
        } else {
            None
        }
    }

    /// Raw index value.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Byte offset of this slot's entry in the location table.
    #[must_use]
    pub const fn table_offset(self) -> u64 {
        self.0 as u64 * Self::ENTRY_SIZE
    }

    /// Iterates over every slot of a region in table order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..SLOTS_PER_REGION as u16).map(Self)
    }
}

impl std::fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
