//! Region container reading.
//!
//! A container holds up to 1024 chunks:
//! - 4096-byte location table, one 4-byte entry per slot
//!   (`sector_offset: u24 BE`, `sector_count: u8`)
//! - Payloads aligned to 4096-byte sectors, each prefixed with
//!   `declared_length: u32 BE` and a one-byte encoding tag
//!
//! Every reader opens the container, validates, reads, and closes it within a
//! single call. Ranges are checked against the measured file size before any
//! byte is read, and every rejection is soft: the public readers log the
//! reason and return `None`.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use cartograph_common::{
    CartographError, CartographResult, ContainerError, ContainerResult, SlotIndex,
    SLOTS_PER_REGION,
};
use tracing::{debug, trace};

/// Sector size for payload alignment (4KB).
pub const SECTOR_SIZE: u64 = 4096;

/// Size of the location table at the start of every container.
pub const HEADER_SIZE: u64 = 4096;

/// Length prefix plus encoding tag.
pub const PAYLOAD_HEADER_SIZE: u64 = 5;

/// Size of the big-endian length prefix.
const LENGTH_PREFIX_SIZE: u64 = 4;

/// Largest sector offset a 24-bit entry can hold.
pub const MAX_SECTOR_OFFSET: u32 = 0x00FF_FFFF;

/// Chunk location entry in the location table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocationEntry {
    /// Sector offset from start of file (0 = unallocated).
    pub sector_offset: u32,
    /// Number of sectors reserved.
    pub sector_count: u8,
}

impl LocationEntry {
    /// Creates an entry. The offset is truncated to 24 bits.
    #[must_use]
    pub const fn new(sector_offset: u32, sector_count: u8) -> Self {
        Self {
            sector_offset: sector_offset & MAX_SECTOR_OFFSET,
            sector_count,
        }
    }

    /// Decodes a raw table entry.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            sector_offset: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
            sector_count: bytes[3],
        }
    }

    /// Encodes as a raw table entry.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        let offset = self.sector_offset.to_be_bytes();
        [offset[1], offset[2], offset[3], self.sector_count]
    }

    /// Whether a payload is stored for this slot.
    #[must_use]
    pub const fn is_allocated(self) -> bool {
        self.sector_offset != 0
    }

    /// Byte offset of the payload header.
    #[must_use]
    pub const fn byte_offset(self) -> u64 {
        self.sector_offset as u64 * SECTOR_SIZE
    }

    /// Bytes reserved for the payload, length prefix included.
    #[must_use]
    pub const fn capacity(self) -> u64 {
        self.sector_count as u64 * SECTOR_SIZE
    }
}

/// Payload encoding tag, as stored after the length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingTag {
    /// GZip (RFC1952)
    Gzip,
    /// Zlib (RFC1950)
    Zlib,
    /// Stored without compression
    Uncompressed,
    /// LZ4 block stream
    Lz4,
    /// Custom algorithm named inside the payload
    Custom,
    /// Any other tag value
    Unknown(u8),
}

impl EncodingTag {
    /// Classifies a raw tag byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Gzip,
            2 => Self::Zlib,
            3 => Self::Uncompressed,
            4 => Self::Lz4,
            127 => Self::Custom,
            other => Self::Unknown(other),
        }
    }

    /// Raw tag byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Gzip => 1,
            Self::Zlib => 2,
            Self::Uncompressed => 3,
            Self::Lz4 => 4,
            Self::Custom => 127,
            Self::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for EncodingTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gzip => write!(f, "gzip"),
            Self::Zlib => write!(f, "zlib"),
            Self::Uncompressed => write!(f, "uncompressed"),
            Self::Lz4 => write!(f, "lz4"),
            Self::Custom => write!(f, "custom"),
            Self::Unknown(tag) => write!(f, "unknown({tag})"),
        }
    }
}

/// A validated, still-encoded chunk payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    tag: u8,
    bytes: Vec<u8>,
}

impl Payload {
    /// Raw encoding tag byte.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    /// Classified encoding tag.
    #[must_use]
    pub const fn encoding(&self) -> EncodingTag {
        EncodingTag::from_u8(self.tag)
    }

    /// The `declared_length` bytes following the length prefix.
    ///
    /// The first byte is the encoding tag itself.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded data after the tag byte.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.bytes.get(1..).unwrap_or_default()
    }

    /// Length declared in the payload header.
    #[must_use]
    pub fn declared_length(&self) -> usize {
        self.bytes.len()
    }
}

/// The full location table of one container.
#[derive(Debug, Clone)]
pub struct LocationTable {
    entries: Vec<LocationEntry>,
}

impl LocationTable {
    /// Parses a 4096-byte table.
    fn from_bytes(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(SlotIndex::ENTRY_SIZE as usize)
            .take(SLOTS_PER_REGION)
            .map(|raw| LocationEntry::from_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();
        Self { entries }
    }

    /// Entry for a slot (unallocated entries included).
    #[must_use]
    pub fn entry(&self, slot: SlotIndex) -> LocationEntry {
        self.entries.get(slot.get()).copied().unwrap_or_default()
    }

    /// Allocated slots in table order.
    pub fn allocated(&self) -> impl Iterator<Item = (SlotIndex, LocationEntry)> + '_ {
        SlotIndex::all()
            .map(|slot| (slot, self.entry(slot)))
            .filter(|(_, entry)| entry.is_allocated())
    }

    /// Number of allocated slots.
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated().count()
    }
}

/// Read-only container handle scoped to a single reader call.
struct ContainerFile {
    file: File,
    len: u64,
}

impl ContainerFile {
    fn open(path: &Path) -> ContainerResult<Self> {
        let open_err = |source| ContainerError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        let len = file.metadata().map_err(open_err)?.len();
        Ok(Self { file, len })
    }

    fn require_header(&self) -> ContainerResult<()> {
        if self.len < HEADER_SIZE {
            return Err(ContainerError::HeaderTruncated {
                len: self.len,
                needed: HEADER_SIZE,
            });
        }
        Ok(())
    }

    /// Reads exactly `len` bytes at `offset`, after checking the range lies
    /// within the measured file size.
    fn read_range(&mut self, offset: u64, len: u64) -> ContainerResult<Vec<u8>> {
        let in_bounds = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.len);
        if !in_bounds {
            return Err(ContainerError::OutOfBounds {
                offset,
                len,
                file_len: self.len,
            });
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self, offset: u64) -> ContainerResult<[u8; N]> {
        let bytes = self.read_range(offset, N as u64)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    fn location(&mut self, slot: SlotIndex) -> ContainerResult<LocationEntry> {
        self.require_header()?;
        let entry = LocationEntry::from_bytes(self.read_array::<4>(slot.table_offset())?);
        if !entry.is_allocated() {
            return Err(ContainerError::Unallocated { slot: slot.get() });
        }
        Ok(entry)
    }

    fn table(&mut self) -> ContainerResult<LocationTable> {
        self.require_header()?;
        let bytes = self.read_range(0, HEADER_SIZE)?;
        Ok(LocationTable::from_bytes(&bytes))
    }

    fn payload(&mut self, entry: LocationEntry) -> ContainerResult<Payload> {
        let chunk_start = entry.byte_offset();
        let capacity = entry.capacity();

        if self.len < chunk_start + PAYLOAD_HEADER_SIZE {
            return Err(ContainerError::SubHeaderTruncated {
                offset: chunk_start,
                len: self.len,
            });
        }

        let header = self.read_array::<5>(chunk_start)?;
        let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let tag = header[4];

        // A declared length with the high bit set was negative in older
        // writers; it fails the capacity check like any oversized length.
        if declared == 0 || u64::from(declared) + LENGTH_PREFIX_SIZE > capacity {
            return Err(ContainerError::InvalidLength { declared, capacity });
        }

        let needed = chunk_start + LENGTH_PREFIX_SIZE + u64::from(declared);
        if self.len < needed {
            return Err(ContainerError::PayloadTruncated {
                needed,
                len: self.len,
            });
        }

        let bytes = self.read_range(chunk_start + LENGTH_PREFIX_SIZE, u64::from(declared))?;
        Ok(Payload { tag, bytes })
    }
}

/// Reads one slot's location entry, reporting why it is unavailable.
pub fn try_read_location(path: &Path, slot: SlotIndex) -> ContainerResult<LocationEntry> {
    ContainerFile::open(path)?.location(slot)
}

/// Reads one slot's location entry.
///
/// Returns `None` when the container is missing, shorter than the location
/// table, or the slot is unallocated.
#[must_use]
pub fn read_location(path: &Path, slot: SlotIndex) -> Option<LocationEntry> {
    soft(path, "location", try_read_location(path, slot))
}

/// Reads and validates a payload, reporting why it is unavailable.
pub fn try_read_payload(path: &Path, entry: LocationEntry) -> ContainerResult<Payload> {
    ContainerFile::open(path)?.payload(entry)
}

/// Reads and validates the payload an entry points at.
///
/// Returns `None` when the payload header lies past the end of the file, the
/// declared length is zero or does not fit the reserved sectors, or the file
/// ends before the declared payload does.
#[must_use]
pub fn read_payload(path: &Path, entry: LocationEntry) -> Option<Payload> {
    soft(path, "payload", try_read_payload(path, entry))
}

/// Reads the whole location table of a container.
#[must_use]
pub fn read_location_table(path: &Path) -> Option<LocationTable> {
    soft(path, "table", ContainerFile::open(path).and_then(|mut f| f.table()))
}

/// Collapses a container error to "no data", logging the reason.
fn soft<T>(path: &Path, stage: &str, result: ContainerResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_sparse() => {
            trace!("No {stage} in {}: {e}", path.display());
            None
        },
        Err(e) => {
            debug!("Rejected {stage} in {}: {e}", path.display());
            None
        },
    }
}

/// Builds well-formed containers in memory.
///
/// Payloads are appended one per sector run, starting right after the
/// location table.
#[derive(Debug, Clone)]
pub struct RegionWriter {
    table: Vec<LocationEntry>,
    body: Vec<u8>,
    content_end: usize,
    padded: bool,
}

impl Default for RegionWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionWriter {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: vec![LocationEntry::default(); SLOTS_PER_REGION],
            body: Vec::new(),
            content_end: 0,
            padded: true,
        }
    }

    /// Leaves the final payload without sector padding, as some exporters do.
    pub fn unpadded(&mut self) -> &mut Self {
        self.padded = false;
        self
    }

    /// Stores a payload for a slot with a correct length prefix.
    pub fn push(&mut self, slot: SlotIndex, tag: u8, data: &[u8]) -> CartographResult<&mut Self> {
        let declared = u32::try_from(data.len() + 1).map_err(|_| {
            CartographError::InvalidArgument(format!("payload of {} bytes", data.len()))
        })?;
        let mut record = Vec::with_capacity(data.len() + PAYLOAD_HEADER_SIZE as usize);
        record.extend_from_slice(&declared.to_be_bytes());
        record.push(tag);
        record.extend_from_slice(data);

        let sectors = record.len().div_ceil(SECTOR_SIZE as usize);
        let sectors = u8::try_from(sectors).map_err(|_| {
            CartographError::InvalidArgument(format!("payload needs {sectors} sectors"))
        })?;
        self.push_raw(slot, sectors, &record)
    }

    /// Stores arbitrary bytes at the next free sector and points the slot at
    /// them with the given sector count. No validation is done.
    pub fn push_raw(
        &mut self,
        slot: SlotIndex,
        sector_count: u8,
        record: &[u8],
    ) -> CartographResult<&mut Self> {
        let start_sector = (HEADER_SIZE as usize + self.body.len()) / SECTOR_SIZE as usize;
        let start_sector = u32::try_from(start_sector)
            .ok()
            .filter(|s| *s <= MAX_SECTOR_OFFSET)
            .ok_or_else(|| CartographError::InvalidArgument("container full".into()))?;

        self.body.extend_from_slice(record);
        self.content_end = self.body.len();
        let padded_len = self.body.len().div_ceil(SECTOR_SIZE as usize) * SECTOR_SIZE as usize;
        self.body.resize(padded_len, 0);

        self.table[slot.get()] = LocationEntry::new(start_sector, sector_count);
        Ok(self)
    }

    /// Overwrites a slot's location entry.
    pub fn set_location(&mut self, slot: SlotIndex, entry: LocationEntry) -> &mut Self {
        self.table[slot.get()] = entry;
        self
    }

    /// Serializes the container.
    #[must_use]
    pub fn finish(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE as usize + self.body.len());
        for entry in &self.table {
            out.extend_from_slice(&entry.to_bytes());
        }
        if self.padded {
            out.extend_from_slice(&self.body);
        } else {
            out.extend_from_slice(&self.body[..self.content_end]);
        }
        out
    }

    /// Writes the container to disk, creating parent directories.
    pub fn write_to(&self, path: &Path) -> io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.finish())?;
        Ok(path.to_path_buf())
    }
}
