//! Decode dispatch: payload bytes to tag tree to chunk population.

use std::convert::Infallible;
use std::sync::Arc;

use cartograph_common::ContainerKind;

use crate::chunk::PopulateChunk;
use crate::region::Payload;

/// Decodes a validated payload into a tag tree.
///
/// Only ever receives byte ranges that were checked against the file size
/// and the reserved sectors.
pub trait TagDecoder: Send + Sync {
    /// Decoded tree type.
    type Tree: Send + Sync;
    /// Decode failure.
    type Error: std::fmt::Display;

    /// Decodes one payload.
    fn decode(&self, payload: &Payload) -> Result<Self::Tree, Self::Error>;
}

/// A chunk population call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populator {
    /// `populate_main`
    Main,
    /// `populate_entities`
    Entities,
}

/// Populators fed by each container kind.
///
/// Primary payloads go to both: older worlds keep entities inside the main
/// payload. Worlds with split entity containers therefore see entity
/// population twice per load, once from each container.
#[must_use]
pub const fn populators(kind: ContainerKind) -> &'static [Populator] {
    match kind {
        ContainerKind::Primary => &[Populator::Main, Populator::Entities],
        ContainerKind::EntitiesOnly => &[Populator::Entities],
    }
}

/// Decodes a payload once and hands the tree to every populator of `kind`.
pub fn dispatch<D, C>(
    decoder: &D,
    payload: &Payload,
    kind: ContainerKind,
    chunk: &C,
) -> Result<(), D::Error>
where
    D: TagDecoder + ?Sized,
    C: PopulateChunk<D::Tree> + ?Sized,
{
    let tree = Arc::new(decoder.decode(payload)?);
    for populator in populators(kind) {
        match populator {
            Populator::Main => chunk.populate_main(Arc::clone(&tree)),
            Populator::Entities => chunk.populate_entities(Arc::clone(&tree)),
        }
    }
    Ok(())
}

/// Passthrough decoder: the tree is the payload itself.
///
/// Useful for tools that only need to know which chunks carry data.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl TagDecoder for RawDecoder {
    type Tree = Payload;
    type Error = Infallible;

    fn decode(&self, payload: &Payload) -> Result<Payload, Infallible> {
        Ok(payload.clone())
    }
}
