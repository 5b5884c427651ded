//! Probe commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cartograph_common::{ChunkCoord, ContainerKind, WorldLayout};
use cartograph_world::{
    area, read_location_table, try_read_payload, ChunkLoader, ChunkMap, LoaderConfig, Payload,
    RawDecoder, RegionWriter,
};
use tracing::info;

/// Per-chunk result of an area load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    /// Chunk coordinate
    pub coord: ChunkCoord,
    /// Primary container supplied data
    pub main: bool,
    /// Entity data was populated from either container
    pub entities: bool,
    /// Declared length of the main payload
    pub main_len: Option<usize>,
}

/// Prints the allocated slots of a container.
pub fn slots(container: &Path) -> Result<()> {
    let Some(table) = read_location_table(container) else {
        bail!("no readable location table in {}", container.display());
    };

    println!(
        "{}: {} allocated slots",
        container.display(),
        table.allocated_count()
    );
    for (slot, entry) in table.allocated() {
        let status = match try_read_payload(container, entry) {
            Ok(payload) => format!(
                "{} bytes, {}",
                payload.declared_length(),
                payload.encoding()
            ),
            Err(e) => format!("rejected: {e}"),
        };
        println!(
            "  slot {:>4} (local {:>2},{:>2}) sector {:>6} x{:<3} {status}",
            slot.get(),
            slot.get() % 32,
            slot.get() / 32,
            entry.sector_offset,
            entry.sector_count,
        );
    }
    Ok(())
}

/// Loads an area on a dedicated runtime and collects a report per chunk.
pub fn load_area_report(
    world: &Path,
    center: ChunkCoord,
    radius: u32,
    config: LoaderConfig,
) -> Result<Vec<ChunkReport>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let cache: Arc<ChunkMap<Payload>> = Arc::new(ChunkMap::new());
    let loader = ChunkLoader::new(RawDecoder, Arc::clone(&cache), config, runtime.handle().clone());
    let notifications = loader.subscribe();

    let handles = loader.load_area(world, center, radius);
    let submitted = handles.len();

    for _ in 0..submitted {
        notifications
            .recv()
            .context("completion channel closed early")?;
    }

    let outcomes = runtime.block_on(async {
        let mut outcomes = Vec::with_capacity(submitted);
        for handle in handles {
            outcomes.push(handle.await);
        }
        outcomes
    });

    let mut reports = Vec::with_capacity(submitted);
    for (coord, outcome) in area(center, radius).zip(outcomes) {
        let main = outcome.context("load task panicked")?;
        let snapshot = cache
            .cached(coord)
            .map(|chunk| chunk.snapshot())
            .unwrap_or_default();
        reports.push(ChunkReport {
            coord,
            main,
            entities: snapshot.entities.is_some(),
            main_len: snapshot.main.map(|p| p.declared_length()),
        });
    }
    Ok(reports)
}

/// Loads an area and prints which chunks carry data.
pub fn load(world: &Path, x: i32, z: i32, radius: u32, config: Option<&Path>) -> Result<()> {
    let config = config.map(LoaderConfig::load_from).unwrap_or_default();
    let center = ChunkCoord::new(x, z);
    let reports = load_area_report(world, center, radius, config)?;

    let loaded = reports.iter().filter(|r| r.main).count();
    for report in reports.iter().filter(|r| r.main || r.entities) {
        println!(
            "  chunk {:<14} main: {:<5} entities: {:<5} {}",
            report.coord.to_string(),
            report.main,
            report.entities,
            report
                .main_len
                .map(|len| format!("{len} bytes"))
                .unwrap_or_default(),
        );
    }
    println!("{loaded}/{} chunks loaded around {center}", reports.len());
    Ok(())
}

/// Writes a small sample world.
pub fn fixture(output: &Path) -> Result<()> {
    let layout = WorldLayout::new(output);

    let mut primary = RegionWriter::new();
    primary.push(ChunkCoord::new(0, 0).slot(), 3, b"spawn chunk")?;
    primary.push(ChunkCoord::new(1, 0).slot(), 3, &[0u8; 6000])?;
    let primary_path = primary
        .write_to(&layout.container_path(ContainerKind::Primary, ChunkCoord::new(0, 0).region()))
        .context("failed to write primary container")?;

    let mut entities = RegionWriter::new();
    entities.push(ChunkCoord::new(0, 0).slot(), 3, b"villagers")?;
    entities.push(ChunkCoord::new(0, 1).slot(), 3, b"sheep")?;
    let entities_path = entities
        .write_to(
            &layout.container_path(ContainerKind::EntitiesOnly, ChunkCoord::new(0, 0).region()),
        )
        .context("failed to write entity container")?;

    info!(
        "Wrote {} and {}",
        primary_path.display(),
        entities_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixture_then_load() {
        let dir = TempDir::new().expect("temp dir");
        fixture(dir.path()).expect("fixture");

        let reports = load_area_report(
            dir.path(),
            ChunkCoord::new(0, 0),
            1,
            LoaderConfig::default(),
        )
        .expect("load");
        assert_eq!(reports.len(), 9);

        let find = |x, z| {
            reports
                .iter()
                .find(|r| r.coord == ChunkCoord::new(x, z))
                .cloned()
                .expect("report")
        };

        let spawn = find(0, 0);
        assert!(spawn.main);
        assert!(spawn.entities);
        assert_eq!(spawn.main_len, Some(12));

        let big = find(1, 0);
        assert!(big.main);
        assert_eq!(big.main_len, Some(6001));

        let sheep = find(0, 1);
        assert!(!sheep.main);
        assert!(sheep.entities);

        let empty = find(-1, -1);
        assert!(!empty.main);
        assert!(!empty.entities);
    }

    #[test]
    fn test_entities_disabled() {
        let dir = TempDir::new().expect("temp dir");
        fixture(dir.path()).expect("fixture");

        let config = LoaderConfig {
            separate_entities: false,
            ..LoaderConfig::default()
        };
        let reports =
            load_area_report(dir.path(), ChunkCoord::new(0, 1), 0, config).expect("load");
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].entities);
    }

    #[test]
    fn test_slots_on_missing_container() {
        let dir = TempDir::new().expect("temp dir");
        assert!(slots(&dir.path().join("r.0.0.mca")).is_err());
    }

    #[test]
    fn test_slots_on_fixture() {
        let dir = TempDir::new().expect("temp dir");
        fixture(dir.path()).expect("fixture");
        slots(&dir.path().join("region").join("r.0.0.mca")).expect("slots");
    }
}
