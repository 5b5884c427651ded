//! # Region Probe
//!
//! Command-line inspection of a world's region containers:
//! - `slots`: list the allocated slots of one container
//! - `load`: run the asynchronous loader over an area and report results
//! - `fixture`: write a small sample world

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod probe;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "region-probe", about = "Inspect region containers and probe chunk loading")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List allocated slots of a container file
    Slots {
        /// Container file path
        container: PathBuf,
    },
    /// Load an area of chunks and report which ones carry data
    Load {
        /// World root directory
        world: PathBuf,
        /// Center chunk X
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        x: i32,
        /// Center chunk Z
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        z: i32,
        /// Radius in chunks around the center
        #[arg(long, default_value_t = 2)]
        radius: u32,
        /// Loader configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a sample world with one primary and one entity container
    Fixture {
        /// Output world root
        output: PathBuf,
    },
}

/// Library crates and this binary log at `info` unless `RUST_LOG` overrides.
fn log_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("cartograph=info".parse()?)
        .add_directive("region_probe=info".parse()?))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(log_filter()?)
        .init();

    info!("region-probe {}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Command::Slots { container } => probe::slots(&container),
        Command::Load {
            world,
            x,
            z,
            radius,
            config,
        } => probe::load(&world, x, z, radius, config.as_deref()),
        Command::Fixture { output } => probe::fixture(&output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_covers_binary_target() {
        let filter = log_filter().expect("filter").to_string();
        assert!(filter.contains("cartograph=info"));
        assert!(filter.contains("region_probe=info"));
    }
}
