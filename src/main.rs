//! CLI entry point for building colour-tile mosaics

use clap::Parser;
use colormosaic::io::cli::{Cli, MosaicProcessor};

fn main() -> colormosaic::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut processor = MosaicProcessor::new(cli)?;
    processor.process()?;
    Ok(())
}
