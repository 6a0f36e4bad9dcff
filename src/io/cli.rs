//! Command-line interface for turning images into colour-tile mosaics

use crate::io::configuration::{
    DEFAULT_IDLE_WINDOW_MS, DEFAULT_MAX_BATCH_REQUESTS, DEFAULT_SERVER_URL, DEFAULT_TILE_HEIGHT,
    DEFAULT_TILE_WIDTH, DEFAULT_WORKER_CONCURRENCY, OUTPUT_EXTENSION, OUTPUT_SUFFIX,
};
use crate::io::error::{MosaicError, Result};
use crate::io::image::{is_supported_image, load_image};
use crate::io::progress::ProgressManager;
use crate::io::sink::SvgDocumentSink;
use crate::mosaic::builder::{MosaicBuilder, MosaicConfig, MosaicSummary};
use crate::mosaic::resolver::TileResolver;
use crate::network::dispatcher::{Dispatcher, DispatcherConfig};
use crate::network::swatch::SwatchTransport;
use crate::network::transport::{HttpTransport, Transport};
use crate::tiling::aggregate::aggregate;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "colormosaic")]
#[command(
    author,
    version,
    about = "Rebuild images as mosaics of colour-matched SVG tiles"
)]
/// Command-line arguments for the mosaic tool
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image file or directory to process
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Tile server answering `/color/{RRGGBBAA}`
    #[arg(short = 'u', long, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Tile width in source pixels
    #[arg(short = 'w', long, default_value_t = DEFAULT_TILE_WIDTH)]
    pub tile_width: usize,

    /// Tile height in source pixels
    #[arg(short = 'H', long, default_value_t = DEFAULT_TILE_HEIGHT)]
    pub tile_height: usize,

    /// Requests per batch before flushing without waiting
    #[arg(short, long, default_value_t = DEFAULT_MAX_BATCH_REQUESTS)]
    pub batch_size: usize,

    /// Idle window in milliseconds before a partial batch is flushed
    #[arg(long, default_value_t = DEFAULT_IDLE_WINDOW_MS)]
    pub idle_ms: u64,

    /// Requests executed in parallel within a batch
    #[arg(short, long, default_value_t = DEFAULT_WORKER_CONCURRENCY)]
    pub concurrency: usize,

    /// Fetch every tile afresh instead of reusing earlier results
    #[arg(long)]
    pub no_cache: bool,

    /// Generate tiles locally instead of contacting the server
    #[arg(short, long)]
    pub offline: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Process images even if output exists
    #[arg(short, long)]
    pub no_skip: bool,
}

impl Cli {
    /// Check if existing output files should be skipped
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Tile geometry and caching policy selected on the command line
    pub const fn mosaic_config(&self) -> MosaicConfig {
        MosaicConfig {
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            caching: !self.no_cache,
        }
    }

    /// Batching parameters selected on the command line
    pub const fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_requests: self.batch_size,
            idle_window: Duration::from_millis(self.idle_ms),
            worker_concurrency: self.concurrency,
        }
    }
}

/// Orchestrates mosaic generation for one image or a directory of images
///
/// One dispatcher and one resolver serve every image, so colours fetched for
/// an earlier image are reused by later ones.
pub struct MosaicProcessor {
    cli: Cli,
    config: MosaicConfig,
    resolver: TileResolver,
    progress_manager: Option<ProgressManager>,
}

impl MosaicProcessor {
    /// Create a processor with the given CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is invalid or the transport or
    /// dispatcher cannot be started
    pub fn new(cli: Cli) -> Result<Self> {
        let config = cli.mosaic_config();
        config.validate()?;

        let transport: Arc<dyn Transport> = if cli.offline {
            Arc::new(SwatchTransport::new(config.tile_width, config.tile_height))
        } else {
            Arc::new(HttpTransport::new(&cli.server)?)
        };
        let dispatcher = Dispatcher::new(transport, cli.dispatcher_config())?;
        let resolver = TileResolver::new(Arc::new(dispatcher), config.caching);
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Ok(Self {
            cli,
            config,
            resolver,
            progress_manager,
        })
    }

    /// Resolver shared by every processed image
    pub const fn resolver(&self) -> &TileResolver {
        &self.resolver
    }

    /// Process images according to CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if target validation fails or any image fails to
    /// become a mosaic
    pub fn process(&mut self) -> Result<Vec<PathBuf>> {
        let files = self.collect_files()?;

        if files.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.initialize(files.len());
        }

        let mut outputs = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            match self.process_file(file, index) {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    if let Some(ref mut pm) = self.progress_manager {
                        pm.fail_image(index);
                        pm.finish();
                    }
                    return Err(e);
                }
            }
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.finish();
        }

        Ok(outputs)
    }

    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let target = &self.cli.target;
        if target.is_file() {
            if !is_supported_image(target) {
                return Err(MosaicError::UnsupportedImage {
                    path: target.clone(),
                });
            }
            Ok(if self.should_process_file(target) {
                vec![target.clone()]
            } else {
                vec![]
            })
        } else if target.is_dir() {
            let mut files = Vec::new();
            let entries = std::fs::read_dir(target).map_err(|e| MosaicError::FileSystem {
                path: target.clone(),
                operation: "read directory",
                source: e,
            })?;
            for entry in entries {
                let path = entry?.path();
                if path.is_file()
                    && is_supported_image(&path)
                    && !Self::is_mosaic_output(&path)
                    && self.should_process_file(&path)
                {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        } else {
            Err(MosaicError::MissingInput {
                path: target.clone(),
            })
        }
    }

    fn should_process_file(&self, input_path: &Path) -> bool {
        if !self.cli.skip_existing() {
            return true;
        }

        let output_path = Self::get_output_path(input_path);
        if output_path.exists() {
            log::warn!("Skipping: {} (output exists)", input_path.display());
            false
        } else {
            true
        }
    }

    fn process_file(&mut self, input_path: &Path, index: usize) -> Result<PathBuf> {
        let start_time = Instant::now();
        let output_path = Self::get_output_path(input_path);

        let image = load_image(input_path)?;
        let buffer = image.buffer()?;
        let grid = aggregate(&buffer, self.config.tile_width, self.config.tile_height)?;

        if let Some(ref mut pm) = self.progress_manager {
            pm.start_image(index, input_path, grid.rows());
        }

        let mut sink = SvgDocumentSink::create(
            &output_path,
            grid.cols(),
            grid.rows(),
            grid.tile_width(),
            grid.tile_height(),
        )?;

        let summary: MosaicSummary = {
            let progress_manager = &mut self.progress_manager;
            let mut builder = MosaicBuilder::new(&self.resolver).with_progress(|rendered, _| {
                if let Some(pm) = progress_manager.as_mut() {
                    pm.update_rows(index, rendered);
                }
            });
            builder.build(&grid, &mut sink)?
        };
        sink.finish()?;

        if let Some(ref mut pm) = self.progress_manager {
            pm.complete_image(index);
        }

        log::info!(
            "{} -> {}: {} rows, {} tiles, {} colours in {:.2?}",
            input_path.display(),
            output_path.display(),
            summary.rows,
            summary.tiles,
            summary.distinct_colours,
            start_time.elapsed()
        );

        Ok(output_path)
    }

    fn is_mosaic_output(path: &Path) -> bool {
        path.file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(OUTPUT_SUFFIX))
    }

    /// Location of the mosaic generated for `input_path`
    pub fn get_output_path(input_path: &Path) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_default();
        let output_name = format!(
            "{}{}.{}",
            stem.to_string_lossy(),
            OUTPUT_SUFFIX,
            OUTPUT_EXTENSION
        );

        if let Some(parent) = input_path.parent() {
            parent.join(output_name)
        } else {
            PathBuf::from(output_name)
        }
    }
}
