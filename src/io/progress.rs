//! Multi-image progress tracking with automatic batching for large sets

use crate::io::configuration::MAX_INDIVIDUAL_PROGRESS_BARS;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;

/// Coordinates progress display while mosaics are built
///
/// Shows one bar per image counting rendered rows, and adds a single batch
/// bar counting finished images when a directory holds many of them
pub struct ProgressManager {
    multi_progress: MultiProgress,
    batch_bar: Option<ProgressBar>,
    image_bars: Vec<ProgressBar>,
    /// Stores (`image name`, `rows rendered`, `total rows`) for rolling window display
    image_states: Vec<(String, usize, usize)>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static PROGRESS_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:30.cyan/blue}] {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Images: [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            batch_bar: None,
            image_bars: Vec::new(),
            image_states: Vec::new(),
        }
    }

    /// Initialize progress bars based on image count
    pub fn initialize(&mut self, image_count: usize) {
        // Switch to batch mode for large image sets to avoid terminal spam
        if image_count > MAX_INDIVIDUAL_PROGRESS_BARS + 1 {
            let batch_bar = ProgressBar::new(image_count as u64);
            batch_bar.set_style(BATCH_STYLE.clone());
            self.batch_bar = Some(self.multi_progress.add(batch_bar));
        }

        for _ in 0..image_count.min(MAX_INDIVIDUAL_PROGRESS_BARS) {
            let pb = ProgressBar::new(0);
            pb.set_style(PROGRESS_STYLE.clone());
            self.image_bars.push(self.multi_progress.add(pb));
        }
    }

    /// Configure a progress bar for a new image of `rows` tile rows
    pub fn start_image(&mut self, index: usize, path: &Path, rows: usize) {
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        if index >= self.image_states.len() {
            self.image_states.resize(index + 1, (String::new(), 0, 0));
        }
        if let Some(state) = self.image_states.get_mut(index) {
            *state = (display_name, 0, rows);
        }
        self.update_bars();
    }

    /// Report how many rows of an image have been rendered
    pub fn update_rows(&mut self, index: usize, rendered: usize) {
        if let Some(state) = self.image_states.get_mut(index) {
            state.1 = rendered;
        }
        self.update_bars();
    }

    /// Mark an image as completed and update batch progress
    pub fn complete_image(&mut self, index: usize) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.inc(1);
        }

        if let Some(state) = self.image_states.get_mut(index) {
            state.0 = format!("✓ {}", state.0);
            state.1 = state.2;
        }
        self.update_bars();
    }

    /// Mark an image as failed, leaving its row count where it stopped
    pub fn fail_image(&mut self, index: usize) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.inc(1);
        }

        if let Some(state) = self.image_states.get_mut(index) {
            state.0 = format!("✗ {}", state.0);
        }
        self.update_bars();
    }

    /// Clean up all progress displays
    pub fn finish(&self) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.finish_with_message("All images processed");
        }
        let _ = self.multi_progress.clear();
    }

    /// Update all progress bars to show the last N active images
    fn update_bars(&self) {
        let active: Vec<&(String, usize, usize)> = self
            .image_states
            .iter()
            .filter(|(name, _, _)| !name.is_empty())
            .collect();

        let start_idx = active.len().saturating_sub(MAX_INDIVIDUAL_PROGRESS_BARS);
        let visible = active.get(start_idx..).unwrap_or(&[]);

        for (bar_idx, (name, current, total)) in visible.iter().copied().enumerate() {
            if let Some(bar) = self.image_bars.get(bar_idx) {
                bar.set_length(*total as u64);
                bar.set_position(*current as u64);
                let width = total.to_string().len();
                bar.set_message(format!("{current:>width$}/{total} rows"));
                bar.set_prefix(name.clone());
            }
        }

        for bar in self.image_bars.iter().skip(visible.len()) {
            bar.set_length(0);
            bar.set_position(0);
            bar.set_message(String::new());
            bar.set_prefix(String::new());
        }
    }
}
