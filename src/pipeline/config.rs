use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    foundation::core::{Fps, Resolution},
    foundation::error::{ReelError, ReelResult},
    page::region::MarginSpec,
    style::overlay::StyleParams,
};

/// Every knob a page run needs. Built once per invocation and shared read-only by all workers.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Page margins to cut away.
    pub margins: MarginSpec,
    /// Overlay styling.
    pub style: StyleParams,
    /// Target clip duration in seconds.
    pub duration_sec: f64,
    /// Output frame rate.
    pub fps: Fps,
    /// Output frame size.
    pub resolution: Resolution,
    /// Page rasterization DPI.
    pub dpi: u32,
    /// Directory for finished clips.
    pub output_dir: PathBuf,
    /// Also write each cropped page region as PNG here.
    pub screenshots_dir: Option<PathBuf>,
    /// Only write screenshots; no background video is opened.
    pub screenshots_only: bool,
    /// Pages processed concurrently.
    pub workers: usize,
    /// Frames composited per parallel batch.
    pub chunk_size: usize,
    /// Replace existing clips instead of skipping the page.
    pub overwrite: bool,
    /// Memory the decoded background frames may take, in MiB.
    pub max_background_mb: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            margins: MarginSpec::default(),
            style: StyleParams::default(),
            duration_sec: 5.0,
            fps: Fps::default(),
            resolution: Resolution::default(),
            dpi: 300,
            output_dir: PathBuf::from("output"),
            screenshots_dir: None,
            screenshots_only: false,
            workers: default_workers(),
            chunk_size: 32,
            overwrite: true,
            max_background_mb: 4096,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl PipelineConfig {
    /// Load a JSON config; fields left out keep their defaults.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ReelError::validation(format!("config '{}': {e}", path.display())))?;
        Ok(cfg)
    }

    /// Reject configurations no page could succeed with.
    pub fn validate(&self) -> ReelResult<()> {
        self.margins.validate()?;
        self.style.validate()?;
        if !self.duration_sec.is_finite() || self.duration_sec <= 0.0 {
            return Err(ReelError::validation(format!(
                "duration must be > 0 seconds, got {}",
                self.duration_sec
            )));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(ReelError::validation("fps must be > 0"));
        }
        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 {
            return Err(ReelError::validation(format!(
                "resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if !self.screenshots_only && (!width.is_multiple_of(2) || !height.is_multiple_of(2)) {
            return Err(ReelError::validation(format!(
                "resolution must have even sides for yuv420p output, got {}",
                self.resolution
            )));
        }
        if self.dpi == 0 {
            return Err(ReelError::validation("dpi must be > 0"));
        }
        if self.workers == 0 {
            return Err(ReelError::validation("workers must be > 0"));
        }
        if self.chunk_size == 0 {
            return Err(ReelError::validation("chunk size must be > 0"));
        }
        if self.max_background_mb == 0 {
            return Err(ReelError::validation("max_background_mb must be > 0"));
        }
        if self.fps.frames_for_duration(self.duration_sec) == 0 && !self.screenshots_only {
            return Err(ReelError::validation(format!(
                "duration {}s is shorter than one frame at {} fps",
                self.duration_sec,
                self.fps.as_f64()
            )));
        }
        Ok(())
    }

    /// Byte cap handed to the background decoder.
    pub fn max_background_bytes(&self) -> u64 {
        self.max_background_mb.saturating_mul(1 << 20)
    }

    /// Directory screenshots go to, if any are written.
    pub fn effective_screenshots_dir(&self) -> Option<PathBuf> {
        match (&self.screenshots_dir, self.screenshots_only) {
            (Some(dir), _) => Some(dir.clone()),
            (None, true) => Some(PathBuf::from("screenshots")),
            (None, false) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
