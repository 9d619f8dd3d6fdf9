use std::path::PathBuf;

use image::RgbaImage;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::ReelResult;

/// What a sink is told about a clip before its first frame.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Frames the emitter will push, exactly.
    pub frame_count: u64,
    /// Spliced soundtrack to mux alongside the frames.
    pub audio: Option<AudioInputConfig>,
}

/// A spliced soundtrack written to disk as raw interleaved little-endian `f32`.
#[derive(Clone, Debug)]
pub struct AudioInputConfig {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Destination for one clip's composited frames.
///
/// A clip is `begin`, then `push_frame` for every index in increasing order, then `end`. When a
/// clip is abandoned part way, `abort` runs instead of `end` and must leave nothing behind that
/// looks finished.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> ReelResult<()>;
    fn end(&mut self) -> ReelResult<()>;
    fn abort(&mut self) {}
}

/// Keeps every pushed frame; lets tests inspect a clip without an encoder.
#[derive(Debug, Default)]
pub struct InMemorySink {
    started: Option<SinkConfig>,
    frames: Vec<(FrameIndex, RgbaImage)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config received by the last `begin`.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.started.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, RgbaImage)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.frames = Vec::with_capacity(usize::try_from(cfg.frame_count).unwrap_or(0));
        self.started = Some(cfg);
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> ReelResult<()> {
        self.frames.push((idx, frame.to_owned()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.finished = true;
        Ok(())
    }
}
