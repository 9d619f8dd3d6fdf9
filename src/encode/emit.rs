use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    audio::splice::{splice_audio, write_pcm_f32le},
    encode::sink::{AudioInputConfig, FrameSink, SinkConfig},
    foundation::core::{FrameIndex, Resolution},
    foundation::error::{ReelError, ReelResult},
    foundation::process::{TempFileGuard, ensure_parent_dir},
    media::background::AudioPcm,
    timeline::plan::TimelinePlan,
};

/// A finished clip on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputClip {
    /// Final output path.
    pub path: PathBuf,
    /// 1-based source page.
    pub page: u32,
    pub resolution: Resolution,
    /// Exact duration, `frame_count / fps`.
    pub duration_sec: f64,
    pub frame_count: u64,
}

/// Hidden sibling the encoder writes to before the atomic rename.
pub fn partial_path(final_path: &Path) -> PathBuf {
    sibling(final_path, "partial.mp4")
}

fn audio_scratch_path(final_path: &Path) -> PathBuf {
    sibling(final_path, "audio.f32le")
}

fn sibling(final_path: &Path, suffix: &str) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    final_path.with_file_name(format!(".{stem}.{suffix}"))
}

/// Streams one page's composited frames into a [`FrameSink`].
///
/// The sink is expected to write [`partial_path`]; [`ClipEmitter::finish`] renames that file to
/// the final path once the sink has closed cleanly. Dropping an unfinished emitter aborts the
/// sink and removes the partial file.
pub struct ClipEmitter<'a> {
    sink: &'a mut dyn FrameSink,
    final_path: PathBuf,
    partial: TempFileGuard,
    _audio: TempFileGuard,
    page: u32,
    resolution: Resolution,
    plan: TimelinePlan,
    pushed: u64,
    open: bool,
}

impl<'a> ClipEmitter<'a> {
    /// Prepare audio (spliced along `plan`) and open the sink.
    pub fn begin(
        sink: &'a mut dyn FrameSink,
        final_path: &Path,
        page: u32,
        resolution: Resolution,
        plan: &TimelinePlan,
        audio: Option<&AudioPcm>,
    ) -> ReelResult<Self> {
        ensure_parent_dir(final_path)?;

        let mut audio_guard = TempFileGuard(None);
        let audio_cfg = match audio {
            Some(pcm) if !pcm.interleaved_f32.is_empty() => {
                let spliced = splice_audio(pcm, plan)?;
                let path = audio_scratch_path(final_path);
                write_pcm_f32le(&path, &spliced)?;
                audio_guard.0 = Some(path.clone());
                Some(AudioInputConfig {
                    path,
                    sample_rate: spliced.sample_rate,
                    channels: spliced.channels,
                })
            }
            _ => None,
        };

        let mut emitter = Self {
            sink,
            final_path: final_path.to_path_buf(),
            partial: TempFileGuard(Some(partial_path(final_path))),
            _audio: audio_guard,
            page,
            resolution,
            plan: *plan,
            pushed: 0,
            open: false,
        };
        emitter.sink.begin(SinkConfig {
            width: resolution.width,
            height: resolution.height,
            fps: plan.fps(),
            frame_count: plan.frame_count(),
            audio: audio_cfg,
        })?;
        emitter.open = true;
        Ok(emitter)
    }

    /// Push the next frame in timeline order.
    pub fn push(&mut self, frame: &RgbaImage) -> ReelResult<()> {
        if self.pushed >= self.plan.frame_count() {
            return Err(ReelError::encode(format!(
                "clip for page {} already has all {} frames",
                self.page,
                self.plan.frame_count()
            )));
        }
        self.sink.push_frame(FrameIndex(self.pushed), frame)?;
        self.pushed += 1;
        Ok(())
    }

    /// Close the sink and move the partial file into place.
    pub fn finish(mut self) -> ReelResult<OutputClip> {
        if self.pushed != self.plan.frame_count() {
            return Err(ReelError::encode(format!(
                "clip for page {} got {} frames, expected {}",
                self.page,
                self.pushed,
                self.plan.frame_count()
            )));
        }
        self.open = false;
        self.sink.end()?;

        if let Some(partial) = self.partial.0.as_deref()
            && partial.exists()
        {
            std::fs::rename(partial, &self.final_path).with_context(|| {
                format!(
                    "failed to move '{}' to '{}'",
                    partial.display(),
                    self.final_path.display()
                )
            })?;
        }
        self.partial.disarm();

        let clip = OutputClip {
            path: self.final_path.clone(),
            page: self.page,
            resolution: self.resolution,
            duration_sec: self.plan.fps().frames_to_secs(self.pushed),
            frame_count: self.pushed,
        };
        tracing::info!(page = clip.page, out = %clip.path.display(), frames = clip.frame_count, "clip written");
        Ok(clip)
    }
}

impl Drop for ClipEmitter<'_> {
    fn drop(&mut self) {
        if self.open {
            self.sink.abort();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/emit.rs"]
mod tests;
