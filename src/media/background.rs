use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
};

use image::RgbaImage;

use crate::{
    foundation::core::Resolution,
    foundation::error::{ReelError, ReelResult},
    foundation::math::aspect_fill,
};

/// Sample rate every decoded background audio track is resampled to.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Stream facts reported by `ffprobe`.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Path the facts were read from.
    pub source_path: PathBuf,
    /// Native frame width.
    pub width: u32,
    /// Native frame height.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Whether an audio stream is present.
    pub has_audio: bool,
}

impl VideoSourceInfo {
    /// Native frame rate as a float (0 when unknown).
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Interleaved `f32` PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved samples, `frames * channels` long.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }
}

/// How much of the background to decode, and at what size.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOpts {
    /// Decode at most this many seconds from the start.
    pub max_duration_sec: Option<f64>,
    /// Downscale frames to the smallest size (aspect preserved) that still covers this.
    pub cover: Option<Resolution>,
    /// Skip the audio stream.
    pub skip_audio: bool,
    /// Refuse to decode when the frames would need more than this many bytes.
    pub max_bytes: Option<u64>,
}

/// Decoded background clip, shared read-only by every page of an invocation.
///
/// Frames are held in memory at a constant frame rate so any source time maps to one frame.
#[derive(Clone, Debug)]
pub struct BackgroundTrack {
    duration_sec: f64,
    frame_fps: f64,
    frames: Arc<Vec<RgbaImage>>,
    audio: Option<Arc<AudioPcm>>,
}

impl BackgroundTrack {
    /// Probe and decode the video at `path`.
    ///
    /// Any probe or decode failure is [`ReelError::UnreadableVideo`]; a clip without duration or
    /// frames is [`ReelError::EmptyBackground`].
    #[tracing::instrument(level = "debug", skip(opts))]
    pub fn open(path: &Path, opts: DecodeOpts) -> ReelResult<Self> {
        let info = probe_video(path)?;
        if !(info.duration_sec > 0.0) {
            return Err(ReelError::empty_background(format!(
                "'{}' reports no duration",
                path.display()
            )));
        }
        if info.source_fps() <= 0.0 {
            return Err(ReelError::unreadable_video(format!(
                "'{}' has no usable frame rate",
                path.display()
            )));
        }

        let decode_secs = opts
            .max_duration_sec
            .map(|d| d.min(info.duration_sec))
            .unwrap_or(info.duration_sec);
        let size = decode_size(&info, opts.cover);
        let budget = frame_budget(size, decode_secs, &info, opts.max_bytes)?;
        let frames = decode_video_frames_rgba8(&info, size, decode_secs, budget)?;
        if frames.is_empty() {
            return Err(ReelError::empty_background(format!(
                "'{}' decoded to zero frames",
                path.display()
            )));
        }

        let audio = if info.has_audio && !opts.skip_audio {
            let pcm = decode_audio_f32_stereo(path, MIX_SAMPLE_RATE, decode_secs)?;
            (!pcm.interleaved_f32.is_empty()).then(|| Arc::new(pcm))
        } else {
            None
        };

        tracing::info!(
            path = %path.display(),
            duration = info.duration_sec,
            fps = info.source_fps(),
            frames = frames.len(),
            size = %size,
            audio = audio.is_some(),
            "background decoded"
        );

        Ok(Self {
            duration_sec: info.duration_sec,
            frame_fps: info.source_fps(),
            frames: Arc::new(frames),
            audio,
        })
    }

    /// Build a track from already decoded frames.
    ///
    /// `duration_sec` is the full clip length; `frames` may cover only a prefix of it.
    pub fn from_frames(
        frames: Vec<RgbaImage>,
        frame_fps: f64,
        duration_sec: f64,
        audio: Option<AudioPcm>,
    ) -> ReelResult<Self> {
        if !(duration_sec > 0.0) || frames.is_empty() {
            return Err(ReelError::empty_background(format!(
                "background needs frames and a positive duration (got {} frames, {duration_sec}s)",
                frames.len()
            )));
        }
        if !(frame_fps > 0.0) || !frame_fps.is_finite() {
            return Err(ReelError::unreadable_video(format!(
                "background frame rate must be positive, got {frame_fps}"
            )));
        }
        let dims = frames[0].dimensions();
        if frames.iter().any(|f| f.dimensions() != dims) {
            return Err(ReelError::unreadable_video(
                "background frames must share one size",
            ));
        }
        Ok(Self {
            duration_sec,
            frame_fps,
            frames: Arc::new(frames),
            audio: audio.map(Arc::new),
        })
    }

    /// Total clip duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    /// Constant frame rate of the decoded frames.
    pub fn frame_fps(&self) -> f64 {
        self.frame_fps
    }

    /// Number of decoded frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Decoded frame size.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frames[0].dimensions()
    }

    /// Decoded audio, if the clip has any.
    pub fn audio(&self) -> Option<&AudioPcm> {
        self.audio.as_deref()
    }

    /// Index of the frame shown at `source_time_sec`.
    ///
    /// Times past the decoded range hold the last frame.
    pub fn frame_index_at(&self, source_time_sec: f64) -> usize {
        let pos = (source_time_sec.max(0.0) * self.frame_fps + 1e-6).floor();
        (pos as usize).min(self.frames.len() - 1)
    }

    /// Decoded frame by index.
    pub fn frame(&self, index: usize) -> &RgbaImage {
        &self.frames[index.min(self.frames.len() - 1)]
    }
}

#[derive(serde::Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Default, serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

impl ProbeStream {
    fn is(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }
}

/// Run an ffmpeg-family tool and return its stdout. Every failure is an unreadable video.
fn run_ff(tool: &str, path: &Path, args: &[&str], trailing: &[&str]) -> ReelResult<Vec<u8>> {
    let out = Command::new(tool)
        .args(args)
        .arg(path)
        .args(trailing)
        .output()
        .map_err(|e| ReelError::unreadable_video(format!("could not run {tool}: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::unreadable_video(format!(
            "{tool} rejected '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}

/// Read stream facts for `source_path` with `ffprobe`.
pub fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    let json = run_ff(
        "ffprobe",
        source_path,
        &["-v", "error", "-print_format", "json", "-show_streams", "-show_format"],
        &[],
    )?;
    let report: ProbeReport = serde_json::from_slice(&json)
        .map_err(|e| ReelError::unreadable_video(format!("unexpected ffprobe output: {e}")))?;

    let video = report.streams.iter().find(|s| s.is("video")).ok_or_else(|| {
        ReelError::unreadable_video(format!("'{}' has no video stream", source_path.display()))
    })?;
    let (Some(width), Some(height)) = (video.width, video.height) else {
        return Err(ReelError::unreadable_video(format!(
            "'{}' reports no frame size",
            source_path.display()
        )));
    };
    let (fps_num, fps_den) = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_ff_ratio)
        .unwrap_or((0, 1));
    // Container duration wins; some muxers only fill in the stream's.
    let duration_sec = [report.format.duration.as_deref(), video.duration.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio: report.streams.iter().any(|s| s.is("audio")),
    })
}

/// Size frames are decoded at: native, or downscaled to just cover `cover`.
pub(crate) fn decode_size(info: &VideoSourceInfo, cover: Option<Resolution>) -> Resolution {
    let native = Resolution {
        width: info.width,
        height: info.height,
    };
    let Some(cover) = cover else {
        return native;
    };
    let g = aspect_fill(info.width, info.height, cover.width, cover.height);
    if g.scaled_width >= info.width || g.scaled_height >= info.height {
        native
    } else {
        Resolution {
            width: g.scaled_width,
            height: g.scaled_height,
        }
    }
}

/// Frames a decode of `duration_sec` at the source rate yields, checked against `max_bytes`.
pub(crate) fn frame_budget(
    size: Resolution,
    duration_sec: f64,
    source: &VideoSourceInfo,
    max_bytes: Option<u64>,
) -> ReelResult<u64> {
    let frames = (duration_sec.max(0.0) * source.source_fps()).ceil().max(1.0) as u64;
    let bytes = frames.saturating_mul(size.rgba_len() as u64);
    if let Some(cap) = max_bytes
        && bytes > cap
    {
        return Err(ReelError::validation(format!(
            "background needs {} MiB for {frames} frames at {size}, over the {} MiB limit; \
             shorten the clip, lower the resolution or raise max_background_mb",
            bytes.div_ceil(1 << 20),
            cap >> 20
        )));
    }
    Ok(frames)
}

/// Split a raw RGBA stream into frames, filling each buffer straight from `reader`.
///
/// Stops after `max_frames` or at end of stream; a trailing partial frame is an error.
pub(crate) fn read_rgba_frames<R: Read>(
    mut reader: R,
    size: Resolution,
    max_frames: u64,
) -> ReelResult<Vec<RgbaImage>> {
    let frame_len = size.rgba_len();
    let mut frames = Vec::new();
    while (frames.len() as u64) < max_frames {
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(ReelError::unreadable_video(format!(
                        "failed to read decoded frames: {e}"
                    )));
                }
            }
        }
        if filled == 0 {
            break;
        }
        if filled < frame_len {
            return Err(ReelError::unreadable_video(format!(
                "decoder stopped {filled} bytes into a {}x{} frame",
                size.width, size.height
            )));
        }
        let frame = RgbaImage::from_raw(size.width, size.height, buf)
            .ok_or_else(|| ReelError::unreadable_video("decoded frame has the wrong length"))?;
        frames.push(frame);
    }
    Ok(frames)
}

fn decode_video_frames_rgba8(
    source: &VideoSourceInfo,
    size: Resolution,
    duration_sec: f64,
    max_frames: u64,
) -> ReelResult<Vec<RgbaImage>> {
    if size.rgba_len() == 0 {
        return Err(ReelError::unreadable_video("source frame size is zero"));
    }
    // Resample to a constant rate so frame indices map linearly to source time.
    let filter = format!(
        "fps={}/{},scale={}:{}",
        source.fps_num, source.fps_den, size.width, size.height
    );
    let limit = format!("{duration_sec:.6}");
    let frames_arg = max_frames.to_string();
    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(&source.source_path)
        .args(["-t", limit.as_str(), "-frames:v", frames_arg.as_str(), "-an"])
        .args(["-vf", filter.as_str(), "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReelError::unreadable_video(format!("could not run ffmpeg: {e}")))?;

    let stderr = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(ReelError::unreadable_video("ffmpeg stdout was not captured"));
    };

    let frames = read_rgba_frames(stdout, size, max_frames);
    if frames.is_err() {
        let _ = child.kill();
    }
    let status = child
        .wait()
        .map_err(|e| ReelError::unreadable_video(format!("failed to wait for ffmpeg: {e}")))?;
    let stderr = stderr
        .and_then(|h| h.join().ok())
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default();
    let frames = frames?;
    if !status.success() {
        return Err(ReelError::unreadable_video(format!(
            "ffmpeg rejected '{}': {stderr}",
            source.source_path.display()
        )));
    }
    Ok(frames)
}

fn decode_audio_f32_stereo(
    path: &Path,
    sample_rate: u32,
    duration_sec: f64,
) -> ReelResult<AudioPcm> {
    let limit = format!("{duration_sec:.6}");
    let rate = sample_rate.to_string();
    let raw = run_ff(
        "ffmpeg",
        path,
        &["-v", "error", "-i"],
        &[
            "-t", limit.as_str(), "-map", "0:a:0", "-f", "f32le", "-acodec", "pcm_f32le", "-ac", "2",
            "-ar", rate.as_str(), "pipe:1",
        ],
    )?;
    let interleaved_f32 = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<u32>().ok()?;
    let den = den.trim().parse::<u32>().ok()?;
    (den != 0).then_some((num, den))
}

#[cfg(test)]
#[path = "../../tests/unit/media/background.rs"]
mod tests;
