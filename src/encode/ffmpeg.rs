use std::ffi::OsString;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbaImage;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::process::{ensure_parent_dir, is_tool_on_path};

/// Where and how [`FfmpegSink`] writes its MP4.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// File ffmpeg muxes into. May carry any suffix; the container is always MP4.
    pub out_path: PathBuf,
    /// Replace `out_path` if it exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// A spawned encoder and the pipes attached to it.
struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl Encoder {
    fn spawn(args: Vec<OsString>) -> ReelResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReelError::encode(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child.stdin.take();
        // ffmpeg blocks once its stderr pipe fills, so drain it on the side.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf)?;
                Ok::<_, std::io::Error>(buf)
            })
        });
        if stdin.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReelError::encode("ffmpeg stdin was not captured"));
        }
        Ok(Self {
            child,
            stdin,
            stderr,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> ReelResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ReelError::encode("ffmpeg stdin already closed"))?;
        stdin
            .write_all(bytes)
            .map_err(|e| ReelError::encode(format!("failed to write frame to ffmpeg: {e}")))
    }

    fn collect_stderr(&mut self) -> String {
        match self.stderr.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_string(),
            _ => String::new(),
        }
    }

    fn finish(mut self) -> ReelResult<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| ReelError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = self.collect_stderr();
        if !status.success() {
            return Err(ReelError::encode(format!("ffmpeg exited with {status}: {stderr}")));
        }
        Ok(())
    }

    fn kill(mut self) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = self.collect_stderr();
    }
}

/// Sink that pipes raw RGBA frames into the system `ffmpeg` and muxes H.264/AAC MP4.
///
/// Audio, when configured, is read by ffmpeg from the raw `f32le` file named in
/// [`SinkConfig::audio`].
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    encoder: Option<Encoder>,
    frame_size: Option<(u32, u32)>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            encoder: None,
            frame_size: None,
            last_idx: None,
        }
    }
}

/// Full ffmpeg argument list for one clip.
pub(crate) fn encoder_args(cfg: &SinkConfig, out_path: &Path, overwrite: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));

    push(&[if overwrite { "-y" } else { "-n" }, "-loglevel", "error"]);
    // Rawvideo input: `-r` ahead of `-i` is the input rate.
    let size = format!("{}x{}", cfg.width, cfg.height);
    let rate = format!("{}/{}", cfg.fps.num, cfg.fps.den);
    push(&["-f", "rawvideo", "-pix_fmt", "rgba", "-s", size.as_str(), "-r", rate.as_str()]);
    push(&["-i", "pipe:0"]);

    match &cfg.audio {
        Some(audio) => {
            let ar = audio.sample_rate.to_string();
            let ac = audio.channels.to_string();
            push(&["-f", "f32le", "-ar", ar.as_str(), "-ac", ac.as_str(), "-i"]);
            args.push(audio.path.clone().into_os_string());
            push_codecs(&mut args, &["-c:a", "aac", "-shortest"]);
        }
        None => push_codecs(&mut args, &["-an"]),
    }

    // Partial outputs do not end in `.mp4`, so the muxer is named explicitly.
    args.extend(["-f", "mp4"].map(OsString::from));
    args.push(out_path.as_os_str().to_owned());
    args
}

fn push_codecs(args: &mut Vec<OsString>, audio: &[&str]) {
    let video = ["-c:v", "libx264", "-pix_fmt", "yuv420p"];
    args.extend(video.iter().chain(audio).map(OsString::from));
    args.extend(["-movflags", "+faststart"].map(OsString::from));
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if self.encoder.is_some() {
            return Err(ReelError::encode("ffmpeg sink already started"));
        }
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation("frame size must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::validation(format!(
                "frame size {}x{} must be even for yuv420p",
                cfg.width, cfg.height
            )));
        }
        if let Some(audio) = &cfg.audio
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(ReelError::validation(
                "audio input needs a non-zero sample rate and channel count",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encode("ffmpeg was not found on PATH"));
        }

        let args = encoder_args(&cfg, &self.opts.out_path, self.opts.overwrite);
        self.encoder = Some(Encoder::spawn(args)?);
        self.frame_size = Some((cfg.width, cfg.height));
        self.last_idx = None;
        tracing::debug!(
            out = %self.opts.out_path.display(),
            frames = cfg.frame_count,
            audio = cfg.audio.is_some(),
            "ffmpeg started"
        );
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> ReelResult<()> {
        let (Some(encoder), Some(size)) = (self.encoder.as_mut(), self.frame_size) else {
            return Err(ReelError::encode("ffmpeg sink not started"));
        };
        if self.last_idx.is_some_and(|last| idx <= last) {
            return Err(ReelError::encode(format!(
                "frame {} pushed out of order",
                idx.0
            )));
        }
        if frame.dimensions() != size {
            return Err(ReelError::validation(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                size.0,
                size.1
            )));
        }
        encoder.write(frame.as_raw())?;
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;
        self.frame_size = None;
        encoder.finish()
    }

    fn abort(&mut self) {
        self.frame_size = None;
        if let Some(encoder) = self.encoder.take() {
            encoder.kill();
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

/// `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_tool_on_path("ffmpeg", "-version")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
