//! pagereel turns PDF pages into short vertical videos.
//!
//! Each page's text region is cropped by margin fractions, stylized into a frame-sized overlay
//! (white text on a translucent black panel) and alpha-composited over a background clip that is
//! looped or trimmed to an exact duration. Clips are encoded with the system `ffmpeg`.
//!
//! - Rasterize a page with a [`PageRasterizer`] and crop it with [`extract`]
//! - Build its [`Overlay`] with [`stylize`]
//! - Fit a [`BackgroundTrack`] to the target duration with [`build_timeline`]
//! - Blend and stream frames into a [`FrameSink`] through [`ClipEmitter`]
//!
//! [`BatchDriver`] runs all of the above over a page range on a bounded worker pool.
#![forbid(unsafe_code)]

mod foundation;

/// Audio spliced in lockstep with the video timeline.
pub mod audio;
/// Encoding sinks and clip emission.
pub mod encode;
/// Background video decoding.
pub mod media;
/// PDF page rasterization and cropping.
pub mod page;
/// Page and batch orchestration.
pub mod pipeline;
/// Frame compositing.
pub mod render;
/// Overlay styling.
pub mod style;
/// Loop/trim timeline.
pub mod timeline;

pub use crate::foundation::core::{Fps, FrameIndex, PixelRect, Resolution};
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::foundation::math::{FillGeometry, aspect_fill, aspect_fit};
pub use crate::foundation::process::is_tool_on_path;

pub use crate::audio::splice::{frame_to_sample, splice_audio, write_pcm_f32le};
pub use crate::encode::emit::{ClipEmitter, OutputClip, partial_path};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::media::background::{
    AudioPcm, BackgroundTrack, DecodeOpts, VideoSourceInfo, probe_video,
};
pub use crate::page::raster::{PageImage, PageRasterizer, PopplerRasterizer};
pub use crate::page::region::{CroppedImage, MarginSpec, crop_rect, extract};
pub use crate::pipeline::batch::{
    BatchDriver, BatchSummary, SkippedPage, clamp_page_range, output_file_name,
};
pub use crate::pipeline::cancel::CancelToken;
pub use crate::pipeline::config::PipelineConfig;
pub use crate::pipeline::page::{
    ClipTarget, PageJob, PageOutput, prepare_overlay, render_clip, run_page,
};
pub use crate::render::composite::{composite_frame, composite_frames, composite_in_place};
pub use crate::style::filter::{TextMode, apply_text_filter, enhance_contrast};
pub use crate::style::overlay::{DEFAULT_PANEL_PADDING, Overlay, PanelMode, StyleParams, stylize};
pub use crate::timeline::compose::{Timeline, TimelineFrame, build_timeline, fit_frame};
pub use crate::timeline::plan::{
    CursorState, Regime, TimelineCursor, TimelinePlan, TimelineSegment, TimelineStep,
};
