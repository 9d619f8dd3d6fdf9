//! Encoding sinks.
//!
//! Sinks consume composited frames in timeline order; [`emit::ClipEmitter`] drives one sink per
//! page and owns the partial-file lifecycle.

/// Per-page clip emission and atomic output.
pub mod emit;
/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
