use std::path::Path;

use anyhow::Context as _;

use crate::{
    foundation::core::Fps,
    foundation::error::{ReelError, ReelResult},
    media::background::AudioPcm,
    timeline::plan::TimelinePlan,
};

/// Number of audio sample frames covering `frame_delta` video frames, rounded to nearest.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

/// Cut and repeat `pcm` along the same segments the video timeline uses.
///
/// The result holds exactly `frame_to_sample(plan.frame_count())` sample frames, so the encoder
/// sees audio and video of identical length. Source audio shorter than a segment is padded with
/// silence.
pub fn splice_audio(pcm: &AudioPcm, plan: &TimelinePlan) -> ReelResult<AudioPcm> {
    if pcm.channels == 0 || pcm.sample_rate == 0 {
        return Err(ReelError::validation(
            "audio must have at least one channel and a sample rate",
        ));
    }
    let ch = usize::from(pcm.channels);
    let rate = f64::from(pcm.sample_rate);
    let total = frame_to_sample(plan.frame_count(), plan.fps(), pcm.sample_rate) as usize;

    let segments = plan.segments();
    let mut bounds: Vec<usize> = segments
        .iter()
        .map(|s| ((s.timeline_start_sec * rate).round() as usize).min(total))
        .collect();
    bounds.push(total);

    let src = &pcm.interleaved_f32;
    let src_frames = pcm.frames();
    let mut out = Vec::with_capacity(total * ch);
    for w in bounds.windows(2) {
        let len = w[1].saturating_sub(w[0]);
        let copy = len.min(src_frames);
        out.extend_from_slice(&src[..copy * ch]);
        out.resize(out.len() + (len - copy) * ch, 0.0);
    }

    tracing::debug!(
        segments = segments.len(),
        samples = total,
        source_samples = src_frames,
        "audio spliced"
    );
    Ok(AudioPcm {
        sample_rate: pcm.sample_rate,
        channels: pcm.channels,
        interleaved_f32: out,
    })
}

/// Write interleaved samples as raw little-endian `f32` for the encoder.
pub fn write_pcm_f32le(path: &Path, pcm: &AudioPcm) -> ReelResult<()> {
    let mut bytes = Vec::with_capacity(pcm.interleaved_f32.len() * 4);
    for s in &pcm.interleaved_f32 {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write audio temp file '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/splice.rs"]
mod tests;
