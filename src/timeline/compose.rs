use image::{RgbaImage, imageops::FilterType};

use crate::{
    foundation::core::{Fps, Resolution},
    foundation::error::{ReelError, ReelResult},
    foundation::math::aspect_fill,
    media::background::BackgroundTrack,
    timeline::plan::{TimelineCursor, TimelinePlan},
};

/// One background frame placed on the output timeline, already at output resolution.
#[derive(Clone, Debug)]
pub struct TimelineFrame {
    /// Zero-based output frame index.
    pub index: u64,
    /// Output timestamp in seconds.
    pub timestamp_sec: f64,
    /// Background repetition this frame belongs to.
    pub repeat: u32,
    /// Aspect-filled background pixels.
    pub image: RgbaImage,
}

/// Lazily produced background frames spanning exactly the target duration.
///
/// Consecutive output frames that map to the same source frame reuse one fitted image.
pub struct Timeline {
    background: BackgroundTrack,
    cursor: TimelineCursor,
    resolution: Resolution,
    last_fit: Option<(usize, RgbaImage)>,
}

impl Timeline {
    pub fn plan(&self) -> &TimelinePlan {
        self.cursor.plan()
    }

    fn fitted(&mut self, source_index: usize) -> RgbaImage {
        if let Some((idx, img)) = &self.last_fit
            && *idx == source_index
        {
            return img.clone();
        }
        let img = fit_frame(self.background.frame(source_index), self.resolution);
        self.last_fit = Some((source_index, img.clone()));
        img
    }
}

impl Iterator for Timeline {
    type Item = TimelineFrame;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.cursor.next()?;
        let source_index = self.background.frame_index_at(step.source_time_sec);
        let image = self.fitted(source_index);
        Some(TimelineFrame {
            index: step.index,
            timestamp_sec: step.timestamp_sec,
            repeat: step.repeat,
            image,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl ExactSizeIterator for Timeline {}

/// Build the frame source for one clip: loop or trim `bg` to `target_duration_sec` and
/// aspect-fill every frame to `resolution`.
#[tracing::instrument(level = "debug", skip(bg), fields(bg_duration = bg.duration_sec()))]
pub fn build_timeline(
    bg: &BackgroundTrack,
    target_duration_sec: f64,
    fps: Fps,
    resolution: Resolution,
) -> ReelResult<Timeline> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(ReelError::validation("timeline resolution must be non-zero"));
    }
    let plan = TimelinePlan::new(bg.duration_sec(), target_duration_sec, fps)?;
    tracing::debug!(
        regime = plan.regime().as_str(),
        frames = plan.frame_count(),
        repeats = plan.repeat_count(),
        "timeline planned"
    );
    Ok(Timeline {
        background: bg.clone(),
        cursor: plan.cursor(),
        resolution,
        last_fit: None,
    })
}

/// Scale `src` uniformly until it covers `target`, then center-crop to exactly `target`.
pub fn fit_frame(src: &RgbaImage, target: Resolution) -> RgbaImage {
    let (sw, sh) = src.dimensions();
    if (sw, sh) == (target.width, target.height) {
        return src.clone();
    }
    let g = aspect_fill(sw, sh, target.width, target.height);
    let crop = |img: &RgbaImage| {
        image::imageops::crop_imm(img, g.crop_x, g.crop_y, target.width, target.height).to_image()
    };
    if (g.scaled_width, g.scaled_height) == (sw, sh) {
        crop(src)
    } else {
        let scaled =
            image::imageops::resize(src, g.scaled_width, g.scaled_height, FilterType::Triangle);
        crop(&scaled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/compose.rs"]
mod tests;
