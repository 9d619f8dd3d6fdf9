use image::{Rgba, RgbaImage, imageops::FilterType};

use crate::{
    foundation::core::{PixelRect, Resolution},
    foundation::error::{ReelError, ReelResult},
    foundation::math::{
        aspect_fit, opacity_to_alpha, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place,
    },
    page::region::CroppedImage,
    style::filter::{TextMode, apply_text_filter},
};

/// Padding used for [`PanelMode::Padded`] when none is given.
pub const DEFAULT_PANEL_PADDING: u32 = 60;

/// Where the translucent black backdrop is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelMode {
    /// The backdrop covers the whole output frame.
    #[default]
    FullFrame,
    /// The backdrop covers only the content plus `padding` pixels on each side.
    Padded {
        /// Padding around the content, in output pixels.
        padding: u32,
    },
}

/// Styling knobs for turning a cropped page region into an overlay.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleParams {
    /// Fraction of the output frame the content may occupy, in `(0, 1]`.
    pub scale: f64,
    /// Backdrop opacity, in `[0, 1]`.
    pub bg_opacity: f64,
    /// Contrast factor, `>= 0` (`1.0` leaves the page unchanged).
    pub contrast: f64,
    /// Page pixel treatment.
    pub text_mode: TextMode,
    /// Backdrop extent.
    pub panel: PanelMode,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            scale: 0.9,
            bg_opacity: 0.8,
            contrast: 2.0,
            text_mode: TextMode::Inverted,
            panel: PanelMode::FullFrame,
        }
    }
}

impl StyleParams {
    /// Reject out-of-range knobs.
    pub fn validate(&self) -> ReelResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(ReelError::validation(format!(
                "scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        if !self.bg_opacity.is_finite() || !(0.0..=1.0).contains(&self.bg_opacity) {
            return Err(ReelError::validation(format!(
                "bg opacity must be in [0, 1], got {}",
                self.bg_opacity
            )));
        }
        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(ReelError::validation(format!(
                "contrast must be >= 0, got {}",
                self.contrast
            )));
        }
        Ok(())
    }
}

/// Output-sized straight-alpha RGBA image laid over every frame of one clip.
#[derive(Clone, Debug)]
pub struct Overlay {
    /// Straight (non-premultiplied) RGBA pixels at the output resolution.
    pub image: RgbaImage,
    /// Placement of the scaled page content.
    pub content_rect: PixelRect,
}

/// Build the overlay for one page: filtered content, aspect-fit into `scale * target`,
/// centered on a `target`-sized canvas with the translucent backdrop.
#[tracing::instrument(level = "debug", skip(cropped), fields(w = cropped.width(), h = cropped.height()))]
pub fn stylize(
    cropped: &CroppedImage,
    params: &StyleParams,
    target: Resolution,
) -> ReelResult<Overlay> {
    params.validate()?;
    if cropped.width() == 0 || cropped.height() == 0 {
        return Err(ReelError::empty_region(format!(
            "cropped region is {}x{}",
            cropped.width(),
            cropped.height()
        )));
    }
    if target.width == 0 || target.height == 0 {
        return Err(ReelError::validation("overlay target must be non-zero"));
    }

    let content = apply_text_filter(
        &cropped.image,
        params.text_mode,
        params.contrast,
        params.bg_opacity,
    );

    let (fit_w, fit_h) = aspect_fit(
        cropped.width(),
        cropped.height(),
        params.scale * f64::from(target.width),
        params.scale * f64::from(target.height),
    );
    let resized = if (fit_w, fit_h) == content.dimensions() {
        content
    } else {
        // Resampling straight alpha bleeds the color of transparent pixels into the edges.
        let mut content = content;
        premultiply_rgba8_in_place(&mut content);
        let mut resized = image::imageops::resize(&content, fit_w, fit_h, FilterType::Lanczos3);
        unpremultiply_rgba8_in_place(&mut resized);
        resized
    };

    let content_rect = PixelRect {
        x: (target.width - fit_w) / 2,
        y: (target.height - fit_h) / 2,
        width: fit_w,
        height: fit_h,
    };

    let backdrop = Rgba([0, 0, 0, opacity_to_alpha(params.bg_opacity)]);
    let mut image = match params.panel {
        PanelMode::FullFrame => RgbaImage::from_pixel(target.width, target.height, backdrop),
        PanelMode::Padded { padding } => {
            let mut canvas = RgbaImage::new(target.width, target.height);
            fill_rect(&mut canvas, pad_rect(content_rect, padding, target), backdrop);
            canvas
        }
    };

    // Content overwrites the backdrop, alpha included.
    image::imageops::replace(
        &mut image,
        &resized,
        i64::from(content_rect.x),
        i64::from(content_rect.y),
    );

    tracing::debug!(
        fit_w,
        fit_h,
        x = content_rect.x,
        y = content_rect.y,
        "overlay built"
    );
    Ok(Overlay {
        image,
        content_rect,
    })
}

fn pad_rect(rect: PixelRect, padding: u32, bounds: Resolution) -> PixelRect {
    let x = rect.x.saturating_sub(padding);
    let y = rect.y.saturating_sub(padding);
    let right = rect.right().saturating_add(padding).min(bounds.width);
    let bottom = rect.bottom().saturating_add(padding).min(bounds.height);
    PixelRect {
        x,
        y,
        width: right - x,
        height: bottom - y,
    }
}

fn fill_rect(img: &mut RgbaImage, rect: PixelRect, px: Rgba<u8>) {
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            img.put_pixel(x, y, px);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/style/overlay.rs"]
mod tests;
