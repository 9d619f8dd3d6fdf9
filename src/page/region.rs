use image::RgbImage;

use crate::{
    foundation::core::PixelRect,
    foundation::error::{ReelError, ReelResult},
    page::raster::PageImage,
};

/// Fractions of the page to exclude on each side (headers, footers, gutters).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarginSpec {
    /// Fraction of page height removed from the top.
    pub top: f64,
    /// Fraction of page height removed from the bottom.
    pub bottom: f64,
    /// Fraction of page width removed from the left.
    pub left: f64,
    /// Fraction of page width removed from the right.
    pub right: f64,
}

impl MarginSpec {
    /// Same fraction on all four sides.
    pub fn uniform(m: f64) -> Self {
        Self {
            top: m,
            bottom: m,
            left: m,
            right: m,
        }
    }

    /// Keep the whole page.
    pub fn none() -> Self {
        Self::uniform(0.0)
    }

    /// Check every fraction is in `[0, 1)` and opposite sides leave something behind.
    pub fn validate(&self) -> ReelResult<()> {
        for (name, v) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !v.is_finite() || !(0.0..1.0).contains(&v) {
                return Err(ReelError::invalid_margin(format!(
                    "{name} margin must be in [0, 1), got {v}"
                )));
            }
        }
        if self.top + self.bottom >= 1.0 {
            return Err(ReelError::invalid_margin(format!(
                "top + bottom must be < 1, got {}",
                self.top + self.bottom
            )));
        }
        if self.left + self.right >= 1.0 {
            return Err(ReelError::invalid_margin(format!(
                "left + right must be < 1, got {}",
                self.left + self.right
            )));
        }
        Ok(())
    }
}

impl Default for MarginSpec {
    fn default() -> Self {
        Self::uniform(0.1)
    }
}

/// The retained content region of a page.
#[derive(Clone, Debug)]
pub struct CroppedImage {
    /// Cropped RGB pixels.
    pub image: RgbImage,
    /// Where the crop sat on the source page.
    pub rect: PixelRect,
}

impl CroppedImage {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Compute the retained rectangle of a `width x height` page.
pub fn crop_rect(width: u32, height: u32, margins: &MarginSpec) -> ReelResult<PixelRect> {
    margins.validate()?;

    let w = f64::from(width);
    let h = f64::from(height);
    let left = round_clamped(w * margins.left, width);
    let right = round_clamped(w * (1.0 - margins.right), width);
    let top = round_clamped(h * margins.top, height);
    let bottom = round_clamped(h * (1.0 - margins.bottom), height);

    if right <= left || bottom <= top {
        return Err(ReelError::invalid_margin(format!(
            "margins leave no content on a {width}x{height} page (x {left}..{right}, y {top}..{bottom})"
        )));
    }

    Ok(PixelRect {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    })
}

/// Crop the content region of `page` according to `margins`.
pub fn extract(page: &PageImage, margins: &MarginSpec) -> ReelResult<CroppedImage> {
    let rect = crop_rect(page.width(), page.height(), margins)?;
    let image =
        image::imageops::crop_imm(&page.image, rect.x, rect.y, rect.width, rect.height).to_image();
    Ok(CroppedImage { image, rect })
}

fn round_clamped(v: f64, max: u32) -> u32 {
    (v.round().max(0.0) as u32).min(max)
}

#[cfg(test)]
#[path = "../../tests/unit/page/region.rs"]
mod tests;
