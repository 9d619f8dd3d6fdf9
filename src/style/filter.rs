use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::foundation::math::opacity_to_alpha;

/// How page pixels are turned into overlay pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Dark-on-light page text becomes white text on a translucent black backdrop.
    #[default]
    Inverted,
    /// Keep page colors; only the contrast remap is applied.
    Original,
}

const TEXT_LUMA: u8 = 200;
const MIDTONE_LUMA: u8 = 100;

/// Linear contrast remap around mid-gray: `v' = 128 + (v - 128) * contrast`.
pub fn remap_contrast(v: u8, contrast: f64) -> u8 {
    let out = 128.0 + (f64::from(v) - 128.0) * contrast;
    out.round().clamp(0.0, 255.0) as u8
}

/// Apply [`remap_contrast`] to every RGB channel.
pub fn enhance_contrast(img: &RgbImage, contrast: f64) -> RgbImage {
    if contrast == 1.0 {
        return img.clone();
    }
    let lut = contrast_lut(contrast);
    let mut out = img.clone();
    for px in out.pixels_mut() {
        *px = Rgb([lut[px[0] as usize], lut[px[1] as usize], lut[px[2] as usize]]);
    }
    out
}

/// Produce the straight-alpha RGBA content image for an overlay.
///
/// In [`TextMode::Inverted`] the page is converted to luma, inverted and contrast-enhanced,
/// then tone mapped: bright pixels become opaque white, mid-tones white with alpha equal to
/// their luma, everything else black at `bg_opacity`. [`TextMode::Original`] keeps every
/// pixel opaque.
pub fn apply_text_filter(
    img: &RgbImage,
    mode: TextMode,
    contrast: f64,
    bg_opacity: f64,
) -> RgbaImage {
    match mode {
        TextMode::Original => {
            image::DynamicImage::ImageRgb8(enhance_contrast(img, contrast)).into_rgba8()
        }
        TextMode::Inverted => {
            let lut = contrast_lut(contrast);
            let bg_alpha = opacity_to_alpha(bg_opacity);
            let luma = image::imageops::grayscale(img);
            let (w, h) = luma.dimensions();
            RgbaImage::from_fn(w, h, |x, y| {
                let v = lut[(255 - luma.get_pixel(x, y)[0]) as usize];
                if v > TEXT_LUMA {
                    Rgba([255, 255, 255, 255])
                } else if v > MIDTONE_LUMA {
                    Rgba([255, 255, 255, v])
                } else {
                    Rgba([0, 0, 0, bg_alpha])
                }
            })
        }
    }
}

fn contrast_lut(contrast: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = remap_contrast(i as u8, contrast);
    }
    lut
}

#[cfg(test)]
#[path = "../../tests/unit/style/filter.rs"]
mod tests;
