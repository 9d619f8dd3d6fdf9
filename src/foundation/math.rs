pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = mul_div255_u8(u16::from(*c), a);
        }
    }
}

/// Inverse of [`premultiply_rgba8_in_place`]; color channels are clamped to alpha first.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c).min(a) * 255 + a / 2) / a) as u8;
        }
    }
}

/// Opacity fraction in `[0, 1]` to an 8-bit alpha value.
pub(crate) fn opacity_to_alpha(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Largest `(w, h)` with the aspect of `src_w x src_h` that fits inside `box_w x box_h`.
///
/// Both results are at least one pixel.
pub fn aspect_fit(src_w: u32, src_h: u32, box_w: f64, box_h: f64) -> (u32, u32) {
    let sw = f64::from(src_w.max(1));
    let sh = f64::from(src_h.max(1));
    let s = (box_w / sw).min(box_h / sh);
    let w = (sw * s).round().min(box_w.floor()).max(1.0);
    let h = (sh * s).round().min(box_h.floor()).max(1.0);
    (w as u32, h as u32)
}

/// Scale-then-crop geometry that makes a `src` image exactly fill a target size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillGeometry {
    /// Width after the uniform scale, before cropping.
    pub scaled_width: u32,
    /// Height after the uniform scale, before cropping.
    pub scaled_height: u32,
    /// Left crop offset inside the scaled image.
    pub crop_x: u32,
    /// Top crop offset inside the scaled image.
    pub crop_y: u32,
}

/// Aspect-fill: uniformly scale `src` to cover `target`, then center-crop the overflow.
pub fn aspect_fill(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> FillGeometry {
    let sw = f64::from(src_w.max(1));
    let sh = f64::from(src_h.max(1));
    let s = (f64::from(target_w) / sw).max(f64::from(target_h) / sh);
    let scaled_width = ((sw * s).round() as u32).max(target_w);
    let scaled_height = ((sh * s).round() as u32).max(target_h);
    FillGeometry {
        scaled_width,
        scaled_height,
        crop_x: (scaled_width - target_w) / 2,
        crop_y: (scaled_height - target_h) / 2,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
