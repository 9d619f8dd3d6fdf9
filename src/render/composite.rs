use image::RgbaImage;
use rayon::prelude::*;

use crate::{
    foundation::error::{ReelError, ReelResult},
    foundation::math::{mul_div255_u8, mul_div255_u16},
    style::overlay::Overlay,
};

pub type Rgba8 = [u8; 4];

/// Straight-alpha "over": `out = src.rgb * a + dst.rgb * (1 - a)` with `a = src.alpha`.
///
/// `a == 0` leaves `dst` untouched and `a == 255` yields `src.rgb` exactly.
pub fn over_straight(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let a = u16::from(src[3]);
    if a == 0 {
        return dst;
    }
    if a == 255 {
        return [src[0], src[1], src[2], 255];
    }
    let inv = 255 - a;
    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = mul_div255_u16(u16::from(src[i]), a);
        let dc = mul_div255_u16(u16::from(dst[i]), inv);
        out[i] = (sc + dc).min(255) as u8;
    }
    out[3] = src[3].saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    out
}

/// Blend `overlay` onto `frame` in place.
pub fn composite_in_place(frame: &mut RgbaImage, overlay: &Overlay) -> ReelResult<()> {
    if frame.dimensions() != overlay.image.dimensions() {
        let (fw, fh) = frame.dimensions();
        let (ow, oh) = overlay.image.dimensions();
        return Err(ReelError::validation(format!(
            "overlay {ow}x{oh} does not match frame {fw}x{fh}"
        )));
    }
    for (d, s) in frame
        .chunks_exact_mut(4)
        .zip(overlay.image.as_raw().chunks_exact(4))
    {
        let out = over_straight([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend `overlay` onto a copy of `bg_frame`.
pub fn composite_frame(bg_frame: &RgbaImage, overlay: &Overlay) -> ReelResult<RgbaImage> {
    let mut out = bg_frame.clone();
    composite_in_place(&mut out, overlay)?;
    Ok(out)
}

/// Blend `overlay` onto every frame of a chunk, frames in parallel on the current rayon pool.
pub fn composite_frames(frames: &mut [RgbaImage], overlay: &Overlay) -> ReelResult<()> {
    frames
        .par_iter_mut()
        .try_for_each(|frame| composite_in_place(frame, overlay))
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
