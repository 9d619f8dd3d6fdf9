use std::{fmt, str::FromStr};

use crate::foundation::error::{ReelError, ReelResult};

/// Absolute 0-based frame index in output clip time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    /// Non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Start time of frame number `frames`, in seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Number of frames covering `secs`, rounded to the nearest frame.
    ///
    /// This is the exact count every emitted clip carries; audio length is derived from it.
    pub fn frames_for_duration(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Output frame size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution; both sides must be non-zero.
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation(format!(
                "resolution must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Byte length of one RGBA8 frame at this resolution.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (w, h) = lower.split_once('x').ok_or_else(|| {
            ReelError::validation(format!("resolution '{s}' must look like WIDTHxHEIGHT"))
        })?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| ReelError::validation(format!("bad resolution width '{w}': {e}")))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| ReelError::validation(format!("bad resolution height '{h}': {e}")))?;
        Self::new(width, height)
    }
}

/// Integer pixel rectangle `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Exclusive right edge.
    pub fn right(self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u32 {
        self.y + self.height
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
