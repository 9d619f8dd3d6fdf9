//! Turning a cropped page region into a frame-sized overlay.

/// Pixel filters applied to page content.
pub mod filter;
/// Overlay layout and backdrop.
pub mod overlay;
