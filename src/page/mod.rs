//! PDF page rasterization and margin cropping.

/// Page images and the rasterizer collaborator.
pub mod raster;
/// Margin-based region extraction.
pub mod region;
