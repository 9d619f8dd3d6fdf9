//! Per-page pipeline runs and the batch driver that fans them out.

/// Page-range batch driver.
pub mod batch;
/// Shared cancellation flag.
pub mod cancel;
/// Invocation-wide configuration.
pub mod config;
/// One page from raster to clip.
pub mod page;
