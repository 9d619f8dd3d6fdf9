//! Per-frame overlay compositing.

pub mod composite;
