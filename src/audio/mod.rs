//! Audio kept in lockstep with the video timeline.

pub mod splice;
