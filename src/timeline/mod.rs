//! Fitting a background clip to a target duration.
//!
//! [`plan`] holds the loop/trim arithmetic shared by video and audio; [`compose`] turns a plan
//! into output-sized frames.

pub mod compose;
pub mod plan;
