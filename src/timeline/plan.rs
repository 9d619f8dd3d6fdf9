use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

// Float tolerance at repetition seams, well below one frame at any practical rate.
const SEAM_EPS: f64 = 1e-9;

/// How a background of fixed length is fitted to the target duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regime {
    /// Background is shorter than the target: restart it from 0 until the target is covered.
    Loop,
    /// Background is at least as long as the target: play `[0, target)` only.
    Trim,
}

impl Regime {
    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::Trim => "trim",
        }
    }
}

/// One contiguous run of output time mapped onto background time `[0, len)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineSegment {
    /// Zero-based repetition of the background this run plays.
    pub repeat: u32,
    /// Output time the run starts at (`repeat * bg_duration`).
    pub timeline_start_sec: f64,
    /// Output time the run ends at, exclusive.
    pub timeline_end_sec: f64,
}

impl TimelineSegment {
    /// Length of the run in seconds; also the end of the background span it plays.
    pub fn len_sec(&self) -> f64 {
        self.timeline_end_sec - self.timeline_start_sec
    }
}

/// The loop/trim decision for one clip. Video frames and audio samples are both cut from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelinePlan {
    regime: Regime,
    bg_duration_sec: f64,
    target_duration_sec: f64,
    fps: Fps,
    frame_count: u64,
}

impl TimelinePlan {
    /// Decide the regime for a background of `bg_duration_sec` stretched or cut to
    /// `target_duration_sec` at `fps`.
    pub fn new(bg_duration_sec: f64, target_duration_sec: f64, fps: Fps) -> ReelResult<Self> {
        if !bg_duration_sec.is_finite() || bg_duration_sec <= 0.0 {
            return Err(ReelError::empty_background(format!(
                "background duration must be > 0, got {bg_duration_sec}"
            )));
        }
        if !target_duration_sec.is_finite() || target_duration_sec <= 0.0 {
            return Err(ReelError::validation(format!(
                "target duration must be > 0, got {target_duration_sec}"
            )));
        }
        if fps.num == 0 || fps.den == 0 {
            return Err(ReelError::validation("output fps must be > 0"));
        }

        let regime = if bg_duration_sec >= target_duration_sec {
            Regime::Trim
        } else {
            Regime::Loop
        };
        Ok(Self {
            regime,
            bg_duration_sec,
            target_duration_sec,
            fps,
            frame_count: fps.frames_for_duration(target_duration_sec),
        })
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn bg_duration_sec(&self) -> f64 {
        self.bg_duration_sec
    }

    pub fn target_duration_sec(&self) -> f64 {
        self.target_duration_sec
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// `round(target * fps)`, the exact number of frames every consumer must see.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Number of background repetitions, the last possibly partial. Trim is one.
    pub fn repeat_count(&self) -> u32 {
        match self.regime {
            Regime::Trim => 1,
            Regime::Loop => {
                let n = (self.target_duration_sec / self.bg_duration_sec - SEAM_EPS).ceil();
                n.max(1.0) as u32
            }
        }
    }

    /// Runs of output time in order; they tile `[0, target)` without gaps or overlap.
    pub fn segments(&self) -> Vec<TimelineSegment> {
        match self.regime {
            Regime::Trim => vec![TimelineSegment {
                repeat: 0,
                timeline_start_sec: 0.0,
                timeline_end_sec: self.target_duration_sec,
            }],
            Regime::Loop => (0..self.repeat_count())
                .map(|repeat| {
                    let start = f64::from(repeat) * self.bg_duration_sec;
                    TimelineSegment {
                        repeat,
                        timeline_start_sec: start,
                        timeline_end_sec: (start + self.bg_duration_sec)
                            .min(self.target_duration_sec),
                    }
                })
                .collect(),
        }
    }

    /// Longest background span any segment plays.
    pub fn source_span_sec(&self) -> f64 {
        self.bg_duration_sec.min(self.target_duration_sec)
    }

    /// Fresh cursor over every output frame.
    pub fn cursor(&self) -> TimelineCursor {
        TimelineCursor::new(*self)
    }
}

/// Where the cursor is in the plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// Playing the `repeat`-th pass of the background.
    Looping(u32),
    /// Playing the single trimmed pass.
    Trimming,
    /// Every frame has been produced.
    Done,
}

/// One output frame position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineStep {
    /// Zero-based output frame index.
    pub index: u64,
    /// Output timestamp, `index / fps`.
    pub timestamp_sec: f64,
    /// Background time shown at this frame.
    pub source_time_sec: f64,
    /// Repetition the frame belongs to (always 0 when trimming).
    pub repeat: u32,
}

/// Walks a [`TimelinePlan`] frame by frame.
///
/// The repetition origin of pass `N` is `N * bg_duration`, so a new pass starts on the first
/// frame whose timestamp reaches it.
#[derive(Clone, Debug)]
pub struct TimelineCursor {
    plan: TimelinePlan,
    next: u64,
    state: CursorState,
}

impl TimelineCursor {
    fn new(plan: TimelinePlan) -> Self {
        let state = if plan.frame_count == 0 {
            CursorState::Done
        } else {
            match plan.regime {
                Regime::Loop => CursorState::Looping(0),
                Regime::Trim => CursorState::Trimming,
            }
        };
        Self {
            plan,
            next: 0,
            state,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn plan(&self) -> &TimelinePlan {
        &self.plan
    }
}

impl Iterator for TimelineCursor {
    type Item = TimelineStep;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let t = self.plan.fps.frames_to_secs(index);
        let step = match self.state {
            CursorState::Done => return None,
            CursorState::Trimming => TimelineStep {
                index,
                timestamp_sec: t,
                source_time_sec: t,
                repeat: 0,
            },
            CursorState::Looping(mut repeat) => {
                let bg = self.plan.bg_duration_sec;
                while t >= f64::from(repeat + 1) * bg - SEAM_EPS {
                    repeat += 1;
                }
                self.state = CursorState::Looping(repeat);
                let origin = f64::from(repeat) * bg;
                TimelineStep {
                    index,
                    timestamp_sec: t,
                    source_time_sec: (t - origin).max(0.0),
                    repeat,
                }
            }
        };

        self.next += 1;
        if self.next >= self.plan.frame_count {
            self.state = CursorState::Done;
        }
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.state == CursorState::Done {
            0
        } else {
            (self.plan.frame_count - self.next) as usize
        };
        (left, Some(left))
    }
}

impl ExactSizeIterator for TimelineCursor {}

#[cfg(test)]
#[path = "../../tests/unit/timeline/plan.rs"]
mod tests;
