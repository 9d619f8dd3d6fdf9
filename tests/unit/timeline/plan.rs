use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn shorter_background_loops() {
    let plan = TimelinePlan::new(3.0, 10.0, fps30()).unwrap();
    assert_eq!(plan.regime(), Regime::Loop);
    assert_eq!(plan.frame_count(), 300);
    assert_eq!(plan.repeat_count(), 4);

    let segs = plan.segments();
    let bounds: Vec<(u32, f64, f64)> = segs
        .iter()
        .map(|s| (s.repeat, s.timeline_start_sec, s.timeline_end_sec))
        .collect();
    assert_eq!(
        bounds,
        vec![(0, 0.0, 3.0), (1, 3.0, 6.0), (2, 6.0, 9.0), (3, 9.0, 10.0)]
    );
    assert!((segs[3].len_sec() - 1.0).abs() < 1e-12);
}

#[test]
fn longer_or_equal_background_trims() {
    let plan = TimelinePlan::new(12.0, 5.0, fps30()).unwrap();
    assert_eq!(plan.regime(), Regime::Trim);
    assert_eq!(plan.segments().len(), 1);
    assert_eq!(plan.segments()[0].timeline_end_sec, 5.0);
    assert_eq!(plan.source_span_sec(), 5.0);

    let exact = TimelinePlan::new(5.0, 5.0, fps30()).unwrap();
    assert_eq!(exact.regime(), Regime::Trim);
    assert_eq!(exact.repeat_count(), 1);
}

#[test]
fn whole_multiple_does_not_add_an_empty_repeat() {
    let plan = TimelinePlan::new(2.0, 6.0, fps30()).unwrap();
    assert_eq!(plan.repeat_count(), 3);
    assert_eq!(plan.segments().last().unwrap().timeline_end_sec, 6.0);
}

#[test]
fn non_positive_background_is_empty() {
    for bg in [0.0, -1.0, f64::NAN] {
        assert!(matches!(
            TimelinePlan::new(bg, 5.0, fps30()),
            Err(ReelError::EmptyBackground(_))
        ));
    }
    assert!(matches!(
        TimelinePlan::new(3.0, 0.0, fps30()),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn frame_count_rounds_to_nearest() {
    assert_eq!(TimelinePlan::new(1.0, 2.51, fps30()).unwrap().frame_count(), 75);
    assert_eq!(TimelinePlan::new(1.0, 0.01, fps30()).unwrap().frame_count(), 0);
    let ntsc = Fps::new(30000, 1001).unwrap();
    assert_eq!(TimelinePlan::new(1.0, 10.0, ntsc).unwrap().frame_count(), 300);
}

#[test]
fn loop_cursor_restarts_at_each_repeat_origin() {
    let plan = TimelinePlan::new(3.0, 10.0, fps30()).unwrap();
    let steps: Vec<TimelineStep> = plan.cursor().collect();
    assert_eq!(steps.len(), 300);

    for (k, step) in steps.iter().enumerate() {
        assert_eq!(step.index, k as u64);
    }
    assert_eq!((steps[89].repeat, steps[90].repeat), (0, 1));
    assert_eq!(steps[90].source_time_sec, 0.0);
    assert_eq!(steps[180].repeat, 2);
    assert_eq!(steps[180].source_time_sec, 0.0);
    assert_eq!(steps[270].repeat, 3);
    assert!((steps[299].source_time_sec - 29.0 / 30.0).abs() < 1e-9);

    // Timestamps strictly increase by one frame.
    for w in steps.windows(2) {
        assert!((w[1].timestamp_sec - w[0].timestamp_sec - 1.0 / 30.0).abs() < 1e-9);
    }
}

#[test]
fn cursor_states_progress_to_done() {
    let plan = TimelinePlan::new(1.0, 0.1, fps30()).unwrap();
    let mut cur = plan.cursor();
    assert_eq!(cur.state(), CursorState::Trimming);
    assert_eq!(cur.len(), 3);
    assert_eq!(cur.by_ref().count(), 3);
    assert_eq!(cur.state(), CursorState::Done);
    assert!(cur.next().is_none());

    // 0.04s background at 30fps: frames 0 and 1 play pass 0, frame 2 starts pass 1.
    let plan = TimelinePlan::new(0.04, 0.2, fps30()).unwrap();
    let mut cur = plan.cursor();
    assert_eq!(cur.state(), CursorState::Looping(0));
    cur.next();
    cur.next();
    assert_eq!(cur.state(), CursorState::Looping(0));
    assert_eq!(cur.next().map(|s| s.repeat), Some(1));
    assert_eq!(cur.state(), CursorState::Looping(1));
}

#[test]
fn exact_match_equals_trim_of_longer_background() {
    let exact: Vec<_> = TimelinePlan::new(4.0, 4.0, fps30()).unwrap().cursor().collect();
    let trimmed: Vec<_> = TimelinePlan::new(9.0, 4.0, fps30()).unwrap().cursor().collect();
    assert_eq!(exact, trimmed);
    assert_eq!(exact.len(), 120);
    assert!(exact.iter().all(|s| s.repeat == 0));
}
