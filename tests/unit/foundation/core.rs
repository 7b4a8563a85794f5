use super::*;

#[test]
fn window_rejects_inverted_bounds() {
    assert!(TimeWindow::new(2.0, 1.0).is_err());
    assert!(TimeWindow::new(0.0, f64::NAN).is_err());
    let w = TimeWindow::new(1.0, 1.0).unwrap();
    assert!(w.is_empty());
    assert_eq!(w.duration(), 0.0);
}

#[test]
fn window_intersection_is_half_open() {
    let w = TimeWindow::new(0.0, 5.0).unwrap();
    assert!(w.intersects(4.0, 2.0));
    assert!(w.intersects(-1.0, 1.5));
    assert!(!w.intersects(5.0, 1.0));
    assert!(!w.intersects(-2.0, 2.0));
    assert!(w.contains(0.0));
    assert!(!w.contains(5.0));
}

#[test]
fn secs_to_frames_rounds_up_and_guards() {
    assert_eq!(secs_to_frames(5.0, 48_000), 240_000);
    assert_eq!(secs_to_frames(0.00001, 48_000), 1);
    assert_eq!(secs_to_frames(0.0, 48_000), 0);
    assert_eq!(secs_to_frames(-1.0, 48_000), 0);
    assert_eq!(secs_to_frames(f64::INFINITY, 48_000), 0);
    assert_eq!(secs_to_frames(0.1 * 3.0, 48_000), 14_400);
}

#[test]
fn frame_index_clamps_negative_positions() {
    assert_eq!(secs_to_frame_index(-0.5, 48_000), 0);
    assert_eq!(secs_to_frame_index(0.5, 48_000), 24_000);
}
