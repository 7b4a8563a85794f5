use super::*;
use approx::assert_abs_diff_eq;

#[test]
fn static_param_returns_default_everywhere() {
    let p = AudioParam::new(0.75);
    assert!(p.is_static());
    assert_eq!(p.value_at(-1.0), 0.75);
    assert_eq!(p.value_at(100.0), 0.75);
    let mut out = [0.0f32; 4];
    p.fill(&mut out, 0, 48_000);
    assert_eq!(out, [0.75; 4]);
}

#[test]
fn linear_ramp_interpolates_from_previous_event() {
    let mut p = AudioParam::new(1.0);
    p.set_value_at(0.0, 0.0);
    p.linear_ramp_to(1.0, 2.0);
    assert_abs_diff_eq!(p.value_at(0.0), 0.0);
    assert_abs_diff_eq!(p.value_at(1.0), 0.5);
    assert_abs_diff_eq!(p.value_at(2.0), 1.0);
    assert_abs_diff_eq!(p.value_at(5.0), 1.0);
}

#[test]
fn exponential_ramp_is_geometric() {
    let mut p = AudioParam::new(1.0);
    p.set_value_at(0.25, 0.0);
    p.exponential_ramp_to(1.0, 2.0);
    assert_abs_diff_eq!(p.value_at(1.0), 0.5, epsilon = 1e-12);
}

#[test]
fn exponential_ramp_through_zero_holds() {
    let mut p = AudioParam::new(1.0);
    p.set_value_at(0.0, 0.0);
    p.exponential_ramp_to(1.0, 1.0);
    assert_eq!(p.value_at(0.5), 0.0);
    assert_eq!(p.value_at(1.0), 1.0);
}

#[test]
fn set_value_steps_at_its_time() {
    let mut p = AudioParam::new(0.0);
    p.set_value_at(0.2, 0.0);
    p.set_value_at(0.9, 1.0);
    assert_eq!(p.value_at(0.999), 0.2);
    assert_eq!(p.value_at(1.0), 0.9);
}

#[test]
fn events_are_kept_in_time_order() {
    let mut p = AudioParam::new(0.0);
    p.linear_ramp_to(1.0, 2.0);
    p.set_value_at(0.5, 0.0);
    let times = p.events().iter().map(AutomationEvent::time).collect::<Vec<_>>();
    assert_eq!(times, vec![0.0, 2.0]);
}

#[test]
fn fill_samples_by_frame_time() {
    let mut p = AudioParam::new(0.0);
    p.set_value_at(0.0, 0.0);
    p.linear_ramp_to(1.0, 1.0);
    let mut out = [0.0f32; 5];
    p.fill(&mut out, 0, 4);
    assert_eq!(out, [0.0, 0.25, 0.5, 0.75, 1.0]);
}
