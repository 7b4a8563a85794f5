use super::*;
use approx::assert_abs_diff_eq;

fn kf(time: f64, value: f64) -> Keyframe {
    Keyframe::new("volume", time, value)
}

#[test]
fn bezier_endpoints_are_exact_for_any_handles() {
    let handles = [
        (None, None),
        (Some(BezierHandle { x: 0.1, y: 2.5 }), None),
        (None, Some(BezierHandle { x: -0.4, y: -3.0 })),
        (
            Some(BezierHandle { x: 0.5, y: 0.9 }),
            Some(BezierHandle { x: -0.5, y: 0.7 }),
        ),
    ];
    for (out, inn) in handles {
        let prev = kf(0.0, 0.2).with_handles(None, out);
        let next = kf(1.0, 1.7)
            .with_easing(Easing::Bezier)
            .with_handles(inn, None);
        assert_abs_diff_eq!(bezier_interpolate(&prev, &next, 0.0), 0.2, epsilon = 1e-5);
        assert_abs_diff_eq!(bezier_interpolate(&prev, &next, 1.0), 1.7, epsilon = 1e-5);
    }
}

#[test]
fn bezier_without_handles_is_linear() {
    let prev = kf(0.0, 0.0);
    let next = kf(1.0, 2.0).with_easing(Easing::Bezier);
    assert_abs_diff_eq!(bezier_interpolate(&prev, &next, 0.25), 0.5, epsilon = 1e-12);
}

#[test]
fn default_handles_give_a_flat_s_curve() {
    let prev = kf(0.0, 0.0).with_handles(None, Some(DEFAULT_HANDLE_OUT));
    let next = kf(1.0, 1.0).with_easing(Easing::Bezier);
    // p1 = p0 and p2 = p3: the curve starts and ends flat, crossing 0.5 at the middle.
    assert_abs_diff_eq!(bezier_interpolate(&prev, &next, 0.5), 0.5, epsilon = 1e-12);
    assert!(bezier_interpolate(&prev, &next, 0.1) < 0.1);
}

#[test]
fn interpolate_holds_edges_and_uses_default_when_empty() {
    let keys = vec![kf(1.0, 0.5), kf(2.0, 1.5)];
    assert_eq!(interpolate(&keys, 0.0, 9.0), 0.5);
    assert_eq!(interpolate(&keys, 3.0, 9.0), 1.5);
    assert_eq!(interpolate(&[], 3.0, 9.0), 9.0);
    assert_abs_diff_eq!(interpolate(&keys, 1.5, 9.0), 1.0, epsilon = 1e-12);
}

#[test]
fn target_easing_shapes_the_incoming_segment() {
    let keys = vec![kf(0.0, 0.0), kf(1.0, 1.0).with_easing(Easing::EaseIn)];
    assert_abs_diff_eq!(interpolate(&keys, 0.5, 0.0), 0.25, epsilon = 1e-12);
    let keys = vec![kf(0.0, 0.0), kf(1.0, 1.0).with_easing(Easing::Step)];
    assert_eq!(interpolate(&keys, 0.9, 0.0), 0.0);
    assert_eq!(interpolate(&keys, 1.0, 0.0), 1.0);
}

#[test]
fn linear_value_ignores_easing() {
    let keys = vec![kf(0.0, 0.0), kf(1.0, 1.0).with_easing(Easing::Step)];
    assert_abs_diff_eq!(linear_value_at(&keys, 0.5, 0.0), 0.5, epsilon = 1e-12);
}

#[test]
fn keyframes_for_filters_and_sorts() {
    let keys = vec![
        Keyframe::new("speed", 2.0, 1.0),
        Keyframe::new("volume", 0.0, 1.0),
        Keyframe::new("speed", 0.5, 2.0),
        Keyframe::new("speed", f64::NAN, 3.0),
    ];
    let speed = keyframes_for(&keys, "speed");
    assert_eq!(speed.len(), 2);
    assert_eq!(speed[0].time, 0.5);
    assert_eq!(speed[1].time, 2.0);
    assert!(has_keyframes(&keys, "volume"));
    assert!(!has_keyframes(&keys, "pan"));
}

#[test]
fn keyframe_json_defaults_to_linear_without_handles() {
    let k: Keyframe =
        serde_json::from_str(r#"{"property":"speed","time":1.0,"value":2.0}"#).unwrap();
    assert_eq!(k.easing, Easing::Linear);
    assert!(k.handle_in.is_none() && k.handle_out.is_none());
}
