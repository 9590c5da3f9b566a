use brotview_core::{
    evaluate, map_point, navigation, Rect, Session, Vector, ViewState, WeightedResult,
    DIVERGENCE_LIMIT,
};

/// Evaluate every pixel of a `width × height` grid over `plane`.
fn evaluate_grid(plane: &Rect, width: u32, height: u32, budget: u32) -> Vec<WeightedResult> {
    let pixels = Rect::from_size(width, height);
    let mut results = Vec::with_capacity((width * height) as usize);
    for py in 0..height {
        for px in 0..width {
            let c = map_point(Vector::new(px as f64, py as f64), &pixels, plane);
            results.push(evaluate(c, budget, DIVERGENCE_LIMIT));
        }
    }
    results
}

#[test]
fn full_set_grid_has_members_and_escapes() {
    let results = evaluate_grid(&ViewState::FULL_SET, 100, 100, 50);
    assert_eq!(results.len(), 100 * 100);

    let members = results.iter().filter(|r| r.is_member()).count();
    let escaped = results.len() - members;
    assert!(members > 0, "should have some members");
    assert!(escaped > 0, "should have some escaped points");
}

#[test]
fn centre_pixel_of_full_set_is_member() {
    let results = evaluate_grid(&ViewState::FULL_SET, 100, 100, 50);
    // Pixel (50, 50) maps to c = -0.5 + 0i.
    assert!(results[50 * 100 + 50].is_member());
    // Pixel (0, 0) maps to c = -2 - 1.5i, far outside.
    assert!(!results[0].is_member());
}

#[test]
fn grid_is_deterministic() {
    let plane = Rect::new(-0.8, 0.05, 0.1, 0.1).unwrap();
    let run1 = evaluate_grid(&plane, 64, 48, 300);
    let run2 = evaluate_grid(&plane, 64, 48, 300);
    assert_eq!(run1, run2);
}

#[test]
fn navigation_feeds_session() {
    let mut session = Session::with_defaults();
    let viewport = Rect::from_size(100, 100);

    let zoomed = navigation::zoom_at(&session.rect(), Vector::new(50.0, 50.0), &viewport, -2.0);
    session.set_rect(zoomed).unwrap();
    assert!((session.rect().w - 3.0 / 2.25).abs() < 1e-12);

    let panned = navigation::pan(&session.rect(), Vector::new(5.0, 0.0), Vector::new(100.0, 100.0));
    session.set_rect(panned).unwrap();
    assert!(session.rect().center().x < -0.5);

    // Zooming by an absurd amount underflows the extents to zero, which the
    // session refuses.
    let degenerate = navigation::zoom_at(&session.rect(), Vector::ZERO, &viewport, -5000.0);
    assert!(session.set_rect(degenerate).is_err());
    assert_eq!(session.rect(), panned);
}
