#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use rand::Rng;

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

/// 100x100 logical image in an 800x600 viewport: fitted at 600x600, offset (100, 0).
fn square_fit() -> ImageFit {
    ImageFit::contain(Size::new(100.0, 100.0), Size::new(800.0, 600.0))
}

// --- Point ---

#[test]
fn point_new() {
    let p = Point::new(3.0, 4.0);
    assert_eq!(p.x, 3.0);
    assert_eq!(p.y, 4.0);
}

#[test]
fn point_distance() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0));
}

#[test]
fn point_midpoint_and_lerp() {
    let a = Point::new(0.0, 10.0);
    let b = Point::new(10.0, 20.0);
    assert_eq!(a.midpoint(b), Point::new(5.0, 15.0));
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 0.5), a.midpoint(b));
}

// --- Camera ---

#[test]
fn camera_default_is_identity() {
    let cam = Camera::default();
    assert_eq!(cam.pan_x, 0.0);
    assert_eq!(cam.pan_y, 0.0);
    assert_eq!(cam.zoom, 1.0);
}

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let cam = Camera { pan_x: 20.0, pan_y: 10.0, zoom: 2.0 };
    let world = cam.screen_to_world(Point::new(20.0, 10.0));
    assert!(point_approx_eq(world, Point::new(0.0, 0.0)));
}

#[test]
fn world_to_screen_with_pan_and_zoom() {
    let cam = Camera { pan_x: 20.0, pan_y: 10.0, zoom: 3.0 };
    let screen = cam.world_to_screen(Point::new(5.0, 5.0));
    // 5*3 + 20 = 35, 5*3 + 10 = 25
    assert!(approx_eq(screen.x, 35.0));
    assert!(approx_eq(screen.y, 25.0));
}

#[test]
fn camera_round_trip_fractional_zoom() {
    let cam = Camera { pan_x: 13.7, pan_y: -42.3, zoom: 0.75 };
    let world = Point::new(333.3, -999.9);
    let back = cam.screen_to_world(cam.world_to_screen(world));
    assert!(point_approx_eq(world, back));
}

#[test]
fn screen_dist_to_world_divides_by_zoom() {
    let cam = Camera { pan_x: 5.0, pan_y: 5.0, zoom: 4.0 };
    assert!(approx_eq(cam.screen_dist_to_world(20.0), 5.0));
}

#[test]
fn anchored_keeps_world_point_under_screen_point() {
    let world = Point::new(130.0, 570.0);
    let screen = Point::new(200.0, 100.0);
    let cam = Camera::anchored(world, screen, 2.5);
    assert!(point_approx_eq(cam.world_to_screen(world), screen));
}

// --- ImageFit ---

#[test]
fn contain_letterboxes_wide_viewport() {
    let fit = square_fit();
    assert_eq!(fit.rect, Rect::new(100.0, 0.0, 600.0, 600.0));
}

#[test]
fn contain_pillarboxes_tall_viewport() {
    let fit = ImageFit::contain(Size::new(200.0, 100.0), Size::new(400.0, 800.0));
    assert_eq!(fit.rect, Rect::new(0.0, 300.0, 400.0, 200.0));
    assert!(approx_eq(fit.pixels_per_logical(), 2.0));
}

#[test]
fn contain_with_unusable_logical_size_falls_back() {
    let fit = ImageFit::contain(Size::new(0.0, 100.0), Size::new(800.0, 600.0));
    assert_eq!(fit, ImageFit::fallback(Size::new(800.0, 600.0)));
}

#[test]
fn fallback_covers_viewport_one_to_one() {
    let fit = ImageFit::fallback(Size::new(320.0, 240.0));
    assert_eq!(fit.rect, Rect::new(0.0, 0.0, 320.0, 240.0));
    assert_eq!(fit.logical, Size::new(320.0, 240.0));
    assert!(approx_eq(fit.pixels_per_logical(), 1.0));
}

#[test]
fn fallback_with_zero_viewport_is_still_invertible() {
    let fit = ImageFit::fallback(Size::new(0.0, 0.0));
    let p = Point::new(0.5, 0.25);
    assert!(point_approx_eq(fit.fitted_to_logical(fit.logical_to_fitted(p)), p));
}

// --- y-axis inversion ---

#[test]
fn logical_origin_is_bottom_left_of_image() {
    let fit = square_fit();
    let px = to_viewport(Point::new(0.0, 0.0), &fit, &Camera::default());
    assert!(point_approx_eq(px, Point::new(100.0, 600.0)));
}

#[test]
fn logical_top_right_is_pixel_top_right_of_image() {
    let fit = square_fit();
    let px = to_viewport(Point::new(100.0, 100.0), &fit, &Camera::default());
    assert!(point_approx_eq(px, Point::new(700.0, 0.0)));
}

#[test]
fn increasing_logical_y_moves_up_on_screen() {
    let fit = square_fit();
    let cam = Camera { pan_x: -30.0, pan_y: 12.0, zoom: 1.7 };
    let low = to_viewport(Point::new(50.0, 10.0), &fit, &cam);
    let high = to_viewport(Point::new(50.0, 90.0), &fit, &cam);
    assert!(high.y < low.y);
    assert!(approx_eq(high.x, low.x));
}

#[test]
fn pixel_near_top_maps_to_high_logical_y() {
    let fit = square_fit();
    let logical = to_logical(Point::new(400.0, 60.0), &fit, &Camera::default());
    assert!(point_approx_eq(logical, Point::new(50.0, 90.0)));
}

// --- to_viewport / to_logical ---

#[test]
fn to_viewport_applies_zoom_after_fit() {
    let fit = square_fit();
    let cam = Camera { pan_x: 10.0, pan_y: 20.0, zoom: 2.0 };
    // fitted (130, 570) -> screen (270, 1160)
    let px = to_viewport(Point::new(5.0, 5.0), &fit, &cam);
    assert!(point_approx_eq(px, Point::new(270.0, 1160.0)));
}

#[test]
fn screen_dist_to_logical_accounts_for_fit_and_zoom() {
    let fit = square_fit();
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 2.0 };
    // 6 px per logical unit at zoom 1, 12 at zoom 2.
    assert!(approx_eq(screen_dist_to_logical(12.0, &fit, &cam), 1.0));
}

#[test]
fn round_trip_random_points_and_views() {
    let mut rng = rand::rng();
    for _ in 0..500 {
        let logical = Size::new(rng.random_range(1.0..5000.0), rng.random_range(1.0..5000.0));
        let viewport = Size::new(rng.random_range(100.0..3000.0), rng.random_range(100.0..3000.0));
        let fit = ImageFit::contain(logical, viewport);
        let cam = Camera {
            pan_x: rng.random_range(-2000.0..2000.0),
            pan_y: rng.random_range(-2000.0..2000.0),
            zoom: rng.random_range(0.5..12.0),
        };
        let p = Point::new(rng.random_range(-100.0..logical.width + 100.0), rng.random_range(-100.0..logical.height + 100.0));
        let back = to_logical(to_viewport(p, &fit, &cam), &fit, &cam);
        assert!((back.x - p.x).abs() < 1e-6, "x drifted: {p:?} -> {back:?}");
        assert!((back.y - p.y).abs() < 1e-6, "y drifted: {p:?} -> {back:?}");
    }
}
