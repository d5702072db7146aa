//! Pan/zoom controller for the map surface.
//!
//! `ViewportController` owns the camera, the viewport size, and the base
//! image fit. It runs a small gesture state machine:
//!
//! ```text
//! Idle ──drag──▶ Panning ──release──▶ Idle
//! Idle ──two fingers──▶ PinchZooming ──lift──▶ Idle
//! Idle ──wheel / expand cluster──▶ AnimatingTo ──tick…──▶ Idle
//!                                       └──cancel──▶ Idle (pre-animation camera)
//! ```
//!
//! Every camera it commits is clamped: zoom stays within the device's scale
//! bounds and pan keeps the image within reach. At minimum scale the image is
//! centered and dragging is disabled.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use crate::camera::{Camera, ImageFit, Point, Size};
use crate::config::{DeviceClass, MapConfig};

const ZOOM_EPSILON: f64 = 1e-9;

/// An eased camera transition.
///
/// The fitted-space `anchor` slides linearly on screen from where `from`
/// shows it to where `to` shows it, while zoom interpolates alongside. A
/// zoom-to-cursor transition therefore keeps the cursor's content fixed on
/// every frame, not just the last one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub from: Camera,
    pub to: Camera,
    pub anchor: Point,
    pub elapsed_ms: f64,
    pub duration_ms: f64,
}

impl Animation {
    /// Camera at eased progress `e` in `[0, 1]`.
    #[must_use]
    pub fn camera_at(&self, e: f64) -> Camera {
        let zoom = self.from.zoom + (self.to.zoom - self.from.zoom) * e;
        let start = self.from.world_to_screen(self.anchor);
        let end = self.to.world_to_screen(self.anchor);
        Camera::anchored(self.anchor, start.lerp(end, e), zoom)
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration_ms <= 0.0 { 1.0 } else { (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0) }
    }
}

/// Gesture state of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ViewportState {
    #[default]
    Idle,
    Panning {
        /// Screen position of the previous drag event.
        last_screen: Point,
    },
    PinchZooming {
        /// Midpoint of the two touches at the previous event.
        last_mid: Point,
        /// Distance between the two touches at the previous event.
        last_distance: f64,
    },
    AnimatingTo(Animation),
}

/// Pan/zoom state for one map surface.
#[derive(Debug, Clone)]
pub struct ViewportController {
    camera: Camera,
    size: Size,
    fit: ImageFit,
    image: Option<Size>,
    device: DeviceClass,
    state: ViewportState,
    min_scale: f64,
    max_scale: f64,
    marker_constant: f64,
    config: MapConfig,
}

impl ViewportController {
    /// A controller for a 1x1 viewport; call [`resize`](Self::resize) once the host knows its size.
    #[must_use]
    pub fn new(config: &MapConfig) -> Self {
        let size = Size::new(1.0, 1.0);
        let device = DeviceClass::from_width(size.width);
        let profile = config.profile(device);
        Self {
            camera: Camera { pan_x: 0.0, pan_y: 0.0, zoom: profile.min_scale },
            size,
            fit: ImageFit::fallback(size),
            image: None,
            device,
            state: ViewportState::Idle,
            min_scale: profile.min_scale,
            max_scale: profile.max_scale,
            marker_constant: 1.0 / profile.marker_divisor,
            config: config.clone(),
        }
    }

    // --- Layout ---

    /// Container resized: re-derive device limits, refit the image, reset the view.
    pub fn resize(&mut self, width: f64, height: f64) {
        let size = Size::new(sanitize_extent(width), sanitize_extent(height));
        self.size = size;
        self.device = DeviceClass::from_width(size.width);
        let profile = self.config.profile(self.device);
        self.min_scale = profile.min_scale;
        self.max_scale = profile.max_scale;
        self.marker_constant = 1.0 / profile.marker_divisor;
        self.refit();
        tracing::debug!(width = size.width, height = size.height, device = ?self.device, "viewport resized");
    }

    /// Base image loaded with the given logical extent.
    pub fn set_image(&mut self, logical: Size) {
        self.image = Some(logical);
        self.refit();
    }

    /// Base image failed to load: fall back to a viewport-sized empty canvas.
    pub fn image_failed(&mut self) {
        self.image = None;
        self.refit();
    }

    fn refit(&mut self) {
        self.fit = match self.image {
            Some(logical) => ImageFit::contain(logical, self.size),
            None => ImageFit::fallback(self.size),
        };
        self.state = ViewportState::Idle;
        self.camera = self.clamp(Camera { pan_x: 0.0, pan_y: 0.0, zoom: self.min_scale });
    }

    // --- Queries ---

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn fit(&self) -> ImageFit {
        self.fit
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn state(&self) -> ViewportState {
        self.state
    }

    #[must_use]
    pub fn device(&self) -> DeviceClass {
        self.device
    }

    /// Whether the base image is in place (as opposed to the fallback canvas).
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// `(min, max)` zoom for the current device.
    #[must_use]
    pub fn scale_bounds(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, ViewportState::AnimatingTo(_))
    }

    /// Device-dependent factor relating zoom to marker render scale.
    #[must_use]
    pub fn marker_constant(&self) -> f64 {
        self.marker_constant
    }

    /// Visual scale applied to each marker so it keeps a constant screen footprint.
    #[must_use]
    pub fn marker_scale(&self) -> f64 {
        self.marker_constant / self.camera.zoom
    }

    /// Where a running animation will land, or the current camera.
    #[must_use]
    pub fn target_camera(&self) -> Camera {
        match self.state {
            ViewportState::AnimatingTo(anim) => anim.to,
            _ => self.camera,
        }
    }

    #[must_use]
    pub fn viewport_center(&self) -> Point {
        Point::new(self.size.width * 0.5, self.size.height * 0.5)
    }

    // --- Wheel ---

    /// Zoom one notch about `cursor`. Returns whether anything changed.
    ///
    /// Negative `dy` zooms in. The fitted point under the cursor before the
    /// zoom stays under it afterwards (unless pan clamping has to move it).
    /// During a drag or pinch the zoom applies at once and the gesture carries on.
    pub fn on_wheel(&mut self, cursor: Point, dy: f64) -> bool {
        if dy == 0.0 || !dy.is_finite() || !cursor.x.is_finite() || !cursor.y.is_finite() {
            return false;
        }
        self.finish_animation();
        let in_gesture = matches!(self.state, ViewportState::Panning { .. } | ViewportState::PinchZooming { .. });
        let step = if dy < 0.0 { self.config.wheel_zoom_factor } else { self.config.wheel_zoom_factor.recip() };
        let zoom = self.clamp_zoom(self.camera.zoom * step);
        if (zoom - self.camera.zoom).abs() < ZOOM_EPSILON {
            return false;
        }
        let anchor = self.camera.screen_to_world(cursor);
        let target = self.clamp(Camera::anchored(anchor, cursor, zoom));
        if in_gesture {
            self.camera = target;
        } else {
            self.start_animation(target, anchor);
        }
        true
    }

    // --- Drag ---

    /// Start a drag-pan at `screen`.
    pub fn begin_pan(&mut self, screen: Point) {
        self.finish_animation();
        self.state = ViewportState::Panning { last_screen: screen };
        tracing::debug!("viewport panning");
    }

    /// Continue a drag-pan. No-op at minimum scale or outside a pan.
    pub fn pan_to(&mut self, screen: Point) -> bool {
        let ViewportState::Panning { last_screen } = self.state else {
            return false;
        };
        self.state = ViewportState::Panning { last_screen: screen };
        if self.at_min_scale() {
            return false;
        }
        let moved = Camera {
            pan_x: self.camera.pan_x + (screen.x - last_screen.x),
            pan_y: self.camera.pan_y + (screen.y - last_screen.y),
            zoom: self.camera.zoom,
        };
        let next = self.clamp(moved);
        let changed = next != self.camera;
        self.camera = next;
        changed
    }

    pub fn end_pan(&mut self) {
        if matches!(self.state, ViewportState::Panning { .. }) {
            self.state = ViewportState::Idle;
        }
    }

    // --- Pinch ---

    /// Two touches went down.
    pub fn begin_pinch(&mut self, a: Point, b: Point) {
        self.finish_animation();
        self.state = ViewportState::PinchZooming { last_mid: a.midpoint(b), last_distance: a.distance(b) };
        tracing::debug!("viewport pinch zooming");
    }

    /// Two touches moved: zoom by the distance ratio about the midpoint, and
    /// follow the midpoint's own travel.
    pub fn pinch_to(&mut self, a: Point, b: Point) -> bool {
        let ViewportState::PinchZooming { last_mid, last_distance } = self.state else {
            return false;
        };
        let mid = a.midpoint(b);
        let distance = a.distance(b);
        self.state = ViewportState::PinchZooming { last_mid: mid, last_distance: distance };
        if last_distance <= f64::EPSILON || !distance.is_finite() {
            return false;
        }
        let zoom = self.clamp_zoom(self.camera.zoom * (distance / last_distance));
        let anchor = self.camera.screen_to_world(last_mid);
        let next = self.clamp(Camera::anchored(anchor, mid, zoom));
        let changed = next != self.camera;
        self.camera = next;
        changed
    }

    pub fn end_pinch(&mut self) {
        if matches!(self.state, ViewportState::PinchZooming { .. }) {
            self.state = ViewportState::Idle;
        }
    }

    // --- Animation ---

    /// Animate so that fitted point `world` ends up centered at `zoom`.
    pub fn zoom_to(&mut self, world: Point, zoom: f64) {
        self.finish_animation();
        let target = self.clamp(Camera::anchored(world, self.viewport_center(), self.clamp_zoom(zoom)));
        self.start_animation(target, world);
    }

    fn start_animation(&mut self, to: Camera, anchor: Point) {
        if self.config.animation_ms <= 0.0 {
            self.camera = to;
            self.state = ViewportState::Idle;
            return;
        }
        self.state = ViewportState::AnimatingTo(Animation {
            from: self.camera,
            to,
            anchor,
            elapsed_ms: 0.0,
            duration_ms: self.config.animation_ms,
        });
        tracing::debug!(from = self.camera.zoom, to = to.zoom, "viewport animating");
    }

    /// Advance a running animation. Returns whether the camera moved.
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        let ViewportState::AnimatingTo(mut anim) = self.state else {
            return false;
        };
        anim.elapsed_ms += dt_ms.max(0.0);
        let t = anim.progress();
        if t >= 1.0 {
            self.camera = anim.to;
            self.state = ViewportState::Idle;
        } else {
            self.camera = anim.camera_at(ease_out_cubic(t));
            self.state = ViewportState::AnimatingTo(anim);
        }
        true
    }

    /// Jump to the end of a running animation.
    pub fn finish_animation(&mut self) {
        if let ViewportState::AnimatingTo(anim) = self.state {
            self.camera = anim.to;
            self.state = ViewportState::Idle;
        }
    }

    /// Abort a running animation and restore the pre-animation camera.
    pub fn cancel_animation(&mut self) -> bool {
        let ViewportState::AnimatingTo(anim) = self.state else {
            return false;
        };
        self.camera = anim.from;
        self.state = ViewportState::Idle;
        tracing::debug!("viewport animation cancelled");
        true
    }

    // --- Clamping ---

    /// Replace the camera (e.g. restoring a saved view), clamped to bounds.
    pub fn set_camera(&mut self, camera: Camera) {
        self.state = ViewportState::Idle;
        self.camera = self.clamp(camera);
    }

    fn at_min_scale(&self) -> bool {
        self.camera.zoom <= self.min_scale + ZOOM_EPSILON
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_finite() { zoom.max(self.min_scale).min(self.max_scale) } else { self.min_scale }
    }

    /// Clamp zoom to bounds and pan to the reachable range for that zoom.
    #[must_use]
    pub fn clamp(&self, camera: Camera) -> Camera {
        let zoom = self.clamp_zoom(camera.zoom);
        let rect = self.fit.rect;
        let center_x = self.size.width * 0.5 - (rect.x + rect.width * 0.5) * zoom;
        let center_y = self.size.height * 0.5 - (rect.y + rect.height * 0.5) * zoom;
        if zoom <= self.min_scale + ZOOM_EPSILON {
            return Camera { pan_x: center_x, pan_y: center_y, zoom };
        }
        let margin = self.config.pan_margin_px;
        let pan_x = clamp_axis(camera.pan_x, center_x, rect.x * zoom, rect.right() * zoom, self.size.width, margin);
        let pan_y = clamp_axis(camera.pan_y, center_y, rect.y * zoom, rect.bottom() * zoom, self.size.height, margin);
        Camera { pan_x, pan_y, zoom }
    }
}

/// Clamp one pan component.
///
/// When the scaled image is larger than the viewport less its margins, the
/// image's near edge may not pass `margin` and its far edge may not pass
/// `view - margin`. When it is smaller, the same two limits keep it inside the
/// inset viewport instead.
fn clamp_axis(pan: f64, centered: f64, near: f64, far: f64, view: f64, margin: f64) -> f64 {
    if !pan.is_finite() {
        return centered;
    }
    let near_limit = margin - near;
    let far_limit = view - margin - far;
    let (lo, hi) = if far_limit <= near_limit { (far_limit, near_limit) } else { (near_limit, far_limit) };
    pan.clamp(lo, hi)
}

fn sanitize_extent(v: f64) -> f64 {
    if v.is_finite() && v >= 1.0 { v } else { 1.0 }
}

/// Cubic ease-out on `[0, 1]`.
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}
