//! Coordinate spaces and the transforms between them.
//!
//! Three spaces are involved:
//!
//! - **Logical**: resolution-independent coordinates stored against the base
//!   image. Origin bottom-left, y grows upward. This is what gets persisted.
//! - **Fitted**: CSS pixels at scale 1, after the base image has been placed in
//!   the viewport with "contain" semantics. Origin top-left, y grows downward.
//! - **Viewport**: on-screen CSS pixels after the current pan/zoom.
//!
//! [`ImageFit`] maps logical <-> fitted, [`Camera`] maps fitted <-> viewport,
//! and [`to_viewport`] / [`to_logical`] compose the two.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

/// A point in logical, fitted, or viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Linear interpolation; `t = 0` yields `self`, `t = 1` yields `other`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

/// Width and height, in whichever space the owner says.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle; `x`/`y` is the top-left corner in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Placement of the base image inside the viewport.
///
/// `logical` is the extent of logical space covered by the image, `rect` is
/// where that extent lands in fitted pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFit {
    pub logical: Size,
    pub rect: Rect,
}

impl ImageFit {
    /// Fit `logical` into `viewport` preserving aspect ratio, centered.
    ///
    /// Falls back to [`ImageFit::fallback`] when either size is unusable.
    #[must_use]
    pub fn contain(logical: Size, viewport: Size) -> Self {
        if !logical.is_usable() || !viewport.is_usable() {
            return Self::fallback(viewport);
        }
        let ratio = (viewport.width / logical.width).min(viewport.height / logical.height);
        let width = logical.width * ratio;
        let height = logical.height * ratio;
        Self {
            logical,
            rect: Rect::new((viewport.width - width) * 0.5, (viewport.height - height) * 0.5, width, height),
        }
    }

    /// A viewport-sized empty canvas, one logical unit per pixel.
    ///
    /// Used when the base image is missing so that previously captured
    /// geometry stays inspectable.
    #[must_use]
    pub fn fallback(viewport: Size) -> Self {
        let size = if viewport.is_usable() { viewport } else { Size::new(1.0, 1.0) };
        Self { logical: size, rect: Rect::new(0.0, 0.0, size.width, size.height) }
    }

    /// Fitted pixels per logical unit along x.
    #[must_use]
    pub fn pixels_per_logical(&self) -> f64 {
        self.rect.width / self.logical.width
    }

    /// Map a logical point to fitted pixel space, inverting the y axis.
    #[must_use]
    pub fn logical_to_fitted(&self, p: Point) -> Point {
        Point {
            x: self.rect.x + p.x / self.logical.width * self.rect.width,
            y: self.rect.y + (1.0 - p.y / self.logical.height) * self.rect.height,
        }
    }

    /// Map a fitted pixel point back to logical space.
    #[must_use]
    pub fn fitted_to_logical(&self, p: Point) -> Point {
        Point {
            x: (p.x - self.rect.x) / self.rect.width * self.logical.width,
            y: (1.0 - (p.y - self.rect.y) / self.rect.height) * self.logical.height,
        }
    }
}

/// Camera state for pan/zoom over the fitted image.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is a scale factor (1.0 = image exactly fits).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a viewport point (CSS pixels) to fitted space.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a fitted-space point to viewport coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to fitted-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Pan that keeps `world` under `screen` at `zoom`.
    #[must_use]
    pub fn anchored(world: Point, screen: Point, zoom: f64) -> Self {
        Self { pan_x: screen.x - world.x * zoom, pan_y: screen.y - world.y * zoom, zoom }
    }
}

/// Logical point to viewport pixels under the current fit and camera.
#[must_use]
pub fn to_viewport(logical: Point, fit: &ImageFit, camera: &Camera) -> Point {
    camera.world_to_screen(fit.logical_to_fitted(logical))
}

/// Viewport pixels to a logical point; exact inverse of [`to_viewport`].
#[must_use]
pub fn to_logical(pixel: Point, fit: &ImageFit, camera: &Camera) -> Point {
    fit.fitted_to_logical(camera.screen_to_world(pixel))
}

/// Convert a screen-space length to logical units under the current fit and camera.
#[must_use]
pub fn screen_dist_to_logical(screen_dist: f64, fit: &ImageFit, camera: &Camera) -> f64 {
    camera.screen_dist_to_world(screen_dist) / fit.pixels_per_logical()
}
