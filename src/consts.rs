//! Shared numeric constants for the map engine.

// ── Viewport ────────────────────────────────────────────────────

/// Scale at which the base image exactly fits the viewport ("contain").
pub const MIN_SCALE: f64 = 1.0;

/// Upper zoom bound on phones.
pub const MAX_SCALE_MOBILE: f64 = 12.0;

/// Upper zoom bound on tablets.
pub const MAX_SCALE_TABLET: f64 = 10.0;

/// Upper zoom bound on desktop screens.
pub const MAX_SCALE_DESKTOP: f64 = 8.0;

/// Multiplicative zoom step applied per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// How far (in screen pixels) an image edge may be dragged into view.
pub const PAN_MARGIN_PX: f64 = 40.0;

/// Duration of wheel and cluster-expansion transitions.
pub const ANIMATION_MS: f64 = 180.0;

/// Viewport widths below this are treated as phones.
pub const MOBILE_MAX_WIDTH_PX: f64 = 640.0;

/// Viewport widths below this (and at least [`MOBILE_MAX_WIDTH_PX`]) are tablets.
pub const TABLET_MAX_WIDTH_PX: f64 = 1024.0;

/// Pointer travel (screen pixels) below which a press counts as a click.
pub const CLICK_SLOP_PX: f64 = 4.0;

// ── Markers / clustering ────────────────────────────────────────

/// Marker divisor on phones; bigger divisor, smaller pins.
pub const MARKER_DIVISOR_MOBILE: f64 = 3.0;

/// Marker divisor on tablets.
pub const MARKER_DIVISOR_TABLET: f64 = 3.8;

/// Marker divisor on desktop screens.
pub const MARKER_DIVISOR_DESKTOP: f64 = 4.6;

/// Extra zoom applied on top of the exact declustering zoom so that members
/// end up strictly apart rather than touching.
pub const DECLUSTER_HEADROOM: f64 = 1.05;

// ── Polygon editing ─────────────────────────────────────────────

/// Screen-space radius around the first vertex that closes a polygon.
pub const CLOSE_HIT_RADIUS_PX: f64 = 10.0;

/// Screen-space radius for grabbing a vertex of a finished polygon.
pub const VERTEX_HIT_RADIUS_PX: f64 = 8.0;

/// Polygons with an absolute shoelace area below this are degenerate.
pub const MIN_POLYGON_AREA: f64 = 1e-9;

/// Minimum vertex count for a closable polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Default depth of the undo stack.
pub const HISTORY_LIMIT: usize = 100;
