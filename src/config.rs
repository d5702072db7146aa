//! Engine tunables and their environment-variable overrides.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    ANIMATION_MS, CLOSE_HIT_RADIUS_PX, DECLUSTER_HEADROOM, MARKER_DIVISOR_DESKTOP, MARKER_DIVISOR_MOBILE,
    MARKER_DIVISOR_TABLET, MAX_SCALE_DESKTOP, MAX_SCALE_MOBILE, MAX_SCALE_TABLET, MIN_SCALE, MOBILE_MAX_WIDTH_PX,
    PAN_MARGIN_PX, TABLET_MAX_WIDTH_PX, VERTEX_HIT_RADIUS_PX, WHEEL_ZOOM_FACTOR,
};
use crate::error::MapError;

/// Coarse screen-size bucket; picks zoom limits and marker sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    /// Classify a viewport by its CSS pixel width.
    #[must_use]
    pub fn from_width(width_px: f64) -> Self {
        if width_px < MOBILE_MAX_WIDTH_PX {
            Self::Mobile
        } else if width_px < TABLET_MAX_WIDTH_PX {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }
}

/// Per-device-class limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Smallest allowed viewport scale (the image exactly fits at 1).
    pub min_scale: f64,
    /// Largest allowed viewport scale.
    pub max_scale: f64,
    /// Divisor turning a marker's nominal size into its on-screen size.
    pub marker_divisor: f64,
}

/// All tunables of the map engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Multiplicative zoom step per wheel notch; must exceed 1.
    pub wheel_zoom_factor: f64,
    /// Screen pixels an image edge may be dragged into view.
    pub pan_margin_px: f64,
    /// Screen-space radius around vertex 0 that closes a polygon.
    pub close_hit_radius_px: f64,
    /// Screen-space radius for grabbing a finished polygon's vertex.
    pub vertex_hit_radius_px: f64,
    /// Length of eased viewport transitions.
    pub animation_ms: f64,
    /// Extra zoom over the exact declustering level.
    pub decluster_headroom: f64,
    pub mobile: DeviceProfile,
    pub tablet: DeviceProfile,
    pub desktop: DeviceProfile,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            wheel_zoom_factor: WHEEL_ZOOM_FACTOR,
            pan_margin_px: PAN_MARGIN_PX,
            close_hit_radius_px: CLOSE_HIT_RADIUS_PX,
            vertex_hit_radius_px: VERTEX_HIT_RADIUS_PX,
            animation_ms: ANIMATION_MS,
            decluster_headroom: DECLUSTER_HEADROOM,
            mobile: DeviceProfile {
                min_scale: MIN_SCALE,
                max_scale: MAX_SCALE_MOBILE,
                marker_divisor: MARKER_DIVISOR_MOBILE,
            },
            tablet: DeviceProfile {
                min_scale: MIN_SCALE,
                max_scale: MAX_SCALE_TABLET,
                marker_divisor: MARKER_DIVISOR_TABLET,
            },
            desktop: DeviceProfile {
                min_scale: MIN_SCALE,
                max_scale: MAX_SCALE_DESKTOP,
                marker_divisor: MARKER_DIVISOR_DESKTOP,
            },
        }
    }
}

impl MapConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `FIELDMAP_MIN_SCALE`: overrides the min scale of every device class (default 1.0)
    /// - `FIELDMAP_MAX_SCALE`: overrides the max scale of every device class
    /// - `FIELDMAP_WHEEL_ZOOM_FACTOR`: default 1.1
    /// - `FIELDMAP_PAN_MARGIN_PX`: default 40
    /// - `FIELDMAP_CLOSE_HIT_RADIUS_PX`: default 10
    /// - `FIELDMAP_VERTEX_HIT_RADIUS_PX`: default 8
    /// - `FIELDMAP_ANIMATION_MS`: default 180
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConfig`] when the resulting values are inconsistent.
    pub fn from_env() -> Result<Self, MapError> {
        let defaults = Self::default();
        let mut cfg = Self {
            wheel_zoom_factor: env_parse_f64("FIELDMAP_WHEEL_ZOOM_FACTOR", defaults.wheel_zoom_factor),
            pan_margin_px: env_parse_f64("FIELDMAP_PAN_MARGIN_PX", defaults.pan_margin_px),
            close_hit_radius_px: env_parse_f64("FIELDMAP_CLOSE_HIT_RADIUS_PX", defaults.close_hit_radius_px),
            vertex_hit_radius_px: env_parse_f64("FIELDMAP_VERTEX_HIT_RADIUS_PX", defaults.vertex_hit_radius_px),
            animation_ms: env_parse_f64("FIELDMAP_ANIMATION_MS", defaults.animation_ms),
            ..defaults
        };
        let min_scale = env_override_f64("FIELDMAP_MIN_SCALE");
        let max_scale = env_override_f64("FIELDMAP_MAX_SCALE");
        for profile in [&mut cfg.mobile, &mut cfg.tablet, &mut cfg.desktop] {
            profile.min_scale = min_scale.unwrap_or(profile.min_scale);
            profile.max_scale = max_scale.unwrap_or(profile.max_scale);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the tunables are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConfig`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), MapError> {
        for (name, profile) in [("mobile", self.mobile), ("tablet", self.tablet), ("desktop", self.desktop)] {
            if !positive(profile.min_scale) || !positive(profile.max_scale) {
                return Err(MapError::InvalidConfig(format!(
                    "{name} scale bounds must be positive, got {}..{}",
                    profile.min_scale, profile.max_scale
                )));
            }
            if profile.max_scale < profile.min_scale {
                return Err(MapError::InvalidConfig(format!(
                    "{name} max_scale {} is below min_scale {}",
                    profile.max_scale, profile.min_scale
                )));
            }
            if !positive(profile.marker_divisor) {
                return Err(MapError::InvalidConfig(format!("{name} marker_divisor must be positive")));
            }
        }
        if !positive(self.wheel_zoom_factor - 1.0) {
            return Err(MapError::InvalidConfig(format!(
                "wheel_zoom_factor must exceed 1, got {}",
                self.wheel_zoom_factor
            )));
        }
        if !positive(self.close_hit_radius_px) || !positive(self.vertex_hit_radius_px) {
            return Err(MapError::InvalidConfig("hit radii must be positive".into()));
        }
        if !non_negative(self.pan_margin_px) || !non_negative(self.animation_ms) {
            return Err(MapError::InvalidConfig("pan margin and animation length must not be negative".into()));
        }
        if !non_negative(self.decluster_headroom - 1.0) {
            return Err(MapError::InvalidConfig(format!(
                "decluster_headroom must be at least 1, got {}",
                self.decluster_headroom
            )));
        }
        Ok(())
    }

    /// Limits for the given device class.
    #[must_use]
    pub fn profile(&self, device: DeviceClass) -> DeviceProfile {
        match device {
            DeviceClass::Mobile => self.mobile,
            DeviceClass::Tablet => self.tablet,
            DeviceClass::Desktop => self.desktop,
        }
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn env_parse_f64(key: &str, default: f64) -> f64 {
    env_override_f64(key).unwrap_or(default)
}

/// A well-formed override, if the variable is set. Malformed values are logged and skipped.
fn env_override_f64(key: &str) -> Option<f64> {
    let Ok(raw) = std::env::var(key) else {
        return None;
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!(%key, value = %raw, "ignoring malformed config value");
            None
        }
    }
}
