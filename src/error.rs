//! Boundary errors.
//!
//! The interaction core itself never fails: malformed geometry is ignored and
//! out-of-range viewport state is clamped. Errors only arise where the engine
//! meets the outside world (environment configuration, JSON snapshots handed
//! over by the data layer, and asset loading reported by the host).

/// Errors produced at the edges of the map engine.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A configuration value is well-formed but inconsistent with the others.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A snapshot payload from the data layer could not be decoded.
    #[error("snapshot decode failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The base image for the map could not be loaded.
    #[error("base image unavailable: {0}")]
    ImageUnavailable(String),
}

impl MapError {
    /// Stable machine-readable code for hosts that surface errors to users.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "E_INVALID_CONFIG",
            Self::Snapshot(_) => "E_SNAPSHOT_DECODE",
            Self::ImageUnavailable(_) => "E_IMAGE_UNAVAILABLE",
        }
    }

    /// Whether the host can retry or keep going after this error.
    #[must_use]
    pub fn recoverable(&self) -> bool {
        matches!(self, Self::ImageUnavailable(_))
    }
}
