//! Replay configuration
//!
//! Every constant the reconciler needs is carried here and passed in at
//! construction; nothing is read from globals.

use std::path::Path;

use roadplay_core::{Category, EntityId, RoadplayError, RoadplayResult};
use roadplay_motion::KinematicConfig;
use serde::{Deserialize, Serialize};

/// How the viewport scroll delta is derived each tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMode {
    /// `-scale * dt`, independent of the traffic
    Constant,
    /// `-scale * v_ref * dt`, following the reference entity
    ReferenceVelocity,
}

/// What happens to render handles when an init event replaces the model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Release every handle, then create one per entity of the new model
    Recreate,
    /// Keep handles of entities present in both models
    Retain,
}

/// Frame clock settings for the viewport
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Frames per second requested from the tick driver
    pub fps: u32,
    /// Largest frame delta in seconds taken as real progress. Anything
    /// longer is a clock glitch and advances nothing.
    pub max_frame_delta: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            fps: 50,
            max_frame_delta: 10.0,
        }
    }
}

/// Reconciler configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Model units to viewport units
    pub scale: f64,
    /// Added to every scaled position
    pub frame_offset: f64,
    /// Entity whose frame positions are rendered in
    pub reference_entity: EntityId,
    pub scroll_mode: ScrollMode,
    /// Pair categories fed to the motion model
    pub categories: Vec<Category>,
    pub init_policy: InitPolicy,
    /// Fail the tick on an event older than its predecessor instead of
    /// logging. The offending event stays at the head of the queue and the
    /// failed tick neither advances nor scrolls, so every later tick fails
    /// the same way. Meant for tests.
    pub strict_ordering: bool,
    /// Let the model skip fine-grained internal stepping
    pub fast_mode: bool,
    /// Seed speed for the kinematic model
    pub initial_speed: f64,
    pub viewport: ViewportConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            scale: 0.05,
            frame_offset: 0.5,
            reference_entity: EntityId::new("B"),
            scroll_mode: ScrollMode::Constant,
            categories: vec![Category::new(Category::NTG), Category::new(Category::TTC)],
            init_policy: InitPolicy::Recreate,
            strict_ordering: false,
            fast_mode: true,
            initial_speed: 1.0,
            viewport: ViewportConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Configuration for tests: ordering violations fail the tick
    pub fn strict() -> Self {
        ReplayConfig {
            strict_ordering: true,
            ..ReplayConfig::default()
        }
    }

    /// Parse and validate a JSON configuration; absent fields take defaults
    pub fn from_json_str(text: &str) -> RoadplayResult<Self> {
        let config: ReplayConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RoadplayResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> RoadplayResult<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(RoadplayError::Config(format!("scale must be positive, got {}", self.scale)));
        }
        if !self.frame_offset.is_finite() {
            return Err(RoadplayError::Config("frame_offset must be finite".to_string()));
        }
        if self.categories.is_empty() {
            return Err(RoadplayError::Config("at least one category is required".to_string()));
        }
        if !(self.initial_speed.is_finite() && self.initial_speed >= 0.0) {
            return Err(RoadplayError::Config(format!(
                "initial_speed must be non-negative, got {}",
                self.initial_speed
            )));
        }
        if self.viewport.fps == 0 {
            return Err(RoadplayError::Config("viewport.fps must be positive".to_string()));
        }
        if !(self.viewport.max_frame_delta.is_finite() && self.viewport.max_frame_delta > 0.0) {
            return Err(RoadplayError::Config(format!(
                "viewport.max_frame_delta must be positive, got {}",
                self.viewport.max_frame_delta
            )));
        }
        Ok(())
    }

    /// Kinematic model settings derived from this configuration
    pub fn kinematic(&self) -> KinematicConfig {
        KinematicConfig {
            initial_speed: self.initial_speed,
            fast_mode: self.fast_mode,
            ..KinematicConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ReplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reference_entity, EntityId::new("B"));
        assert_eq!(config.viewport.fps, 50);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = ReplayConfig::from_json_str(
            r#"{ "scale": 0.1, "scroll_mode": "reference_velocity", "viewport": { "fps": 30 } }"#,
        )
        .unwrap();

        assert_eq!(config.scale, 0.1);
        assert_eq!(config.scroll_mode, ScrollMode::ReferenceVelocity);
        assert_eq!(config.viewport.fps, 30);
        assert_eq!(config.viewport.max_frame_delta, 10.0);
        assert_eq!(config.init_policy, InitPolicy::Recreate);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            ReplayConfig::from_json_str(r#"{ "scale": -1.0 }"#),
            Err(RoadplayError::Config(_))
        ));
        assert!(matches!(
            ReplayConfig::from_json_str(r#"{ "categories": [] }"#),
            Err(RoadplayError::Config(_))
        ));
        assert!(matches!(
            ReplayConfig::from_json_str(r#"{ "viewport": { "max_frame_delta": 0.0 } }"#),
            Err(RoadplayError::Config(_))
        ));
        assert!(matches!(
            ReplayConfig::from_json_str("not json"),
            Err(RoadplayError::Json(_))
        ));
    }

    #[test]
    fn test_kinematic_follows_config() {
        let config = ReplayConfig {
            fast_mode: false,
            initial_speed: 2.0,
            ..ReplayConfig::default()
        };
        let kinematic = config.kinematic();
        assert!(!kinematic.fast_mode);
        assert_eq!(kinematic.initial_speed, 2.0);
    }
}
