use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapter::TrackerParams;
use crate::canvas::Color;
use crate::error::Error;

/// Run configuration. Every field has a default, so a JSON document only
/// needs to name the options it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Centroids kept per track.
    pub trajectory_capacity: usize,

    /// px/s, speeds at or above it are high risk
    pub velocity_threshold: f32,

    pub low_risk_color: Color,
    pub high_risk_color: Color,
    pub untracked_color: Color,
    pub trail_start_color: Color,
    pub trail_end_color: Color,

    /// Draw detections the tracker could not associate with an identity.
    pub include_untracked_detections: bool,

    /// Pairwise proximity check between tracks, in px. `None` disables it.
    pub collision_distance: Option<f32>,

    pub draw_frame_index: bool,
    pub box_thickness: i32,
    pub trail_thickness: i32,
    pub label_scale: f32,

    /// TrueType/OpenType font for labels on in-memory frames. Without it only
    /// backends with built-in fonts draw text.
    pub font_path: Option<PathBuf>,

    /// Frames without a sighting before a track is reported dormant.
    pub dormant_after: usize,

    pub tracker: TrackerParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trajectory_capacity: 30,
            velocity_threshold: 150.0,
            low_risk_color: Color::GREEN,
            high_risk_color: Color::RED,
            untracked_color: Color::GRAY,
            trail_start_color: Color::BLUE,
            trail_end_color: Color::YELLOW,
            include_untracked_detections: false,
            collision_distance: None,
            draw_frame_index: false,
            box_thickness: 2,
            trail_thickness: 2,
            label_scale: 0.5,
            font_path: None,
            dormant_after: 30,
            tracker: TrackerParams::default(),
        }
    }
}

impl Config {
    pub fn from_json(src: &str) -> Result<Self, Error> {
        let cfg: Config = serde_json::from_str(src)?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let cfg: Config = serde_json::from_reader(std::io::BufReader::new(file))?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.trajectory_capacity == 0 {
            return Err(Error::Config("trajectory_capacity must be positive".into()));
        }

        if !(self.velocity_threshold.is_finite() && self.velocity_threshold > 0.0) {
            return Err(Error::Config(format!(
                "velocity_threshold must be a positive number, got {}",
                self.velocity_threshold
            )));
        }

        if self.low_risk_color == self.high_risk_color {
            return Err(Error::Config(
                "low_risk_color and high_risk_color must differ".into(),
            ));
        }

        if let Some(d) = self.collision_distance {
            if !(d.is_finite() && d > 0.0) {
                return Err(Error::Config(format!(
                    "collision_distance must be positive, got {}",
                    d
                )));
            }
        }

        if self.box_thickness < 1 || self.trail_thickness < 1 {
            return Err(Error::Config("line thickness must be at least 1".into()));
        }

        if !(self.label_scale.is_finite() && self.label_scale > 0.0) {
            return Err(Error::Config("label_scale must be positive".into()));
        }

        self.tracker.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::TrackerKind;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = Config::from_json(
            r#"{
                "trajectory_capacity": 10,
                "velocity_threshold": 40.5,
                "include_untracked_detections": true,
                "high_risk_color": {"r": 255, "g": 0, "b": 255},
                "tracker": {"tracker": "bot_sort", "inference_resolution": 640}
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.trajectory_capacity, 10);
        assert_eq!(cfg.velocity_threshold, 40.5);
        assert!(cfg.include_untracked_detections);
        assert_eq!(cfg.high_risk_color, Color::rgb(255, 0, 255));
        assert_eq!(cfg.low_risk_color, Color::GREEN);
        assert_eq!(cfg.tracker.tracker, TrackerKind::BotSort);
        assert_eq!(cfg.tracker.inference_resolution, Some(640));
        assert_eq!(cfg.tracker.confidence, 0.3);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad = [
            r#"{"trajectory_capacity": 0}"#,
            r#"{"velocity_threshold": -1.0}"#,
            r#"{"low_risk_color": {"r": 1, "g": 2, "b": 3}, "high_risk_color": {"r": 1, "g": 2, "b": 3}}"#,
            r#"{"collision_distance": 0.0}"#,
            r#"{"box_thickness": 0}"#,
            r#"{"tracker": {"confidence": 1.5}}"#,
            r#"{"tracker": {"inference_resolution": 0}}"#,
        ];

        for src in bad {
            assert!(
                matches!(Config::from_json(src), Err(Error::Config(_))),
                "accepted {}",
                src
            );
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Config::from_json("{not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/qtrail.json"),
            Err(Error::Io(_))
        ));
    }
}
