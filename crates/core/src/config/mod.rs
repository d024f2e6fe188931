use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    render::{ColorScheme, CoordinateMode},
    Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sync: SyncPolicy,
    pub render: RenderConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Drift correction policy for linear synced playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Largest tolerated gap, in seconds, between the attempt position and
    /// the matched segment start when a new segment is entered.
    pub drift_threshold_secs: f64,
    /// Re-anchor the attempt stream on the first segment resolved after
    /// synced playback starts or after a seek, regardless of drift.
    pub anchor_on_first_resolution: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            drift_threshold_secs: 0.1,
            anchor_on_first_resolution: true,
        }
    }
}

/// Skeleton overlay appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub coordinates: CoordinateMode,
    /// Hide facial landmarks, keeping one head marker.
    pub simplified: bool,
    pub joint_radius: f32,
    pub line_width: f32,
    pub reference: ColorScheme,
    pub attempt: ColorScheme,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            coordinates: CoordinateMode::default(),
            simplified: false,
            joint_radius: 4.0,
            line_width: 3.0,
            reference: ColorScheme::reference(),
            attempt: ColorScheme::attempt(),
        }
    }
}

/// Cadence of the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub refresh_hz: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { refresh_hz: 60 }
    }
}

impl PlaybackConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }
}
