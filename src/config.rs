//! Configuration for the content backend, the map SDK and the quest runtime.
//!
//! All settings are explicit values handed to the component that needs them.
//! In particular the map SDK access token lives in [`MapConfig`] instead of a
//! process-wide global.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{QuestError, Result};

/// Connection settings for the headless content backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ContentConfig {
    /// Project identifier (first label of the API host).
    pub project_id: String,

    /// Dataset name. Default: "production"
    pub dataset: String,

    /// Dated API version, without the leading "v". Default: "2021-10-21"
    pub api_version: String,

    /// Query the edge cache instead of the live API. Default: false
    pub use_cdn: bool,

    /// Optional read token sent as a bearer token.
    pub token: Option<String>,

    /// Request timeout in seconds. Default: 30
    pub timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            use_cdn: false,
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ContentConfig {
    /// Create a config for the given project with default settings.
    pub fn for_project(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            ..Self::default()
        }
    }

    /// Read settings from `SANITY_PROJECT_ID`, `SANITY_DATASET`,
    /// `SANITY_API_VERSION`, `SANITY_USE_CDN` and `SANITY_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let project_id = env::var("SANITY_PROJECT_ID").map_err(|_| QuestError::Config {
            message: "SANITY_PROJECT_ID is not set".to_string(),
        })?;
        let defaults = Self::default();
        let config = Self {
            project_id,
            dataset: env::var("SANITY_DATASET").unwrap_or(defaults.dataset),
            api_version: env::var("SANITY_API_VERSION").unwrap_or(defaults.api_version),
            use_cdn: env::var("SANITY_USE_CDN")
                .ok()
                .and_then(|s| s.parse::<bool>().ok())
                .unwrap_or(defaults.use_cdn),
            token: env::var("SANITY_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs: defaults.timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings can form a valid API URL.
    pub fn validate(&self) -> Result<()> {
        let valid_label = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if !valid_label(&self.project_id) {
            return Err(QuestError::Config {
                message: format!("invalid project id '{}'", self.project_id),
            });
        }
        if !valid_label(&self.dataset) {
            return Err(QuestError::Config {
                message: format!("invalid dataset '{}'", self.dataset),
            });
        }
        if self.api_version.is_empty() {
            return Err(QuestError::Config {
                message: "api version must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Query endpoint URL for this project and dataset.
    pub fn query_url(&self) -> String {
        let host = if self.use_cdn {
            "apicdn.sanity.io"
        } else {
            "api.sanity.io"
        };
        format!(
            "https://{}.{}/v{}/data/query/{}",
            self.project_id, host, self.api_version, self.dataset
        )
    }
}

/// Map SDK settings, passed to the rendering collaborator at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MapConfig {
    /// Map SDK access token.
    pub access_token: String,

    /// Style URL for the map view.
    pub style_url: String,

    /// Maximum zoom level. Default: 20
    pub max_zoom_level: f64,

    /// Minimum zoom level. Default: 1
    pub min_zoom_level: f64,

    /// Padding in pixels when fitting the camera to the quest zone. Default: 30
    pub fit_padding: u32,

    /// Camera animation duration in milliseconds. Default: 1000
    pub animation_duration_ms: u32,

    /// Delay between camera readiness and the initial fit, in milliseconds. Default: 500
    pub initial_fit_delay_ms: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            style_url: "mapbox://styles/mapbox/streets-v12".to_string(),
            max_zoom_level: 20.0,
            min_zoom_level: 1.0,
            fit_padding: 30,
            animation_duration_ms: 1000,
            initial_fit_delay_ms: 500,
        }
    }
}

impl MapConfig {
    /// Read the access token from `MAPBOX_ACCESS_TOKEN` and an optional
    /// style from `MAPBOX_STYLE_URL`.
    pub fn from_env() -> Result<Self> {
        let access_token = env::var("MAPBOX_ACCESS_TOKEN").map_err(|_| QuestError::Config {
            message: "MAPBOX_ACCESS_TOKEN is not set".to_string(),
        })?;
        let defaults = Self::default();
        Ok(Self {
            access_token,
            style_url: env::var("MAPBOX_STYLE_URL").unwrap_or(defaults.style_url),
            ..defaults
        })
    }
}

/// Pulsing "choose a place" marker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PulseConfig {
    /// Circle radius at the start of each cycle. Default: 15.0
    pub base_radius: f64,
    /// Circle radius at the end of each cycle. Default: 30.0
    pub peak_radius: f64,
    /// Circle opacity at the start of each cycle. Default: 1.0
    pub base_opacity: f64,
    /// Circle opacity at the end of each cycle. Default: 0.5
    pub peak_opacity: f64,
    /// Length of one cycle in milliseconds. Default: 1000
    pub period_ms: u32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            base_radius: 15.0,
            peak_radius: 30.0,
            base_opacity: 1.0,
            peak_opacity: 0.5,
            period_ms: 1000,
        }
    }
}

/// Quest runtime tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct QuestConfig {
    /// Margin added on every side of the waypoint bounds for the zone check,
    /// in degrees. Default: 0.004 (~440m)
    pub area_margin_degrees: f64,

    /// Distance to the current destination that counts as arrival, in meters.
    /// Default: 30.0 (GPS variance in dense streets)
    pub arrival_radius_meters: f64,

    /// Advance to the next waypoint automatically on arrival. Default: true
    pub auto_advance: bool,

    /// How far from a waypoint a map press may land and still select it,
    /// in meters. Default: 25.0
    pub tap_tolerance_meters: f64,

    /// Leave `Loading` for `Browsing` once the quest is loaded if location
    /// permission was denied. Default: true
    pub browse_without_location: bool,

    /// Pulsing marker shown while choosing a starting place.
    pub pulse: PulseConfig,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            area_margin_degrees: 0.004,
            arrival_radius_meters: 30.0,
            auto_advance: true,
            tap_tolerance_meters: 25.0,
            browse_without_location: true,
            pulse: PulseConfig::default(),
        }
    }
}
