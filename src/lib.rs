//! # Quest Direction
//!
//! Quest-direction runtime for a location-based tourism app.
//!
//! This library provides:
//! - Quest zone detection (is the user near the tour?)
//! - Waypoint sequencing with live location tracking
//! - Declarative map shapes and camera commands for the map SDK
//! - A client for the headless content backend
//!
//! ## Features
//!
//! - **`http`** - Enable the HTTP client for the content backend
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use quest_direction::{GeoPoint, QuestConfig, QuestSession, QuestState};
//! use quest_direction::model::{Geopoint, Point, Quest, Waypoint};
//!
//! let quest = Quest {
//!     id: "quest-1".to_string(),
//!     title: "Old town walk".to_string(),
//!     subtitle: None,
//!     area: None,
//!     picture: None,
//!     waypoints: vec![
//!         Waypoint::Point(Point { id: "a".into(), title: None, geopoint: Geopoint::new(10.0, 10.0) }),
//!         Waypoint::Point(Point { id: "b".into(), title: None, geopoint: Geopoint::new(20.0, 20.0) }),
//!     ],
//!     content: vec![],
//! };
//!
//! let mut session = QuestSession::new("quest-1", QuestConfig::default());
//! session.on_quest_loaded(quest).unwrap();
//! session.on_location(GeoPoint::new(15.0, 15.0)).unwrap();
//! assert_eq!(session.state(), QuestState::InAreaPending);
//! ```

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, QuestError, Result};

// Configuration (content backend, map SDK, quest runtime)
pub mod config;
pub use config::{ContentConfig, MapConfig, PulseConfig, QuestConfig};

// Geographic utilities (bounding boxes, distances)
pub mod geo_utils;
pub use geo_utils::{compute_bounds, expand_bounds, haversine_distance, in_bounding_box};

// Content records as returned by the backend
pub mod model;
pub use model::{Category, Quest, Waypoint};

// Query composition and the content source seam
pub mod content;
pub use content::{load_quest, ContentSource};

// HTTP client for the content backend
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::ContentClient;

// Device location stream
pub mod location;
pub use location::{
    watch_location, LocationSource, LocationSubscription, LocationWatcher, PermissionStatus,
    SimulatedLocationSource,
};

// Nearest-waypoint index
pub mod spatial;
pub use spatial::WaypointIndex;

// Pulsing marker animation
pub mod pulse;
pub use pulse::{PulseAnimation, PulseFrame};

// Callout / bottom sheet presentation
pub mod selection;
pub use selection::{BottomSheetView, CalloutView, Presentation};

// Map shapes and layer styles
pub mod shapes;
pub use shapes::{FeatureCollection, LayerStyles, MapShapes};

// Camera commands
pub mod camera;
pub use camera::{CameraCommand, CameraController};

// Deep links to the external maps app
pub mod directions;
pub use directions::DirectionsRequest;

// Quest state machine
pub mod session;
pub use session::{
    start_location_updates, QuestRuntimeState, QuestSession, QuestState, SharedSession, StateChange,
};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("QuestDirectionRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use quest_direction::GeoPoint;
/// let point = GeoPoint::new(35.7148, 139.7967); // Senso-ji
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Both coordinates are finite numbers. Range is not checked: device
    /// fixes are taken as reported.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// `[lng, lat]` pair, the order the map SDK expects.
    pub fn lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub(crate) fn to_coord(self) -> Coord {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// Bounding box over a set of points.
///
/// The all-zero value is the "no waypoints yet" placeholder; see
/// [`Bounds::is_degenerate`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// The `{0,0,0,0}` placeholder used before waypoints resolve.
    pub const ZERO: Bounds = Bounds {
        min_lng: 0.0,
        max_lng: 0.0,
        min_lat: 0.0,
        max_lat: 0.0,
    };

    /// Create bounds from points. Returns `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let line: LineString = points.iter().map(|p| p.to_coord()).collect();
        let rect = line.bounding_rect()?;
        Some(Self {
            min_lng: rect.min().x,
            max_lng: rect.max().x,
            min_lat: rect.min().y,
            max_lat: rect.max().y,
        })
    }

    /// True for the all-zero placeholder, which never triggers the area check.
    pub fn is_degenerate(&self) -> bool {
        *self == Self::ZERO
    }

    /// South-west corner.
    pub fn bottom_left(&self) -> GeoPoint {
        GeoPoint::new(self.min_lat, self.min_lng)
    }

    /// North-east corner.
    pub fn top_right(&self) -> GeoPoint {
        GeoPoint::new(self.max_lat, self.max_lng)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        in_bounding_box(&self.bottom_left(), &self.top_right(), point)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
