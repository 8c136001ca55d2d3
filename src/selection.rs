//! Callout and bottom sheet presentation.
//!
//! At most one overlay is visible at a time. Holding both in a single enum
//! makes the mutual exclusion structural: opening one replaces the other.

use serde::Serialize;

use crate::model::Waypoint;
use crate::GeoPoint;

/// Label of the bottom sheet's confirm action.
pub const START_FROM_HERE_LABEL: &str = "Let's start from here";

/// Marker callout anchor, as a fraction of the callout's size.
pub const CALLOUT_ANCHOR: (f64, f64) = (0.5, 1.65);

/// Small popup anchored to a tapped marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CalloutView {
    pub waypoint_id: String,
    pub title: String,
    pub coordinate: GeoPoint,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

impl CalloutView {
    pub fn for_waypoint(waypoint: &Waypoint) -> Self {
        Self {
            waypoint_id: waypoint.id().to_string(),
            title: waypoint.title().unwrap_or_default().to_string(),
            coordinate: waypoint.geopoint(),
            anchor_x: CALLOUT_ANCHOR.0,
            anchor_y: CALLOUT_ANCHOR.1,
        }
    }
}

/// Panel offering to start the quest from a chosen waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct BottomSheetView {
    pub waypoint_id: String,
    /// Position of the waypoint in the quest path.
    pub waypoint_index: u32,
    pub title: String,
    pub short_description: Option<String>,
    pub categories: Vec<String>,
    pub action_label: String,
}

impl BottomSheetView {
    pub fn for_waypoint(index: usize, waypoint: &Waypoint) -> Self {
        let categories = waypoint
            .as_place()
            .map(|p| p.categories.iter().map(|c| c.title.clone()).collect())
            .unwrap_or_default();

        Self {
            waypoint_id: waypoint.id().to_string(),
            waypoint_index: index as u32,
            title: waypoint.title().unwrap_or_default().to_string(),
            short_description: waypoint.short_description().map(str::to_string),
            categories,
            action_label: START_FROM_HERE_LABEL.to_string(),
        }
    }
}

/// The overlay currently shown over the map.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", content = "view", rename_all = "snake_case")]
pub enum Presentation {
    #[default]
    None,
    Callout(CalloutView),
    BottomSheet(BottomSheetView),
}

impl Presentation {
    pub fn callout(&self) -> Option<&CalloutView> {
        match self {
            Presentation::Callout(view) => Some(view),
            _ => None,
        }
    }

    pub fn bottom_sheet(&self) -> Option<&BottomSheetView> {
        match self {
            Presentation::BottomSheet(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_bottom_sheet_open(&self) -> bool {
        self.bottom_sheet().is_some()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Presentation::None)
    }
}
