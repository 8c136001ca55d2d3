//! Declarative map shapes for the quest direction screen.
//!
//! Every shape is a pure function of the quest (and, for the destination
//! marker, the destination index). [`MapShapes`] memoizes them against the
//! session's quest revision so the map SDK only receives new sources when
//! their inputs actually change.

use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::model::{Quest, Waypoint};
use crate::pulse::PulseFrame;

/// Sprite used for the start/end markers.
pub const EXTREMITY_ICON: &str = "pin-custom";

/// Walking line color.
pub const WALK_LINE_COLOR: &str = "#22c55e";

// ============================================================================
// GeoJSON-like types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// `[lng, lat, altitude]`
    Point { coordinates: [f64; 3] },
    /// `[lng, lat]` pairs
    LineString { coordinates: Vec<[f64; 2]> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(properties: Map<String, Value>, geometry: Geometry) -> Self {
        Self {
            kind: "Feature",
            properties,
            geometry,
        }
    }

    fn point(waypoint: &Waypoint, properties: Map<String, Value>) -> Self {
        let [lng, lat] = waypoint.geopoint().lng_lat();
        Self::new(
            properties,
            Geometry::Point {
                coordinates: [lng, lat, 0.0],
            },
        )
    }

    /// A string property, if present.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn base_properties(waypoint: &Waypoint) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("_id".to_string(), json!(waypoint.id()));
    if let Some(title) = waypoint.title() {
        properties.insert("title".to_string(), json!(title));
    }
    properties
}

// ============================================================================
// Shape derivations
// ============================================================================

/// Start and end markers: first and last waypoint tagged `start`/`end`.
pub fn start_end_shape(quest: Option<&Quest>) -> FeatureCollection {
    let (Some(start), Some(end)) = (
        quest.and_then(Quest::start),
        quest.and_then(Quest::end),
    ) else {
        return FeatureCollection::empty();
    };

    let marker = |waypoint: &Waypoint, kind: &str| {
        let mut properties = base_properties(waypoint);
        properties.insert("type".to_string(), json!(kind));
        properties.insert("icon".to_string(), json!(EXTREMITY_ICON));
        Feature::point(waypoint, properties)
    };

    FeatureCollection::new(vec![marker(start, "start"), marker(end, "end")])
}

/// Place-type waypoints with their category color and a 1-based index
/// among places for on-map numbering. Bare points are skipped.
pub fn places_shape(quest: Option<&Quest>) -> FeatureCollection {
    let Some(quest) = quest else {
        return FeatureCollection::empty();
    };

    let features = quest
        .waypoints
        .iter()
        .filter(|w| w.is_place())
        .enumerate()
        .map(|(i, waypoint)| {
            let mut properties = base_properties(waypoint);
            if let Some(category) = waypoint.primary_category() {
                if let Some(color) = &category.color {
                    properties.insert("color".to_string(), json!(color));
                }
                if let Some(icon) = &category.icon {
                    properties.insert("icon".to_string(), json!(icon));
                }
            }
            properties.insert("index".to_string(), json!(i + 1));
            Feature::point(waypoint, properties)
        })
        .collect();

    FeatureCollection::new(features)
}

/// Line through every waypoint in path order.
pub fn walk_line_shape(quest: Option<&Quest>) -> Feature {
    let coordinates = quest
        .map(|q| q.points().iter().map(|p| p.lng_lat()).collect())
        .unwrap_or_default();
    Feature::new(Map::new(), Geometry::LineString { coordinates })
}

/// Marker for the current destination, empty when there is none.
pub fn destination_shape(quest: Option<&Quest>, destination: Option<usize>) -> FeatureCollection {
    let Some(waypoint) = quest.zip(destination).and_then(|(q, i)| q.waypoints.get(i)) else {
        return FeatureCollection::empty();
    };
    let mut properties = base_properties(waypoint);
    properties.insert("type".to_string(), json!("destination"));
    FeatureCollection::new(vec![Feature::point(waypoint, properties)])
}

// ============================================================================
// Memoized holder
// ============================================================================

/// Shapes derived from the session, recomputed only when their inputs change.
#[derive(Debug, Clone)]
pub struct MapShapes {
    quest_revision: Option<u64>,
    destination_key: Option<(u64, Option<usize>)>,
    start_end: FeatureCollection,
    places: FeatureCollection,
    walk_line: Feature,
    destination: FeatureCollection,
    recomputations: u32,
}

impl MapShapes {
    pub fn new() -> Self {
        Self {
            quest_revision: None,
            destination_key: None,
            start_end: FeatureCollection::empty(),
            places: FeatureCollection::empty(),
            walk_line: walk_line_shape(None),
            destination: FeatureCollection::empty(),
            recomputations: 0,
        }
    }

    /// Bring the shapes up to date. Returns true if anything was recomputed.
    pub fn update(
        &mut self,
        revision: u64,
        quest: Option<&Quest>,
        destination: Option<usize>,
    ) -> bool {
        let mut changed = false;

        if self.quest_revision != Some(revision) {
            self.start_end = start_end_shape(quest);
            self.places = places_shape(quest);
            self.walk_line = walk_line_shape(quest);
            self.quest_revision = Some(revision);
            self.recomputations += 1;
            changed = true;
            debug!(
                "[MapShapes] Recomputed quest shapes for revision {} ({} places)",
                revision,
                self.places.len()
            );
        }

        let key = (revision, destination);
        if self.destination_key != Some(key) {
            self.destination = destination_shape(quest, destination);
            self.destination_key = Some(key);
            changed = true;
        }

        changed
    }

    pub fn start_end(&self) -> &FeatureCollection {
        &self.start_end
    }

    pub fn places(&self) -> &FeatureCollection {
        &self.places
    }

    pub fn walk_line(&self) -> &Feature {
        &self.walk_line
    }

    pub fn destination(&self) -> &FeatureCollection {
        &self.destination
    }

    /// Number of times the quest shapes were rebuilt.
    pub fn recomputations(&self) -> u32 {
        self.recomputations
    }

    /// All sources keyed by their source id, for the FFI.
    pub fn to_json(&self) -> String {
        json!({
            "extremities": self.start_end,
            "places": self.places,
            "walk-line": self.walk_line,
            "destination": self.destination,
        })
        .to_string()
    }
}

impl Default for MapShapes {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Layer styles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleLayerStyle {
    pub circle_color: Value,
    pub circle_radius: f64,
    pub circle_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolLayerStyle {
    pub icon_image: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<Value>,
    pub icon_size: f64,
    pub icon_opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_offset: Option<[f64; 2]>,
    pub icon_allow_overlap: bool,
    pub icon_ignore_placement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineLayerStyle {
    pub line_join: String,
    pub line_opacity: f64,
    pub visibility: String,
    pub line_color: String,
    pub line_width: f64,
    pub line_dasharray: [f64; 2],
    pub line_cap: String,
}

/// Styles for the four map layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyles {
    pub places_circle: CircleLayerStyle,
    pub places_symbol: SymbolLayerStyle,
    pub extremities_symbol: SymbolLayerStyle,
    pub walk_line: LineLayerStyle,
}

impl Default for LayerStyles {
    fn default() -> Self {
        Self {
            places_circle: CircleLayerStyle {
                circle_color: json!(["get", "color"]),
                circle_radius: 12.0,
                circle_opacity: 1.0,
            },
            places_symbol: SymbolLayerStyle {
                icon_image: json!(["get", "icon"]),
                icon_color: None,
                icon_size: 0.6,
                icon_opacity: 1.0,
                icon_offset: None,
                icon_allow_overlap: true,
                icon_ignore_placement: true,
            },
            extremities_symbol: SymbolLayerStyle {
                icon_image: json!(["get", "icon"]),
                icon_color: Some(json!(["get", "color"])),
                icon_size: 0.1,
                icon_opacity: 1.0,
                icon_offset: Some([0.0, -300.0]),
                icon_allow_overlap: true,
                icon_ignore_placement: true,
            },
            walk_line: LineLayerStyle {
                line_join: "bevel".to_string(),
                line_opacity: 0.7,
                visibility: "visible".to_string(),
                line_color: WALK_LINE_COLOR.to_string(),
                line_width: 3.0,
                line_dasharray: [1.0, 1.0],
                line_cap: "square".to_string(),
            },
        }
    }
}

impl LayerStyles {
    /// Apply a pulse frame to the place circles.
    pub fn with_pulse(mut self, frame: PulseFrame) -> Self {
        self.places_circle.circle_radius = frame.radius;
        self.places_circle.circle_opacity = frame.opacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEST_JSON: &str = include_str!("../tests/fixtures/quest_asakusa.json");

    fn fixture() -> Quest {
        serde_json::from_str(QUEST_JSON).unwrap()
    }

    #[test]
    fn test_start_end_shape() {
        let quest = fixture();
        let shape = start_end_shape(Some(&quest));
        assert_eq!(shape.len(), 2);
        assert_eq!(shape.features[0].property_str("type"), Some("start"));
        assert_eq!(shape.features[0].property_str("_id"), Some("place-inoko"));
        assert_eq!(shape.features[1].property_str("type"), Some("end"));
        assert_eq!(shape.features[1].property_str("_id"), Some("place-kappabashi"));
        assert_eq!(shape.features[1].property_str("icon"), Some(EXTREMITY_ICON));
        assert_eq!(
            shape.features[0].geometry,
            Geometry::Point {
                coordinates: [139.7953, 35.7119, 0.0]
            }
        );

        assert!(start_end_shape(None).is_empty());
    }

    #[test]
    fn test_places_shape_skips_points_and_numbers_from_one() {
        let quest = fixture();
        let shape = places_shape(Some(&quest));
        assert_eq!(shape.len(), 3);

        let ids: Vec<_> = shape.features.iter().map(|f| f.property_str("_id").unwrap()).collect();
        assert_eq!(ids, vec!["place-inoko", "place-sensoji", "place-kappabashi"]);

        let indexes: Vec<_> = shape
            .features
            .iter()
            .map(|f| f.properties["index"].as_u64().unwrap())
            .collect();
        assert_eq!(indexes, vec![1, 2, 3]);

        assert_eq!(shape.features[0].property_str("color"), Some("#f97316"));
        assert_eq!(shape.features[1].property_str("icon"), Some("temple"));
    }

    #[test]
    fn test_walk_line_passes_every_waypoint_in_order() {
        let quest = fixture();
        let line = walk_line_shape(Some(&quest));
        match &line.geometry {
            Geometry::LineString { coordinates } => {
                assert_eq!(coordinates.len(), 4);
                assert_eq!(coordinates[2], [139.7982, 35.7106]);
            }
            other => panic!("unexpected geometry {:?}", other),
        }

        match walk_line_shape(None).geometry {
            Geometry::LineString { coordinates } => assert!(coordinates.is_empty()),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_geojson_serialization() {
        let quest = fixture();
        let json = serde_json::to_value(start_end_shape(Some(&quest))).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");

        let json = serde_json::to_value(walk_line_shape(Some(&quest))).unwrap();
        assert_eq!(json["geometry"]["type"], "LineString");
    }

    #[test]
    fn test_memoization() {
        let quest = fixture();
        let mut shapes = MapShapes::new();

        assert!(shapes.update(1, Some(&quest), Some(0)));
        assert_eq!(shapes.recomputations(), 1);
        assert_eq!(shapes.places().len(), 3);
        assert_eq!(shapes.destination().features[0].property_str("_id"), Some("place-inoko"));

        // Same inputs: nothing recomputed
        assert!(!shapes.update(1, Some(&quest), Some(0)));
        assert_eq!(shapes.recomputations(), 1);

        // Destination change leaves quest shapes alone
        assert!(shapes.update(1, Some(&quest), Some(1)));
        assert_eq!(shapes.recomputations(), 1);
        assert_eq!(shapes.destination().features[0].property_str("_id"), Some("place-sensoji"));

        // New revision rebuilds
        assert!(shapes.update(2, Some(&quest), Some(1)));
        assert_eq!(shapes.recomputations(), 2);
    }

    #[test]
    fn test_shapes_json_keys() {
        let quest = fixture();
        let mut shapes = MapShapes::new();
        shapes.update(1, Some(&quest), None);
        let value: Value = serde_json::from_str(&shapes.to_json()).unwrap();
        assert!(value.get("extremities").is_some());
        assert!(value.get("walk-line").is_some());
        assert_eq!(value["destination"]["features"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_layer_styles() {
        let styles = LayerStyles::default();
        assert_eq!(styles.walk_line.line_color, WALK_LINE_COLOR);

        let pulsed = styles.with_pulse(PulseFrame {
            radius: 22.5,
            opacity: 0.75,
        });
        assert_eq!(pulsed.places_circle.circle_radius, 22.5);

        let json = serde_json::to_value(&pulsed).unwrap();
        assert_eq!(json["walkLine"]["lineDasharray"], json!([1.0, 1.0]));
        assert_eq!(json["extremitiesSymbol"]["iconOffset"], json!([0.0, -300.0]));
        assert!(json["placesSymbol"].get("iconColor").is_none());
    }
}
