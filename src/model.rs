//! Content records as returned by the content backend.
//!
//! Field names follow the backend's documents (`_id`, `_type`,
//! `shortDescription`, ...) so responses decode without an intermediate
//! layer. Dangling references come back as `null` and are dropped while
//! decoding.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{QuestError, Result};
use crate::geo_utils::compute_bounds;
use crate::{Bounds, GeoPoint};

/// Decode an array that may be `null` or contain `null` entries.
fn skip_nulls<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

/// Backend geopoint field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geopoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl Geopoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, alt: None }
    }
}

impl From<Geopoint> for GeoPoint {
    fn from(g: Geopoint) -> Self {
        GeoPoint::new(g.lat, g.lng)
    }
}

/// Reference to an image asset, either unresolved (`_ref`) or expanded
/// (`_id` plus `url`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl AssetRef {
    /// The asset document id, whichever form the reference is in.
    pub fn asset_id(&self) -> Option<&str> {
        self.reference.as_deref().or(self.id.as_deref())
    }
}

/// An image field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// CSS color used for the place circle.
    #[serde(default)]
    pub color: Option<String>,
    /// Sprite name used for the place symbol.
    #[serde(default)]
    pub icon: Option<String>,
}

/// A run of text inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub children: Vec<Span>,
}

impl TextBlock {
    /// Concatenated text of all spans.
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Rich content: text blocks and inline images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum ContentBlock {
    #[serde(rename = "block")]
    Block(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(other)]
    Unknown,
}

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub geopoint: Geopoint,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub picture: Option<ImageRef>,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub categories: Vec<Category>,
    #[serde(rename = "shortDescription", default)]
    pub short_description: Option<String>,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub content: Vec<ContentBlock>,
}

/// A bare location on the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub geopoint: Geopoint,
}

/// A stop on a quest's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Waypoint {
    #[serde(rename = "place")]
    Place(Place),
    #[serde(rename = "point")]
    Point(Point),
}

impl Waypoint {
    pub fn id(&self) -> &str {
        match self {
            Waypoint::Place(p) => &p.id,
            Waypoint::Point(p) => &p.id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Waypoint::Place(p) => Some(p.title.as_str()),
            Waypoint::Point(p) => p.title.as_deref(),
        }
    }

    pub fn geopoint(&self) -> GeoPoint {
        match self {
            Waypoint::Place(p) => p.geopoint.into(),
            Waypoint::Point(p) => p.geopoint.into(),
        }
    }

    pub fn as_place(&self) -> Option<&Place> {
        match self {
            Waypoint::Place(p) => Some(p),
            Waypoint::Point(_) => None,
        }
    }

    pub fn is_place(&self) -> bool {
        self.as_place().is_some()
    }

    /// The first category, which drives pin color and icon.
    pub fn primary_category(&self) -> Option<&Category> {
        self.as_place().and_then(|p| p.categories.first())
    }

    pub fn short_description(&self) -> Option<&str> {
        self.as_place().and_then(|p| p.short_description.as_deref())
    }
}

/// A curated walking tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub picture: Option<ImageRef>,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub waypoints: Vec<Waypoint>,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub content: Vec<ContentBlock>,
}

impl Quest {
    /// Reject quests the runtime cannot walk: no waypoints, or a waypoint
    /// with an out-of-range geopoint.
    pub fn validate(&self) -> Result<()> {
        if self.waypoints.is_empty() {
            return Err(QuestError::InvalidQuest {
                quest_id: self.id.clone(),
                message: "quest has no waypoints".to_string(),
            });
        }
        if let Some(bad) = self.waypoints.iter().find(|w| !w.geopoint().is_valid()) {
            return Err(QuestError::InvalidQuest {
                quest_id: self.id.clone(),
                message: format!("waypoint '{}' has an invalid geopoint", bad.id()),
            });
        }
        Ok(())
    }

    /// Waypoint coordinates in path order.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.waypoints.iter().map(Waypoint::geopoint).collect()
    }

    /// The quest zone before any margin is applied.
    pub fn bounds(&self) -> Bounds {
        compute_bounds(&self.points())
    }

    pub fn start(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn end(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Place-type waypoints in path order.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.waypoints.iter().filter_map(Waypoint::as_place)
    }

    /// Look up a waypoint by id, with its position in the path.
    pub fn waypoint(&self, id: &str) -> Option<(usize, &Waypoint)> {
        self.waypoints.iter().enumerate().find(|(_, w)| w.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEST_JSON: &str = include_str!("../tests/fixtures/quest_asakusa.json");

    #[test]
    fn test_decode_quest_fixture() {
        let quest: Quest = serde_json::from_str(QUEST_JSON).unwrap();
        assert_eq!(quest.id, "quest-asakusa");
        assert_eq!(quest.title, "Asakusa Ramen Walk");
        assert_eq!(quest.waypoints.len(), 4);
        assert!(quest.validate().is_ok());

        assert!(quest.waypoints[0].is_place());
        assert!(!quest.waypoints[2].is_place());
        assert_eq!(quest.places().count(), 3);

        let first = &quest.waypoints[0];
        assert_eq!(first.primary_category().unwrap().color.as_deref(), Some("#f97316"));
        assert_eq!(first.short_description(), Some("Tonkotsu ramen since 1953."));
    }

    #[test]
    fn test_decode_content_blocks() {
        let quest: Quest = serde_json::from_str(QUEST_JSON).unwrap();
        assert_eq!(quest.content.len(), 3);
        match &quest.content[0] {
            ContentBlock::Block(block) => {
                assert_eq!(block.plain_text(), "Four stops around Senso-ji.")
            }
            other => panic!("unexpected block {:?}", other),
        }
        assert!(matches!(quest.content[1], ContentBlock::Image(_)));
        assert_eq!(quest.content[2], ContentBlock::Unknown);
    }

    #[test]
    fn test_dangling_references_are_dropped() {
        let json = r#"{
            "_id": "q",
            "title": "Dangling",
            "waypoints": [
                null,
                {"_type": "point", "_id": "p1", "geopoint": {"lat": 1.0, "lng": 2.0}}
            ]
        }"#;
        let quest: Quest = serde_json::from_str(json).unwrap();
        assert_eq!(quest.waypoints.len(), 1);
        assert_eq!(quest.waypoints[0].geopoint(), GeoPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_validate_rejects_empty_and_invalid() {
        let json = r#"{"_id": "empty", "title": "Empty", "waypoints": null}"#;
        let quest: Quest = serde_json::from_str(json).unwrap();
        assert!(matches!(
            quest.validate(),
            Err(QuestError::InvalidQuest { .. })
        ));

        let json = r#"{"_id": "bad", "waypoints": [
            {"_type": "point", "_id": "p1", "geopoint": {"lat": 95.0, "lng": 2.0}}
        ]}"#;
        let quest: Quest = serde_json::from_str(json).unwrap();
        let err = quest.validate().unwrap_err();
        assert!(err.to_string().contains("p1"));
    }

    #[test]
    fn test_waypoint_lookup_and_bounds() {
        let quest: Quest = serde_json::from_str(QUEST_JSON).unwrap();
        let (index, waypoint) = quest.waypoint("place-kappabashi").unwrap();
        assert_eq!(index, 3);
        assert_eq!(waypoint.title(), Some("Kappabashi Kitchen Street"));
        assert!(quest.waypoint("nope").is_none());

        let bounds = quest.bounds();
        for p in quest.points() {
            assert!(bounds.contains(&p));
        }
        assert_eq!(quest.start().unwrap().id(), "place-inoko");
        assert_eq!(quest.end().unwrap().id(), "place-kappabashi");
    }
}
