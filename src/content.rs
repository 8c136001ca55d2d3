//! Content backend queries.
//!
//! Queries are GROQ strings with `$param` placeholders; identifiers are
//! always sent as parameters, never spliced into the query text. The HTTP
//! transport lives in [`crate::http`]; this module only knows the query
//! shapes, the response envelope and the [`ContentSource`] seam the quest
//! loader depends on.

use std::future::Future;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ContentConfig;
use crate::error::{OptionExt, QuestError, Result};
use crate::model::{ImageRef, Quest};

/// One quest with waypoints, their categories and content image assets
/// expanded inline.
pub const QUEST_BY_ID_QUERY: &str = "*[_type == 'quest' && _id == $id]{\
    ...,\
    waypoints[]->{..., categories[]->},\
    content[]{..., asset->{..., \"_key\": _id}}\
}[0]";

/// All places with their categories, for the map screen.
pub const PLACES_QUERY: &str =
    "*[_type == 'place']{_id, _type, title, geopoint, picture, shortDescription, categories[]->}";

/// All categories.
pub const CATEGORIES_QUERY: &str = "*[_type == 'category']{...}";

/// Quest summaries for the quest menu; waypoints are expanded so the list can
/// show a start location.
pub const QUESTS_QUERY: &str =
    "*[_type == 'quest']{_id, title, subtitle, area, picture, waypoints[]->{_id, _type, title, geopoint}}";

/// Response envelope of the query endpoint.
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: Option<T>,
}

/// Decode a query response body. A `null` result is `Ok(None)`.
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<Option<T>> {
    let response: QueryResponse<T> = serde_json::from_str(body)?;
    Ok(response.result)
}

/// Something that can answer quest lookups.
///
/// The HTTP client implements this; tests and hosts with their own transport
/// provide their own.
pub trait ContentSource {
    /// Fetch a quest with references expanded. `Ok(None)` when no quest has
    /// this id.
    fn fetch_quest_by_id(
        &self,
        quest_id: &str,
    ) -> impl Future<Output = Result<Option<Quest>>> + Send;
}

/// Load a quest for the direction screen.
///
/// Single fetch, no retry. Fails with `NotFound` for an unknown id, passes
/// transport errors through, and rejects quests without waypoints.
pub async fn load_quest<S: ContentSource>(source: &S, quest_id: &str) -> Result<Quest> {
    debug!("[QuestLoader] Loading quest {}", quest_id);

    let quest = match source.fetch_quest_by_id(quest_id).await {
        Ok(quest) => quest.ok_or_not_found(quest_id)?,
        Err(e) => {
            warn!("[QuestLoader] Fetch failed for {}: {}", quest_id, e);
            return Err(e);
        }
    };

    quest.validate()?;
    info!(
        "[QuestLoader] Loaded quest {} ({} waypoints)",
        quest.id,
        quest.waypoints.len()
    );
    Ok(quest)
}

/// Build a CDN URL for an image field.
///
/// Expanded assets carry their URL; unresolved references are decoded from
/// the `image-<id>-<w>x<h>-<format>` id scheme. `width` adds a resize hint.
pub fn image_url(image: &ImageRef, config: &ContentConfig, width: Option<u32>) -> Option<String> {
    let asset = image.asset.as_ref()?;

    let base = match &asset.url {
        Some(url) => url.clone(),
        None => {
            let asset_id = asset.asset_id()?;
            let rest = asset_id.strip_prefix("image-")?;
            let (name, format) = rest.rsplit_once('-')?;
            format!(
                "https://cdn.sanity.io/images/{}/{}/{}.{}",
                config.project_id, config.dataset, name, format
            )
        }
    };

    Some(match width {
        Some(w) => format!("{}?w={}", base, w),
        None => base,
    })
}

/// Turn a transport status into the matching error.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn status_error(status: u16, body: &str) -> QuestError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("description").or(Some(e)))
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
        })
        .unwrap_or_else(|| format!("HTTP {}", status));
    QuestError::Network {
        message,
        status_code: Some(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetRef, Category};

    const QUEST_JSON: &str = include_str!("../tests/fixtures/quest_asakusa.json");

    struct FixedSource {
        response: Result<Option<Quest>>,
    }

    impl ContentSource for FixedSource {
        async fn fetch_quest_by_id(&self, _quest_id: &str) -> Result<Option<Quest>> {
            self.response.clone()
        }
    }

    fn fixture() -> Quest {
        serde_json::from_str(QUEST_JSON).unwrap()
    }

    #[test]
    fn test_quest_query_uses_parameter() {
        assert!(QUEST_BY_ID_QUERY.contains("_id == $id"));
        assert!(QUEST_BY_ID_QUERY.contains("waypoints[]->"));
        assert!(QUEST_BY_ID_QUERY.contains("categories[]->"));
        assert!(QUEST_BY_ID_QUERY.ends_with("[0]"));
    }

    #[test]
    fn test_decode_response() {
        let body = format!(r#"{{"ms": 12, "query": "...", "result": {}}}"#, QUEST_JSON);
        let quest: Option<Quest> = decode_response(&body).unwrap();
        assert_eq!(quest.unwrap().id, "quest-asakusa");

        let none: Option<Quest> = decode_response(r#"{"ms": 3, "result": null}"#).unwrap();
        assert!(none.is_none());

        let categories: Option<Vec<Category>> = decode_response(
            r##"{"result": [{"_id": "cat-ramen", "title": "Ramen", "color": "#f97316"}]}"##,
        )
        .unwrap();
        assert_eq!(categories.unwrap()[0].title, "Ramen");

        let err = decode_response::<Quest>("<html>").unwrap_err();
        assert!(matches!(err, QuestError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_load_quest_found() {
        let source = FixedSource {
            response: Ok(Some(fixture())),
        };
        let quest = load_quest(&source, "quest-asakusa").await.unwrap();
        assert_eq!(quest.waypoints.len(), 4);
    }

    #[tokio::test]
    async fn test_load_quest_not_found() {
        let source = FixedSource { response: Ok(None) };
        let err = load_quest(&source, "missing").await.unwrap_err();
        assert_eq!(
            err,
            QuestError::NotFound {
                quest_id: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_load_quest_network_error() {
        let source = FixedSource {
            response: Err(QuestError::Network {
                message: "timed out".to_string(),
                status_code: None,
            }),
        };
        let err = load_quest(&source, "quest-asakusa").await.unwrap_err();
        assert!(matches!(err, QuestError::Network { .. }));
    }

    #[tokio::test]
    async fn test_load_quest_without_waypoints() {
        let mut quest = fixture();
        quest.waypoints.clear();
        let source = FixedSource {
            response: Ok(Some(quest)),
        };
        let err = load_quest(&source, "quest-asakusa").await.unwrap_err();
        assert!(matches!(err, QuestError::InvalidQuest { .. }));
    }

    #[test]
    fn test_image_url_from_reference() {
        let config = ContentConfig::for_project("fsashav3");
        let quest = fixture();
        let url = image_url(quest.picture.as_ref().unwrap(), &config, None).unwrap();
        assert_eq!(
            url,
            "https://cdn.sanity.io/images/fsashav3/production/Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000.jpg"
        );

        let resized = image_url(quest.picture.as_ref().unwrap(), &config, Some(400)).unwrap();
        assert!(resized.ends_with(".jpg?w=400"));
    }

    #[test]
    fn test_image_url_prefers_expanded_url() {
        let config = ContentConfig::for_project("fsashav3");
        let image = ImageRef {
            asset: Some(AssetRef {
                reference: None,
                id: Some("image-abc-1x1-png".to_string()),
                url: Some("https://cdn.example/abc.png".to_string()),
            }),
        };
        assert_eq!(
            image_url(&image, &config, None).as_deref(),
            Some("https://cdn.example/abc.png")
        );
        assert!(image_url(&ImageRef::default(), &config, None).is_none());
    }

    #[test]
    fn test_status_error() {
        let err = status_error(
            400,
            r#"{"error": {"description": "param $id referenced, but not provided"}}"#,
        );
        assert_eq!(
            err,
            QuestError::Network {
                message: "param $id referenced, but not provided".to_string(),
                status_code: Some(400),
            }
        );
        let err = status_error(503, "");
        assert_eq!(err.to_string(), "Network error (503): HTTP 503");
    }
}
