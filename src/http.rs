//! HTTP client for the content backend.
//!
//! This module provides:
//! - Connection pooling through a shared `reqwest::Client`
//! - GROQ queries with JSON-encoded `$param` values
//! - Catalog fetching (places and categories) in parallel
//!
//! There is no retry policy: a failed quest fetch leaves the screen in its
//! loading state and the user backs out.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ContentConfig;
use crate::content::{
    decode_response, status_error, ContentSource, CATEGORIES_QUERY, PLACES_QUERY, QUESTS_QUERY,
    QUEST_BY_ID_QUERY,
};
use crate::error::{QuestError, Result};
use crate::model::{Category, Place, Quest};

/// Content backend client.
#[derive(Debug, Clone)]
pub struct ContentClient {
    client: Client,
    config: ContentConfig,
}

impl ContentClient {
    /// Create a client for the configured project.
    pub fn new(config: ContentConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuestError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Build the request URL for a query and its parameters.
    ///
    /// Parameter values are JSON-encoded and keyed `$name`, as the query
    /// endpoint expects.
    pub fn query_url(&self, query: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.config.query_url()).map_err(|e| QuestError::Config {
            message: format!("invalid query URL: {}", e),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                let encoded = serde_json::to_string(value)?;
                pairs.append_pair(&format!("${}", name), &encoded);
            }
        }
        Ok(url)
    }

    /// Run a query and decode its `result`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = self.query_url(query, params)?;
        let start = Instant::now();

        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!("[ContentClient] Request error: {}", e);
            QuestError::Network {
                message: e.to_string(),
                status_code: e.status().map(|s| s.as_u16()),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| QuestError::Network {
            message: format!("Failed to read body: {}", e),
            status_code: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            warn!("[ContentClient] HTTP {} for query", status);
            return Err(status_error(status.as_u16(), &body));
        }

        debug!(
            "[ContentClient] Query returned {} bytes in {:?}",
            body.len(),
            start.elapsed()
        );
        decode_response(&body)
    }

    /// All places with categories expanded.
    pub async fn fetch_places(&self) -> Result<Vec<Place>> {
        Ok(self.query(PLACES_QUERY, &[]).await?.unwrap_or_default())
    }

    /// All categories.
    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        Ok(self.query(CATEGORIES_QUERY, &[]).await?.unwrap_or_default())
    }

    /// Quest summaries for the quest menu.
    pub async fn fetch_quests(&self) -> Result<Vec<Quest>> {
        Ok(self.query(QUESTS_QUERY, &[]).await?.unwrap_or_default())
    }

    /// Places and categories together, as the map screen needs them.
    pub async fn fetch_catalog(&self) -> Result<(Vec<Place>, Vec<Category>)> {
        let start = Instant::now();
        let (places, categories) =
            futures::try_join!(self.fetch_places(), self.fetch_categories())?;
        info!(
            "[ContentClient] Catalog: {} places, {} categories in {:?}",
            places.len(),
            categories.len(),
            start.elapsed()
        );
        Ok((places, categories))
    }
}

impl ContentSource for ContentClient {
    async fn fetch_quest_by_id(&self, quest_id: &str) -> Result<Option<Quest>> {
        self.query(QUEST_BY_ID_QUERY, &[("id", quest_id)]).await
    }
}

/// Synchronous wrapper for FFI - runs the async load on a tokio runtime.
#[cfg(feature = "ffi")]
pub fn load_quest_sync(config: ContentConfig, quest_id: &str) -> Result<Quest> {
    use tokio::runtime::Runtime;

    let rt = Runtime::new().map_err(|e| QuestError::Internal {
        message: format!("Runtime error: {}", e),
    })?;
    let client = ContentClient::new(config)?;
    rt.block_on(crate::content::load_quest(&client, quest_id))
}
