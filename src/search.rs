//! Web search used to find pages about a city's food

use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::SearchConfig;
use crate::http;
use crate::{PalatePilotError, Result};

/// Text query in, ordered result URLs out
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: Option<String>,
}

/// Google results through SerpAPI
pub struct SerpApiSearch {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl SerpApiSearch {
    /// A missing API key is not an error here; every search then fails
    /// with a configuration error that callers treat like any other miss.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        if config.api_key.is_none() {
            warn!("No SerpAPI key configured, web search is disabled");
        }
        let timeout = Duration::from_secs(config.fetch_timeout_seconds.into());

        Ok(Self {
            client: http::build_retrying_client(timeout, 1)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PalatePilotError::config("SerpAPI key missing. Set search.api_key or SERPAPI_API_KEY")
        })?;
        let url = format!(
            "{}/search.json?engine=google&q={}&num={}&api_key={}",
            self.base_url,
            urlencoding::encode(query),
            limit,
            urlencoding::encode(api_key)
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: SerpApiResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(PalatePilotError::service(format!("SerpAPI: {error}")));
        }

        let links: Vec<String> = body
            .organic_results
            .into_iter()
            .filter_map(|result| result.link)
            .take(limit)
            .collect();

        debug!("Search for '{}' returned {} links", query, links.len());
        Ok(links)
    }
}
