//! Dish and restaurant discovery: search the web, scrape the top results

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::Result;
use crate::config::SearchConfig;
use crate::scrape::PageScraper;
use crate::search::SearchProvider;

pub struct FoodDiscovery {
    search: Arc<dyn SearchProvider>,
    scraper: PageScraper,
    results_per_query: usize,
}

impl FoodDiscovery {
    pub fn new(search: Arc<dyn SearchProvider>, config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            search,
            scraper: PageScraper::new(Duration::from_secs(config.fetch_timeout_seconds.into()))?,
            results_per_query: config.results_per_query as usize,
        })
    }

    /// Scraped text about a city's traditional dishes, snippets separated by a
    /// blank line. `None` when the search fails or no page yields usable text.
    #[instrument(skip(self))]
    pub async fn fetch_dish_text(&self, city: &str) -> Option<String> {
        let query = format!("famous traditional dishes in {city}");
        let snippets = self.search_and_scrape(&query).await?;

        if snippets.is_empty() {
            warn!("No dish information scraped for {}", city);
            return None;
        }
        info!("Collected {} dish snippets for {}", snippets.len(), city);
        Some(snippets.join("\n\n"))
    }

    /// Scraped snippets about restaurants serving `dish`; empty on any failure
    #[instrument(skip(self))]
    pub async fn fetch_restaurant_info(&self, city: &str, dish: &str) -> Vec<String> {
        let query = format!("best restaurants in {city} serving {dish}");
        self.search_and_scrape(&query).await.unwrap_or_default()
    }

    async fn search_and_scrape(&self, query: &str) -> Option<Vec<String>> {
        let urls = match self.search.search(query, self.results_per_query).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                return None;
            }
        };
        Some(self.scraper.fetch_snippets(&urls).await)
    }
}
