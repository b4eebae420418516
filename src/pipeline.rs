//! Per-city tour pipeline and the batch driver

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::agent::julep::JulepClient;
use crate::agent::{AgentProfile, ExecutionClient, ExecutionService};
use crate::cache::CoordinateCache;
use crate::config::PalatePilotConfig;
use crate::discovery::FoodDiscovery;
use crate::dishes::DishExtractor;
use crate::models::{RestaurantSnippets, TourPlan};
use crate::search::{SearchProvider, SerpApiSearch};
use crate::tour::TourGenerator;
use crate::weather::WeatherProvider;
use crate::Result;

/// Outcome of a batch run, tours in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub tours: Vec<TourPlan>,
    pub failed_cities: Vec<String>,
}

pub struct TourPipeline {
    weather: WeatherProvider,
    discovery: FoodDiscovery,
    dishes: DishExtractor,
    tours: TourGenerator,
}

impl TourPipeline {
    #[must_use]
    pub fn new(
        weather: WeatherProvider,
        discovery: FoodDiscovery,
        dishes: DishExtractor,
        tours: TourGenerator,
    ) -> Self {
        Self {
            weather,
            discovery,
            dishes,
            tours,
        }
    }

    /// Wire up the Open-Meteo, SerpAPI and Julep clients. Creates the agent
    /// unless `agent.agent_id` names an existing one.
    pub async fn from_config(config: &PalatePilotConfig) -> Result<Self> {
        let cache = Arc::new(CoordinateCache::from_config(&config.cache));
        info!(persistent = cache.is_persistent(), "Coordinate cache ready");
        let weather = WeatherProvider::new(&config.weather, cache)?;

        let search: Arc<dyn SearchProvider> = Arc::new(SerpApiSearch::new(&config.search)?);
        let discovery = FoodDiscovery::new(search, &config.search)?;

        let service: Arc<dyn ExecutionService> = Arc::new(JulepClient::new(&config.agent)?);
        let poll_interval = config.agent.poll_interval();
        let client = match &config.agent.agent_id {
            Some(agent_id) => ExecutionClient::for_agent(service, agent_id.clone(), poll_interval),
            None => {
                ExecutionClient::connect(service, &AgentProfile::from(&config.agent), poll_interval)
                    .await?
            }
        };

        Ok(Self::new(
            weather,
            discovery,
            DishExtractor::new(client.clone(), config.agent.dish_timeout()),
            TourGenerator::new(client, config.agent.tour_timeout()),
        ))
    }

    /// Weather, dishes, restaurants, then the tour. Only the last step can
    /// come back empty; every earlier one falls back to defaults.
    #[instrument(skip(self))]
    pub async fn process_city(&self, city: &str) -> Option<TourPlan> {
        info!("🌍 Processing {}", city);

        let weather = self.weather.get_weather(city).await;
        let dish_text = self.discovery.fetch_dish_text(city).await;
        let dishes = self.dishes.extract_dishes(city, dish_text.as_deref()).await;
        if dishes.is_fallback() {
            warn!("Using placeholder dishes for {}", city);
        }

        let per_dish = futures::future::join_all(
            dishes
                .iter()
                .map(|dish| self.discovery.fetch_restaurant_info(city, dish)),
        )
        .await;
        let snippets = RestaurantSnippets::new(per_dish);
        info!(
            "Restaurant info gathered for {} of {} dishes",
            snippets.dishes_with_info(),
            dishes.as_slice().len()
        );

        self.tours
            .generate_tour(city, &weather, &dishes, &snippets)
            .await
    }

    /// Cities one at a time; a failed city is logged and skipped
    pub async fn process_cities<S: AsRef<str>>(&self, cities: &[S]) -> BatchReport {
        let mut report = BatchReport::default();
        for city in cities {
            let city = city.as_ref();
            match self.process_city(city).await {
                Some(tour) => {
                    info!("✅ Completed {}", city);
                    report.tours.push(tour);
                }
                None => {
                    warn!("❌ Failed to generate foodie tour for {}", city);
                    report.failed_cities.push(city.to_string());
                }
            }
        }
        report
    }
}

/// City names from CLI arguments, each of which may be comma separated
pub fn split_cities<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(String::from)
        .collect()
}
