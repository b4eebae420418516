//! Current weather for a city via the `OpenMeteo` geocoding and forecast APIs
//!
//! Neither lookup ever fails outward: an unknown city or an unreachable
//! service degrades to [`WeatherReading::fallback`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::cache::CoordinateCache;
use crate::config::WeatherConfig;
use crate::http;
use crate::models::{Coordinates, WeatherReading};
use crate::{PalatePilotError, Result};

pub mod open_meteo;

pub struct WeatherProvider {
    client: ClientWithMiddleware,
    geocoding_url: String,
    forecast_url: String,
    cache: Arc<CoordinateCache>,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig, cache: Arc<CoordinateCache>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());
        Ok(Self {
            client: http::build_retrying_client(timeout, config.max_retries)?,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
            cache,
        })
    }

    /// Resolve a city to coordinates, consulting the shared cache first.
    /// Returns `None` when the city is unknown or geocoding failed.
    #[instrument(skip(self))]
    pub async fn resolve_coordinates(&self, city: &str) -> Option<Coordinates> {
        self.cache
            .get_or_resolve(city, || async {
                match self.geocode(city).await {
                    Ok(Some(coordinates)) => Some(coordinates),
                    Ok(None) => {
                        warn!("No geocoding results found for '{}'", city);
                        None
                    }
                    Err(e) => {
                        warn!("Error getting coordinates for {}: {}", city, e);
                        None
                    }
                }
            })
            .await
    }

    /// Current weather reading for a city; never fails
    #[instrument(skip(self))]
    pub async fn get_weather(&self, city: &str) -> WeatherReading {
        let Some(coordinates) = self.resolve_coordinates(city).await else {
            info!("Using default weather for {}", city);
            return WeatherReading::fallback();
        };

        match self.current_conditions(coordinates).await {
            Ok(reading) => {
                info!(
                    "Weather for {}: {} {}, {} dining",
                    city,
                    reading.condition,
                    reading.format_temperature(),
                    reading.recommendation
                );
                reading
            }
            Err(e) => {
                warn!("Error getting weather for {}: {}", city, e);
                WeatherReading::fallback()
            }
        }
    }

    async fn geocode(&self, city: &str) -> Result<Option<Coordinates>> {
        let url = format!(
            "{}?name={}&count=1&language=en&format=json",
            self.geocoding_url,
            urlencoding::encode(city)
        );

        let response: open_meteo::GeocodingResponse = self.fetch_json(&url).await?;
        let first = response.results.unwrap_or_default().into_iter().next();

        if let Some(result) = &first {
            debug!(
                "Found location: {} ({:.4}, {:.4}) {}",
                result.name.as_deref().unwrap_or(city),
                result.latitude,
                result.longitude,
                result.country.as_deref().unwrap_or_default()
            );
        }

        Ok(first.as_ref().map(Coordinates::from))
    }

    async fn current_conditions(&self, coordinates: Coordinates) -> Result<WeatherReading> {
        let url = format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,weather_code&timezone=auto",
            self.forecast_url, coordinates.latitude, coordinates.longitude
        );

        let response: open_meteo::ForecastResponse = self.fetch_json(&url).await?;
        let current = response.current.ok_or_else(|| {
            PalatePilotError::parse(format!(
                "No current weather data for {}",
                coordinates.format_coordinates()
            ))
        })?;

        Ok(WeatherReading::from_observation(
            current.temperature,
            current.weather_code,
        ))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let start_time = Instant::now();
        debug!("OpenMeteo API request URL: {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.json::<T>().await?;

        let duration = start_time.elapsed();
        if duration.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", duration.as_secs_f64());
        }
        Ok(body)
    }
}
