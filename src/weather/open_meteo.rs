//! `OpenMeteo` API response structures

use serde::Deserialize;

use crate::models::Coordinates;

/// Geocoding response from `OpenMeteo`
#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    pub results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodingResult {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
}

impl From<&GeocodingResult> for Coordinates {
    fn from(result: &GeocodingResult) -> Self {
        Coordinates::new(result.latitude, result.longitude)
    }
}

/// Forecast response restricted to the `current` block
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current: Option<CurrentData>,
}

/// Current weather data from `OpenMeteo`
#[derive(Debug, Deserialize)]
pub struct CurrentData {
    #[serde(rename = "temperature_2m")]
    pub temperature: f64,
    pub weather_code: i64,
}
