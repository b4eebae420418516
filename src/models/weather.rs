//! Weather reading model and the condition/dining derivations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinates of a resolved city
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Format as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Coarse sky condition derived from a WMO weather code
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rainy,
    Stormy,
    Unknown,
}

impl WeatherCondition {
    /// Map an Open-Meteo weather code onto a condition
    #[must_use]
    pub fn from_weather_code(code: i64) -> Self {
        match code {
            0 => WeatherCondition::Clear,
            1..=3 => WeatherCondition::Cloudy,
            4..=67 => WeatherCondition::Rainy,
            c if c > 67 => WeatherCondition::Stormy,
            _ => WeatherCondition::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rainy => "rainy",
            WeatherCondition::Stormy => "stormy",
            WeatherCondition::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the weather suits eating outside
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiningRecommendation {
    Outdoor,
    Indoor,
}

impl DiningRecommendation {
    /// Outdoor dining needs a clear sky and more than 15°C
    #[must_use]
    pub fn for_conditions(condition: WeatherCondition, temperature: f64) -> Self {
        if condition == WeatherCondition::Clear && temperature > 15.0 {
            DiningRecommendation::Outdoor
        } else {
            DiningRecommendation::Indoor
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiningRecommendation::Outdoor => "outdoor",
            DiningRecommendation::Indoor => "indoor",
        }
    }
}

impl fmt::Display for DiningRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current weather for a city, reduced to what the tour needs
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    /// Temperature in Celsius
    pub temperature: f64,
    pub condition: WeatherCondition,
    pub recommendation: DiningRecommendation,
}

impl WeatherReading {
    /// Build a reading from a raw observation
    #[must_use]
    pub fn from_observation(temperature: f64, weather_code: i64) -> Self {
        let condition = WeatherCondition::from_weather_code(weather_code);
        Self {
            temperature,
            condition,
            recommendation: DiningRecommendation::for_conditions(condition, temperature),
        }
    }

    /// Reading used whenever the city or its forecast cannot be fetched
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            temperature: 20.0,
            condition: WeatherCondition::Unknown,
            recommendation: DiningRecommendation::Indoor,
        }
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature)
    }
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self::fallback()
    }
}
