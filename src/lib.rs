//! `PalatePilot` - Weather-aware foodie tour planning
//!
//! This library gathers the current weather, scrapes dish and restaurant
//! information for a city and asks a hosted agent for a one-day foodie tour.

pub mod agent;
pub mod archive;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod dishes;
pub mod error;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod scrape;
pub mod search;
pub mod telemetry;
pub mod tour;
pub mod weather;

// Re-export core types for public API
pub use agent::{ExecutionClient, ExecutionService, TerminalResult};
pub use cache::{CoordinateCache, PersistentCache};
pub use config::PalatePilotConfig;
pub use error::PalatePilotError;
pub use models::{DishList, RestaurantSnippets, TourPlan, WeatherReading};
pub use pipeline::{BatchReport, TourPipeline};
pub use weather::WeatherProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PalatePilotError>;
