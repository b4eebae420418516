//! Data models for `PalatePilot`
//!
//! - Weather: coordinates, conditions and the dining recommendation
//! - Tour: dishes, restaurant snippets and the generated tour plan

pub mod tour;
pub mod weather;

pub use tour::{DishList, Itinerary, MealStop, RestaurantSnippets, TourPlan, TourWeather};
pub use weather::{Coordinates, DiningRecommendation, WeatherCondition, WeatherReading};
