//! Dish, restaurant and tour models

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

const FALLBACK_DISHES: [&str; 3] = [
    "Traditional Dish 1",
    "Traditional Dish 2",
    "Traditional Dish 3",
];

/// Exactly three dish names for a city
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct DishList([String; 3]);

impl DishList {
    #[must_use]
    pub fn new(dishes: [String; 3]) -> Self {
        Self(dishes)
    }

    /// Placeholder list used when no dishes could be extracted
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_DISHES.map(String::from))
    }

    /// Take the first three candidates, or `None` when fewer are given
    #[must_use]
    pub fn from_candidates(candidates: Vec<String>) -> Option<Self> {
        let mut candidates = candidates.into_iter();
        let first = candidates.next()?;
        let second = candidates.next()?;
        let third = candidates.next()?;
        Some(Self([first, second, third]))
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.0.iter().zip(FALLBACK_DISHES).all(|(dish, placeholder)| dish == placeholder)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a DishList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for DishList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Scraped restaurant text, one list per dish in `DishList` order
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct RestaurantSnippets(Vec<Vec<String>>);

impl RestaurantSnippets {
    #[must_use]
    pub fn new(per_dish: Vec<Vec<String>>) -> Self {
        Self(per_dish)
    }

    /// Snippets for the dish at `index`; empty when nothing was found
    #[must_use]
    pub fn for_dish(&self, index: usize) -> &[String] {
        self.0.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn dishes_with_info(&self) -> usize {
        self.0.iter().filter(|snippets| !snippets.is_empty()).count()
    }
}

/// Weather block as echoed back in a generated tour
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TourWeather {
    pub temperature: f64,
    pub condition: String,
    pub dining: String,
}

/// One meal of the day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MealStop {
    pub restaurant: String,
    pub address: String,
    pub dish: String,
    pub description: String,
    pub weather_consideration: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Itinerary {
    pub breakfast: MealStop,
    pub lunch: MealStop,
    pub dinner: MealStop,
}

impl Itinerary {
    /// Meals in the order they are eaten
    #[must_use]
    pub fn meals(&self) -> [(&'static str, &MealStop); 3] {
        [
            ("Breakfast", &self.breakfast),
            ("Lunch", &self.lunch),
            ("Dinner", &self.dinner),
        ]
    }
}

/// A one-day foodie tour for a city
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TourPlan {
    pub city: String,
    pub weather: TourWeather,
    pub iconic_dishes: DishList,
    pub tour: Itinerary,
}

impl Display for TourPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🍽️  {}", self.city)?;
        writeln!(
            f,
            "   🌤️ {}, {}°C, {} dining",
            self.weather.condition, self.weather.temperature, self.weather.dining
        )?;
        writeln!(f, "   ⭐ Iconic dishes: {}", self.iconic_dishes)?;

        for (meal, stop) in self.tour.meals() {
            writeln!(f, "   {meal}: {} ({})", stop.restaurant, stop.address)?;
            writeln!(f, "      Dish: {}", stop.dish)?;
            writeln!(f, "      {}", stop.description)?;
            writeln!(f, "      Weather: {}", stop.weather_consideration)?;
        }
        Ok(())
    }
}
