//! Generates the one-day tour from weather, dishes and restaurant snippets

use std::time::Duration;

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::agent::{ExecutionClient, TaskDefinition, TerminalResult, assistant_replies};
use crate::models::{DishList, RestaurantSnippets, TourPlan, WeatherReading};

/// Snippets per dish quoted in the prompt
const SNIPPETS_PER_DISH: usize = 2;
const NO_RESTAURANT_INFO: &str = "Popular local restaurants";

const SYSTEM_PROMPT: &str = "You are a culinary expert specializing in food tours.";

pub struct TourGenerator {
    client: ExecutionClient,
    timeout: Duration,
}

impl TourGenerator {
    #[must_use]
    pub fn new(client: ExecutionClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// One attempt at a tour for `city`. `None` when the execution fails,
    /// times out, or its reply does not hold a complete tour.
    #[instrument(skip(self, weather, dishes, snippets))]
    pub async fn generate_tour(
        &self,
        city: &str,
        weather: &WeatherReading,
        dishes: &DishList,
        snippets: &RestaurantSnippets,
    ) -> Option<TourPlan> {
        let dining = weather.recommendation;
        let definition = TaskDefinition::prompt(
            "Foodie Tour Generator",
            "Generate a one-day foodie tour for a given city based on weather",
            SYSTEM_PROMPT,
            tour_prompt(city, weather, dishes, snippets),
        );
        let input = json!({
            "city": city,
            "temperature": weather.temperature,
            "condition": weather.condition,
            "dining_type": dining,
            "dishes": dishes,
            "restaurant_infos": snippets,
        });

        let messages = match self.client.run_task(&definition, &input, self.timeout).await {
            Ok(TerminalResult::Succeeded(messages)) => messages,
            Ok(TerminalResult::Failed(error)) => {
                warn!("Tour generation failed for {}: {}", city, error);
                return None;
            }
            Ok(TerminalResult::TimedOut) => {
                warn!("Tour generation timed out for {}", city);
                return None;
            }
            Err(e) => {
                warn!("Error generating foodie tour for {}: {}", city, e);
                return None;
            }
        };

        let Some(reply) = assistant_replies(&messages).next() else {
            warn!("No assistant reply in tour output for {}", city);
            return None;
        };

        match parse_tour(reply) {
            Some(tour) => {
                info!("Generated foodie tour for {}", city);
                Some(tour)
            }
            None => {
                warn!("Could not parse tour JSON from assistant output for {}", city);
                None
            }
        }
    }
}

/// Per-dish restaurant lines for the prompt
fn restaurant_context(dishes: &DishList, snippets: &RestaurantSnippets) -> String {
    dishes
        .iter()
        .enumerate()
        .map(|(index, dish)| {
            let found = snippets.for_dish(index);
            let info = if found.is_empty() {
                NO_RESTAURANT_INFO.to_string()
            } else {
                found
                    .iter()
                    .take(SNIPPETS_PER_DISH)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            format!("{dish}: {info}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tour_prompt(
    city: &str,
    weather: &WeatherReading,
    dishes: &DishList,
    snippets: &RestaurantSnippets,
) -> String {
    let dining = weather.recommendation;
    let context = restaurant_context(dishes, snippets);
    format!(
        "Create a one-day foodie tour for {city}. Today's weather is {condition} with a temperature of {temperature}, suitable for {dining} dining.\n\n\
         Use these dishes and restaurant information:\n\
         {context}\n\n\
         Follow these steps:\n\
         1. Use the three provided dishes ({dishes}) as the iconic dishes for {city}.\n\
         2. Select appropriate restaurants from the provided information that serve these dishes.\n\
         3. Write a narrative for breakfast, lunch and dinner with restaurant names, addresses, dish descriptions and how the weather shapes the dining experience.\n\
         4. Output a JSON object with fields: 'city' (string), 'weather' (object with 'temperature' as a number, 'condition' as a string, 'dining' as a string), 'iconic_dishes' (array of three strings) and 'tour' (object with 'breakfast', 'lunch', 'dinner', each containing 'restaurant', 'address', 'dish', 'description', 'weather_consideration' as strings).\n\n\
         Keep the narrative engaging, culturally relevant and true to the {dining} dining environment.\n\
         Return only valid JSON with no extra text, backticks, or markdown formatting.",
        condition = weather.condition,
        temperature = weather.format_temperature(),
    )
}

/// Slice from the first `{` to the last `}` of `text`.
///
/// Best effort only: a brace in prose before or after the payload ends up in
/// the slice and the result will not parse.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_tour(reply: &str) -> Option<TourPlan> {
    let object = extract_json_object(reply)?;
    serde_json::from_str(object).ok()
}
