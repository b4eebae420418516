//! Picks a city's three iconic dishes out of scraped text

use std::time::Duration;

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::agent::{ExecutionClient, TaskDefinition, TerminalResult, assistant_replies};
use crate::models::DishList;

/// Scraped text handed to the agent
const PROMPT_TEXT_CHARS: usize = 3000;

const SYSTEM_PROMPT: &str =
    "You are a food expert. Extract dish names from text and return only a JSON array.";

pub struct DishExtractor {
    client: ExecutionClient,
    timeout: Duration,
}

impl DishExtractor {
    #[must_use]
    pub fn new(client: ExecutionClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Three dishes named in `text`. Never fails: missing text, a failed or
    /// timed out execution, or an unusable reply all give
    /// [`DishList::fallback`].
    #[instrument(skip(self, text))]
    pub async fn extract_dishes(&self, city: &str, text: Option<&str>) -> DishList {
        let Some(text) = text.filter(|text| !text.trim().is_empty()) else {
            warn!("No dish text for {}, using fallback dishes", city);
            return DishList::fallback();
        };

        let definition = TaskDefinition::prompt(
            "Dish Extractor",
            "Extract iconic dishes from text",
            SYSTEM_PROMPT,
            dish_prompt(city, text),
        );
        let input = json!({ "city": city, "text": text });

        let messages = match self.client.run_task(&definition, &input, self.timeout).await {
            Ok(TerminalResult::Succeeded(messages)) => messages,
            Ok(TerminalResult::Failed(error)) => {
                warn!("Dish extraction failed for {}: {}", city, error);
                return DishList::fallback();
            }
            Ok(TerminalResult::TimedOut) => {
                warn!("Dish extraction timed out for {}", city);
                return DishList::fallback();
            }
            Err(e) => {
                warn!("Error extracting dishes for {}: {}", city, e);
                return DishList::fallback();
            }
        };

        let reply = assistant_replies(&messages).find_map(parse_dish_reply);
        match reply {
            Some(dishes) => {
                info!("Selected dishes for {}: {}", city, dishes);
                dishes
            }
            None => {
                warn!("No usable dish list in reply for {}", city);
                DishList::fallback()
            }
        }
    }
}

fn dish_prompt(city: &str, text: &str) -> String {
    let excerpt: String = text.chars().take(PROMPT_TEXT_CHARS).collect();
    format!(
        "Extract exactly 3 iconic dishes from the following text about {city}:\n\n\
         {excerpt}\n\n\
         Return only a JSON array of 3 dish names, for example: [\"Dish 1\", \"Dish 2\", \"Dish 3\"]"
    )
}

/// Remove a surrounding ```json / ``` code fence
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// First three names of a JSON array reply, if it has at least three
fn parse_dish_reply(reply: &str) -> Option<DishList> {
    let candidates: Vec<String> = serde_json::from_str(strip_code_fence(reply)).ok()?;
    DishList::from_candidates(candidates)
}
