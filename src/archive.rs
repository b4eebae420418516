//! Saved batch results: `{"<label>_tours": [TourPlan, ...]}`

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::models::TourPlan;
use crate::{PalatePilotError, Result};

fn tours_key(label: &str) -> String {
    format!("{label}_tours")
}

/// Write the tours as pretty-printed JSON under `<label>_tours`
pub fn save_tours(path: &Path, label: &str, tours: &[TourPlan]) -> Result<()> {
    let mut document = Map::new();
    document.insert(tours_key(label), serde_json::to_value(tours)?);

    let json = serde_json::to_string_pretty(&Value::Object(document))?;
    fs::write(path, json)?;
    info!("Saved {} tours to {}", tours.len(), path.display());
    Ok(())
}

/// Read tours saved by [`save_tours`] with the same label
pub fn load_tours(path: &Path, label: &str) -> Result<Vec<TourPlan>> {
    let contents = fs::read_to_string(path)?;
    let mut document: Map<String, Value> = serde_json::from_str(&contents)?;

    let key = tours_key(label);
    let tours = document.remove(&key).ok_or_else(|| {
        PalatePilotError::parse(format!("{} has no '{}' entry", path.display(), key))
    })?;
    Ok(serde_json::from_value(tours)?)
}
