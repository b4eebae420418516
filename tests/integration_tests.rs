//! Integration tests for the PalatePilot CLI

use std::process::{Command, Output};

use palatepilot::{TourPlan, archive};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NO_CONFIG: &str = "/nonexistent/palatepilot/config.toml";

fn palatepilot() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_palatepilot"));
    command
        .env_remove("RUST_LOG")
        .env("PALATEPILOT_CACHE__ENABLED", "false")
        .args(["--config", NO_CONFIG]);
    command
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn tokyo_tour() -> TourPlan {
    let stop = |restaurant: &str, dish: &str| {
        json!({
            "restaurant": restaurant,
            "address": "Tokyo",
            "dish": dish,
            "description": format!("{dish} at {restaurant}"),
            "weather_consideration": "Cosy counter seats out of the rain"
        })
    };
    serde_json::from_value(json!({
        "city": "Tokyo",
        "weather": {"temperature": 14.5, "condition": "rainy", "dining": "indoor"},
        "iconic_dishes": ["Ramen", "Sushi", "Tempura"],
        "tour": {
            "breakfast": stop("Tsukiji Itadori", "Sushi"),
            "lunch": stop("Tsunahachi", "Tempura"),
            "dinner": stop("Ichiran Shibuya", "Ramen")
        }
    }))
    .unwrap()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = palatepilot().arg("--help").output().expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("palatepilot"));
    assert!(stdout.contains("foodie tour"));
    assert!(stdout.contains("weather"));
}

/// Test that a tour run needs at least one city
#[test]
fn test_tour_requires_city() {
    let output = palatepilot().arg("tour").output().expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("CITY"));
}

/// Test that saved tours can be printed again
#[test]
fn test_show_saved_tours() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("trip_tours.json");
    archive::save_tours(&file, "trip", &[tokyo_tour()]).unwrap();

    let output = palatepilot()
        .args(["show", file.to_str().unwrap(), "--label", "trip"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("Tokyo"));
    assert!(stdout.contains("Ramen, Sushi, Tempura"));
    assert!(stdout.contains("Dinner: Ichiran Shibuya"));
}

/// Test that a label mismatch is reported as an error
#[test]
fn test_show_with_wrong_label_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("trip_tours.json");
    archive::save_tours(&file, "trip", &[tokyo_tour()]).unwrap();

    let output = palatepilot()
        .args(["show", file.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("❌"));
}

/// Test that invalid configuration is rejected before any work
#[test]
fn test_invalid_log_level_is_config_error() {
    let output = palatepilot()
        .env("PALATEPILOT_LOGGING__LEVEL", "loud")
        .args(["weather", "Paris"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Configuration error"));
}

/// Test that a label from the command line is checked like a configured one
#[test]
fn test_tour_rejects_label_with_whitespace() {
    let output = palatepilot()
        .args(["tour", "Paris", "--label", "long weekend"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Configuration error"));
}

/// Test the weather command against a mocked Open-Meteo
#[tokio::test(flavor = "multi_thread")]
async fn test_weather_command() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"latitude": 41.9, "longitude": 12.5}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": {"temperature_2m": 9.5, "weather_code": 61}
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        palatepilot()
            .env("PALATEPILOT_WEATHER__GEOCODING_URL", format!("{uri}/v1/search"))
            .env("PALATEPILOT_WEATHER__FORECAST_URL", format!("{uri}/v1/forecast"))
            .args(["weather", "Rome"])
            .output()
            .expect("Failed to execute command")
    })
    .await
    .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Rome: rainy, 9.5°C, indoor dining"));
}

/// Test that an unreachable weather service degrades to the default reading
#[test]
fn test_weather_command_offline() {
    let output = palatepilot()
        .env("PALATEPILOT_WEATHER__GEOCODING_URL", "http://127.0.0.1:9/v1/search")
        .env("PALATEPILOT_WEATHER__MAX_RETRIES", "0")
        .args(["weather", "Nowhere"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Nowhere: unknown, 20.0°C, indoor dining"));
}
