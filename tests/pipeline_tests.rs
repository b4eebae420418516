//! End-to-end pipeline runs against mocked Open-Meteo, SerpAPI, web pages and
//! agent-execution endpoints

use palatepilot::{PalatePilotConfig, TourPipeline, TourPlan, archive};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const DISH_REPLY: &str = "```json\n[\"Croissant\", \"Coq au Vin\", \"Crème Brûlée\"]\n```";

fn paris_tour() -> Value {
    let stop = |restaurant: &str, dish: &str| {
        json!({
            "restaurant": restaurant,
            "address": "Paris",
            "dish": dish,
            "description": format!("{dish} at {restaurant}"),
            "weather_consideration": "Terrace seating in the sun"
        })
    };
    json!({
        "city": "Paris",
        "weather": {"temperature": 22.0, "condition": "clear", "dining": "outdoor"},
        "iconic_dishes": ["Croissant", "Coq au Vin", "Crème Brûlée"],
        "tour": {
            "breakfast": stop("Du Pain et des Idées", "Croissant"),
            "lunch": stop("Le Coq Rico", "Coq au Vin"),
            "dinner": stop("Café Breizh", "Crème Brûlée")
        }
    })
}

fn article(text: &str) -> String {
    format!("<html><body><article><p>{}</p></article></body></html>", text.repeat(15))
}

fn config_for(server: &MockServer) -> PalatePilotConfig {
    let mut config = PalatePilotConfig::default();
    config.weather.geocoding_url = format!("{}/v1/search", server.uri());
    config.weather.forecast_url = format!("{}/v1/forecast", server.uri());
    config.weather.max_retries = 0;
    config.search.base_url = server.uri();
    config.search.api_key = Some("serp-key".to_string());
    config.agent.base_url = format!("{}/api", server.uri());
    config.agent.api_key = Some("julep-key".to_string());
    config.agent.poll_interval_ms = 100;
    config.cache.enabled = false;
    config
}

async fn mount_weather(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "Paris", "latitude": 48.85, "longitude": 2.35, "country": "France"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": {"temperature_2m": 22.0, "weather_code": 0}
        })))
        .mount(server)
        .await;
}

async fn mount_search(server: &MockServer, query: &str, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic_results": [{"link": format!("{}{page}", server.uri())}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_web(server: &MockServer) {
    mount_search(
        server,
        "famous traditional dishes in Paris",
        "/pages/paris-food",
        article("Paris is known for croissants, coq au vin and crème brûlée. "),
    )
    .await;
    mount_search(
        server,
        "best restaurants in Paris serving Croissant",
        "/pages/croissant",
        article("Du Pain et des Idées bakes the best croissant in town. "),
    )
    .await;
    // every other query finds nothing
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic_results": []})))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_task(server: &MockServer, name: &str, task_id: &str, output: Value) {
    Mock::given(method("POST"))
        .and(path("/api/agents/agent-1/tasks"))
        .and(body_partial_json(json!({"name": name})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": task_id})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/tasks/{task_id}/executions")))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": format!("{task_id}-run")})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/executions/{task_id}-run")))
        .respond_with(ResponseTemplate::new(200).set_body_json(output))
        .mount(server)
        .await;
}

async fn mount_agent(server: &MockServer, expected_creations: u64) {
    Mock::given(method("POST"))
        .and(path("/api/agents"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "agent-1"})))
        .expect(expected_creations)
        .mount(server)
        .await;
}

fn succeeded(reply: &str) -> Value {
    json!({
        "status": "succeeded",
        "output": [
            {"role": "user", "content": "prompt"},
            {"role": "assistant", "content": reply}
        ]
    })
}

async fn execution_input(server: &MockServer, task_id: &str) -> Value {
    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let request = requests
        .iter()
        .find(|r| r.url.path() == format!("/api/tasks/{task_id}/executions"))
        .unwrap();
    let body: Value = serde_json::from_slice(&request.body).unwrap();
    body["input"].clone()
}

#[tokio::test]
async fn test_full_tour_for_paris() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_web(&server).await;
    mount_agent(&server, 1).await;
    mount_task(&server, "Dish Extractor", "task-dish", succeeded(DISH_REPLY)).await;
    let tour_reply = format!("Here is your tour!\n{}", paris_tour());
    mount_task(&server, "Foodie Tour Generator", "task-tour", succeeded(&tour_reply)).await;

    let pipeline = TourPipeline::from_config(&config_for(&server)).await.unwrap();
    let report = pipeline.process_cities(&["Paris"]).await;

    let expected: TourPlan = serde_json::from_value(paris_tour()).unwrap();
    assert_eq!(report.tours, [expected]);
    assert!(report.failed_cities.is_empty());

    let dish_input = execution_input(&server, "task-dish").await;
    assert_eq!(dish_input["city"], "Paris");
    assert!(dish_input["text"].as_str().unwrap().starts_with("Paris is known for croissants"));

    let tour_input = execution_input(&server, "task-tour").await;
    assert_eq!(tour_input["condition"], "clear");
    assert_eq!(tour_input["dining_type"], "outdoor");
    assert_eq!(tour_input["temperature"], 22.0);
    assert_eq!(tour_input["dishes"], json!(["Croissant", "Coq au Vin", "Crème Brûlée"]));
    let infos = tour_input["restaurant_infos"].as_array().unwrap();
    assert_eq!(infos.len(), 3);
    assert!(infos[0][0].as_str().unwrap().starts_with("Du Pain et des Idées"));
    assert_eq!(infos[1], json!([]));
    assert_eq!(infos[2], json!([]));
}

#[tokio::test]
async fn test_failed_tour_is_reported_not_fatal() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_web(&server).await;
    mount_agent(&server, 1).await;
    mount_task(&server, "Dish Extractor", "task-dish", succeeded(DISH_REPLY)).await;
    mount_task(
        &server,
        "Foodie Tour Generator",
        "task-tour",
        json!({"status": "failed", "error": "model overloaded"}),
    )
    .await;

    let pipeline = TourPipeline::from_config(&config_for(&server)).await.unwrap();
    let report = pipeline.process_cities(&["Paris"]).await;

    assert!(report.tours.is_empty());
    assert_eq!(report.failed_cities, ["Paris"]);
}

#[tokio::test]
async fn test_configured_agent_is_reused() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_web(&server).await;
    mount_agent(&server, 0).await;
    mount_task(&server, "Dish Extractor", "task-dish", succeeded("[\"A\", \"B\", \"C\"]")).await;
    mount_task(
        &server,
        "Foodie Tour Generator",
        "task-tour",
        succeeded(&paris_tour().to_string()),
    )
    .await;

    let mut config = config_for(&server);
    config.agent.agent_id = Some("agent-1".to_string());
    let pipeline = TourPipeline::from_config(&config).await.unwrap();

    assert!(pipeline.process_city("Paris").await.is_some());
}

#[tokio::test]
async fn test_tour_without_search_key_uses_fallbacks() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_agent(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic_results": []})))
        .expect(0)
        .mount(&server)
        .await;
    mount_task(
        &server,
        "Foodie Tour Generator",
        "task-tour",
        succeeded(&paris_tour().to_string()),
    )
    .await;

    let mut config = config_for(&server);
    config.search.api_key = None;
    let pipeline = TourPipeline::from_config(&config).await.unwrap();
    let report = pipeline.process_cities(&["Paris"]).await;

    assert_eq!(report.tours.len(), 1);
    assert!(report.failed_cities.is_empty());

    let tour_input = execution_input(&server, "task-tour").await;
    assert_eq!(
        tour_input["dishes"],
        json!(["Traditional Dish 1", "Traditional Dish 2", "Traditional Dish 3"])
    );
    assert_eq!(tour_input["restaurant_infos"], json!([[], [], []]));
}

#[tokio::test]
async fn test_unreachable_agent_service_fails_setup() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.agent.base_url = "http://127.0.0.1:9/api".to_string();

    assert!(TourPipeline::from_config(&config).await.is_err());
}

#[tokio::test]
async fn test_batch_saves_and_reloads() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_web(&server).await;
    mount_agent(&server, 1).await;
    mount_task(&server, "Dish Extractor", "task-dish", succeeded(DISH_REPLY)).await;
    mount_task(
        &server,
        "Foodie Tour Generator",
        "task-tour",
        succeeded(&paris_tour().to_string()),
    )
    .await;

    let pipeline = TourPipeline::from_config(&config_for(&server)).await.unwrap();
    let report = pipeline.process_cities(&["Paris"]).await;

    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("foodie_tours.json");
    archive::save_tours(&file, "foodie", &report.tours).unwrap();

    assert_eq!(archive::load_tours(&file, "foodie").unwrap(), report.tours);
}
