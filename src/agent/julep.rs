//! REST client for a Julep-compatible agent-execution service

use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{
    AgentProfile, ChatMessage, ExecutionHandle, ExecutionService, ExecutionState, ExecutionStatus,
    Role, TaskDefinition,
};
use crate::config::AgentConfig;
use crate::http;
use crate::{PalatePilotError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_RETRIES: u32 = 2;

pub struct JulepClient {
    client: reqwest::Client,
    // status polls are idempotent, so they may be retried
    poller: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionResponse {
    status: ExecutionStatus,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
}

impl JulepClient {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PalatePilotError::config("Agent service key missing. Set agent.api_key or JULEP_API_KEY")
        })?;

        Ok(Self {
            client: http::build_client(REQUEST_TIMEOUT)?,
            poller: http::build_retrying_client(REQUEST_TIMEOUT, POLL_RETRIES)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PalatePilotError::service(format!("{status}: {body}")))
}

#[async_trait]
impl ExecutionService for JulepClient {
    #[instrument(skip(self))]
    async fn create_agent(&self, profile: &AgentProfile) -> Result<String> {
        let created: Created = self.post("/agents", &serde_json::to_value(profile)?).await?;
        Ok(created.id)
    }

    #[instrument(skip(self, definition), fields(task = %definition.name))]
    async fn create_task(&self, agent_id: &str, definition: &TaskDefinition) -> Result<String> {
        let path = format!("/agents/{}/tasks", urlencoding::encode(agent_id));
        let created: Created = self.post(&path, &serde_json::to_value(definition)?).await?;
        Ok(created.id)
    }

    #[instrument(skip(self, input))]
    async fn create_execution(&self, task_id: &str, input: &Value) -> Result<ExecutionHandle> {
        let path = format!("/tasks/{}/executions", urlencoding::encode(task_id));
        let created: Created = self.post(&path, &json!({ "input": input })).await?;
        Ok(ExecutionHandle::new(created.id))
    }

    async fn get_execution(&self, execution: &ExecutionHandle) -> Result<ExecutionState> {
        let url = format!(
            "{}/executions/{}",
            self.base_url,
            urlencoding::encode(execution.id())
        );
        let response = self
            .poller
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response: ExecutionResponse = check_status(response).await?.json().await?;

        Ok(ExecutionState {
            status: response.status,
            output: normalize_output(response.output),
            error: response.error.map(error_text),
        })
    }
}

fn error_text(error: Value) -> String {
    match error {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Flatten the shapes an execution output comes in to a message list:
/// a list of messages, a chat completion with `choices[].message`, a single
/// message, or bare assistant text.
fn normalize_output(output: Value) -> Option<Vec<ChatMessage>> {
    match output {
        Value::Null => None,
        Value::String(text) => Some(vec![ChatMessage::assistant(text)]),
        Value::Array(items) => Some(items.iter().filter_map(message_from_value).collect()),
        object @ Value::Object(_) => match object.get("choices") {
            Some(Value::Array(choices)) => Some(
                choices
                    .iter()
                    .filter_map(|choice| choice.get("message"))
                    .filter_map(message_from_value)
                    .collect(),
            ),
            _ => message_from_value(&object).map(|message| vec![message]),
        },
        _ => None,
    }
}

fn message_from_value(value: &Value) -> Option<ChatMessage> {
    let role = Role::from(value.get("role")?.as_str()?);
    let content = match value.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(_) => part.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    };
    Some(ChatMessage { role, content })
}
