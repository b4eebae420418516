use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{AgentProfile, ChatMessage, ExecutionService, ExecutionStatus, TaskDefinition};
use crate::Result;

/// How an execution ended from the caller's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalResult {
    Succeeded(Vec<ChatMessage>),
    Failed(String),
    TimedOut,
}

/// Runs prompt tasks under one agent: create task, start execution, poll
/// until it succeeds, fails, or the deadline passes. Executions are never
/// retried.
#[derive(Clone)]
pub struct ExecutionClient {
    service: Arc<dyn ExecutionService>,
    agent_id: String,
    poll_interval: Duration,
}

impl ExecutionClient {
    /// Create a fresh agent on the service and run tasks under it
    pub async fn connect(
        service: Arc<dyn ExecutionService>,
        profile: &AgentProfile,
        poll_interval: Duration,
    ) -> Result<Self> {
        let agent_id = service.create_agent(profile).await?;
        info!("Created agent {} ({})", profile.name, agent_id);
        Ok(Self::for_agent(service, agent_id, poll_interval))
    }

    /// Run tasks under an agent that already exists
    pub fn for_agent(
        service: Arc<dyn ExecutionService>,
        agent_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            agent_id: agent_id.into(),
            poll_interval,
        }
    }

    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Transport errors while creating or polling come back as `Err`;
    /// everything the service itself reports is a [`TerminalResult`].
    #[instrument(skip(self, definition, input), fields(task = %definition.name))]
    pub async fn run_task(
        &self,
        definition: &TaskDefinition,
        input: &Value,
        timeout: Duration,
    ) -> Result<TerminalResult> {
        let task_id = self.service.create_task(&self.agent_id, definition).await?;
        let execution = self.service.create_execution(&task_id, input).await?;
        debug!("Started execution {} for task {}", execution, task_id);

        let started = Instant::now();
        loop {
            let state = self.service.get_execution(&execution).await?;
            match state.status {
                ExecutionStatus::Succeeded => {
                    debug!("Execution {} succeeded", execution);
                    return Ok(TerminalResult::Succeeded(state.output.unwrap_or_default()));
                }
                ExecutionStatus::Failed | ExecutionStatus::Cancelled => {
                    let error = state
                        .error
                        .unwrap_or_else(|| format!("execution {}", state.status));
                    warn!("Execution {} failed: {}", execution, error);
                    return Ok(TerminalResult::Failed(error));
                }
                status => debug!("Execution {} is {}", execution, status),
            }

            tokio::time::sleep(self.poll_interval).await;
            if started.elapsed() > timeout {
                warn!(
                    "Execution {} timed out after {} seconds",
                    execution,
                    timeout.as_secs()
                );
                return Ok(TerminalResult::TimedOut);
            }
        }
    }
}
