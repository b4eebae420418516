//! Hosted agent-execution service
//!
//! The pipeline only talks to [`ExecutionService`]: create an agent, create a
//! prompt task under it, start an execution with structured input, poll it.
//! [`julep::JulepClient`] is the REST implementation and
//! [`runner::ExecutionClient`] drives the create/poll cycle.

use std::fmt::{self, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::config::AgentConfig;

pub mod julep;
pub mod runner;

pub use runner::{ExecutionClient, TerminalResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    #[serde(other)]
    Other,
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        match role {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Non-empty assistant replies, newest first
pub fn assistant_replies(messages: &[ChatMessage]) -> impl Iterator<Item = &str> {
    messages
        .iter()
        .rev()
        .filter(|message| message.role == Role::Assistant && !message.content.is_empty())
        .map(|message| message.content.as_str())
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    pub about: String,
    pub model: String,
}

impl From<&AgentConfig> for AgentProfile {
    fn from(config: &AgentConfig) -> Self {
        Self {
            name: config.name.clone(),
            about: config.about.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TaskStep {
    pub prompt: Vec<ChatMessage>,
}

/// Single-step prompt task
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    pub main: Vec<TaskStep>,
}

impl TaskDefinition {
    pub fn prompt(
        name: impl Into<String>,
        description: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            main: vec![TaskStep {
                prompt: vec![ChatMessage::system(system), ChatMessage::user(user)],
            }],
        }
    }

    /// The user prompt of the first step
    #[must_use]
    pub fn user_prompt(&self) -> Option<&str> {
        self.main
            .first()?
            .prompt
            .iter()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

/// Id of a running execution, only good for polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Starting,
    Running,
    AwaitingInput,
    Succeeded,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Starting => "starting",
            ExecutionStatus::Running => "running",
            ExecutionStatus::AwaitingInput => "awaiting_input",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Unknown => "unknown",
        };
        f.write_str(status)
    }
}

/// Snapshot of an execution as reported by the service
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    pub status: ExecutionStatus,
    pub output: Option<Vec<ChatMessage>>,
    pub error: Option<String>,
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Returns the new agent id
    async fn create_agent(&self, profile: &AgentProfile) -> Result<String>;
    /// Returns the new task id
    async fn create_task(&self, agent_id: &str, definition: &TaskDefinition) -> Result<String>;
    async fn create_execution(&self, task_id: &str, input: &Value) -> Result<ExecutionHandle>;
    async fn get_execution(&self, execution: &ExecutionHandle) -> Result<ExecutionState>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::PalatePilotError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn running() -> ExecutionState {
        ExecutionState {
            status: ExecutionStatus::Running,
            output: None,
            error: None,
        }
    }

    pub(crate) fn succeeded(output: Vec<ChatMessage>) -> ExecutionState {
        ExecutionState {
            status: ExecutionStatus::Succeeded,
            output: Some(output),
            error: None,
        }
    }

    pub(crate) fn failed(error: &str) -> ExecutionState {
        ExecutionState {
            status: ExecutionStatus::Failed,
            output: None,
            error: Some(error.to_string()),
        }
    }

    /// In-memory service replaying a fixed sequence of states.
    /// The last state repeats forever.
    pub(crate) struct ScriptedService {
        states: Mutex<VecDeque<ExecutionState>>,
        unreachable: bool,
        pub(crate) agents: Mutex<Vec<AgentProfile>>,
        pub(crate) tasks: Mutex<Vec<TaskDefinition>>,
        pub(crate) inputs: Mutex<Vec<Value>>,
        pub(crate) polls: AtomicUsize,
    }

    impl ScriptedService {
        pub(crate) fn new(states: Vec<ExecutionState>) -> Self {
            Self {
                states: Mutex::new(states.into()),
                unreachable: false,
                agents: Mutex::default(),
                tasks: Mutex::default(),
                inputs: Mutex::default(),
                polls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn replying(reply: &str) -> Self {
            Self::new(vec![running(), succeeded(vec![ChatMessage::assistant(reply)])])
        }

        pub(crate) fn never_finishing() -> Self {
            Self::new(vec![running()])
        }

        pub(crate) fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::new(vec![running()])
            }
        }

        pub(crate) fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_prompt(&self) -> Option<String> {
            let tasks = self.tasks.lock().unwrap();
            tasks.last()?.user_prompt().map(str::to_string)
        }

        fn check_reachable(&self) -> Result<()> {
            if self.unreachable {
                return Err(PalatePilotError::network("connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ExecutionService for ScriptedService {
        async fn create_agent(&self, profile: &AgentProfile) -> Result<String> {
            self.check_reachable()?;
            self.agents.lock().unwrap().push(profile.clone());
            Ok("agent-1".to_string())
        }

        async fn create_task(&self, _agent_id: &str, definition: &TaskDefinition) -> Result<String> {
            self.check_reachable()?;
            let mut tasks = self.tasks.lock().unwrap();
            tasks.push(definition.clone());
            Ok(format!("task-{}", tasks.len()))
        }

        async fn create_execution(&self, task_id: &str, input: &Value) -> Result<ExecutionHandle> {
            self.check_reachable()?;
            self.inputs.lock().unwrap().push(input.clone());
            Ok(ExecutionHandle::new(format!("{task_id}-execution")))
        }

        async fn get_execution(&self, _execution: &ExecutionHandle) -> Result<ExecutionState> {
            self.check_reachable()?;
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut states = self.states.lock().unwrap();
            let state = if states.len() > 1 {
                states.pop_front()
            } else {
                states.front().cloned()
            };
            Ok(state.unwrap_or_else(running))
        }
    }
}
