pub mod agent;
pub mod artifact;
pub mod event;
pub mod task;
pub mod wire;

pub use agent::Agent;
pub use artifact::{Artifact, ArtifactKind};
pub use event::{ChatMessage, ExecutionLog, LogKind, MessageRole};
pub use task::Task;
pub use wire::{ClientCommand, ServerEvent};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AgentId = Uuid;
pub type TaskId = Uuid;
pub type ArtifactId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Active,
    Blocked,
    Done,
    Failed,
}

impl TaskStatus {
    /// A task in any of these states will never be iterated again
    /// without an explicit reschedule or rerun.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Active)
    }
}
