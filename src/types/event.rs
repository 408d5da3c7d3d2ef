use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{AgentId, ArtifactId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Decision,
    Action,
    Artifact,
    Error,
    Complete,
}

/// Append-only record of one step of agent execution. `agent_id` is a string
/// so system-level entries can carry the `"system"` sentinel instead of a
/// real agent id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub agent_name: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub data: Value,
}

impl ExecutionLog {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        kind: LogKind,
        data: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            kind,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// One chat-thread entry. Agent messages carry the originating agent so the
/// client can label them, and optionally point at an artifact they produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<ArtifactId>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::System,
            content: content.into(),
            agent_id: None,
            agent_name: None,
            artifact_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            ..Self::system(content)
        }
    }

    pub fn agent(
        agent_id: AgentId,
        agent_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: MessageRole::Agent,
            agent_id: Some(agent_id),
            agent_name: Some(agent_name.into()),
            ..Self::system(content)
        }
    }

    pub fn with_artifact(mut self, artifact_id: ArtifactId) -> Self {
        self.artifact_id = Some(artifact_id);
        self
    }
}
