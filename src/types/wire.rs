use serde::{Deserialize, Serialize};

use super::{Agent, AgentId, Artifact, ChatMessage, ExecutionLog, Task, TaskId};

/// Commands an observer can push over the socket. Adjacently tagged as
/// `{type, payload}`, the framing the control panel speaks.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    GodMode {
        goal: String,
    },
    Chat {
        content: String,
    },
    SteeringUpdate {
        agent_id: AgentId,
        steering_x: f32,
        steering_y: f32,
    },
    ToolToggle {
        agent_id: AgentId,
        tool: String,
        enabled: bool,
    },
    RerunAgent {
        agent_id: AgentId,
        #[serde(default)]
        max_duration_seconds: Option<u64>,
        #[serde(default)]
        run_interval_minutes: Option<u64>,
    },
    CancelTask {
        task_id: TaskId,
    },
    Reset,
}

/// Everything the server pushes. Each state mutation is paired with exactly
/// one of these, emitted in commit order.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    Connected,
    Agent(Agent),
    AgentUpdate(Agent),
    Task(Task),
    TaskUpdate(Task),
    Artifact(Artifact),
    Message(ChatMessage),
    Log(ExecutionLog),
    Reset,
}
