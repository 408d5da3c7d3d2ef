use serde::{Deserialize, Serialize};

use super::{AgentId, AgentStatus, TaskId};

/// A named worker with a behavioral configuration. Steering values live in
/// [0, 1]: X biases autonomy, Y biases speed against quality. The
/// `last_applied_*` pair records what was in effect when the agent last ran,
/// so the UI can flag pending changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    pub steering_x: f32,
    pub steering_y: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied_steering_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied_steering_y: Option<f32>,
    pub tools: Vec<String>,
    pub enabled_tools: Vec<String>,
    pub token_count: u64,
    pub cost_spent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<TaskId>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tools: Vec<String>,
        steering_x: f32,
        steering_y: f32,
    ) -> Self {
        Self {
            id: AgentId::new_v4(),
            name: name.into(),
            description: description.into(),
            status: AgentStatus::Idle,
            steering_x,
            steering_y,
            last_applied_steering_x: None,
            last_applied_steering_y: None,
            enabled_tools: tools.clone(),
            tools,
            token_count: 0,
            cost_spent: 0.0,
            current_task_id: None,
        }
    }

    /// Steering moved since the last run started.
    pub fn has_pending_steering(&self) -> bool {
        match (self.last_applied_steering_x, self.last_applied_steering_y) {
            (Some(x), Some(y)) => x != self.steering_x || y != self.steering_y,
            _ => false,
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.name == "Coordinator"
    }
}
