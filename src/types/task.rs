use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, TaskId, TaskStatus};

/// A unit of work bound to exactly one agent for its whole lifetime.
/// `iteration_count` only ever climbs toward the immutable `max_iterations`;
/// the optional timing fields drive the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub goal: String,
    pub status: TaskStatus,
    pub assigned_agent_id: AgentId,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub success_criteria: String,
    pub iteration_count: u32,
    pub max_iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_interval_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        goal: impl Into<String>,
        success_criteria: impl Into<String>,
        assigned_agent_id: AgentId,
        max_iterations: u32,
    ) -> Self {
        Self {
            id: TaskId::new_v4(),
            goal: goal.into(),
            status: TaskStatus::Pending,
            assigned_agent_id,
            inputs: Vec::new(),
            outputs: Vec::new(),
            success_criteria: success_criteria.into(),
            iteration_count: 0,
            max_iterations,
            max_duration_seconds: None,
            scheduled_start_time: None,
            run_interval_minutes: None,
            started_at: None,
            last_run_at: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    /// True when the scheduler, not the run loop, owns the next invocation.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled_start_time.is_some() || self.run_interval_minutes.map_or(false, |m| m > 0)
    }
}
