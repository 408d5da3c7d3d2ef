use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use crate::bus::EventBus;
use crate::decision::{Decision, DecisionProvider};
use crate::store::MissionStore;
use crate::tools::ToolRuntime;
use crate::types::{
    Agent, AgentId, AgentStatus, Artifact, ChatMessage, ExecutionLog, LogKind, ServerEvent,
    TaskId, TaskStatus,
};

/// Drives agents through their decide/act cycles. Owns nothing exclusively:
/// all state lives in the store, every commit is followed by its broadcast in
/// the same async flow, so observers see mutations in apply order.
pub struct MissionRuntime {
    store: Arc<MissionStore>,
    events: EventBus,
    decider: Arc<dyn DecisionProvider>,
    tools: ToolRuntime,
}

impl MissionRuntime {
    pub fn new(
        store: Arc<MissionStore>,
        events: EventBus,
        decider: Arc<dyn DecisionProvider>,
        tools: ToolRuntime,
    ) -> Self {
        Self {
            store,
            events,
            decider,
            tools,
        }
    }

    pub fn store(&self) -> &Arc<MissionStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Append a log entry and push it to observers.
    pub fn record(
        &self,
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        kind: LogKind,
        data: serde_json::Value,
    ) {
        let entry = ExecutionLog::new(agent_id, agent_name, kind, data);
        self.store.append_log(entry.clone());
        self.events.send(ServerEvent::Log(entry));
    }

    /// Append a chat message and push it to observers.
    pub fn say(&self, message: ChatMessage) {
        self.store.append_message(message.clone());
        self.events.send(ServerEvent::Message(message));
    }

    pub fn system_message(&self, content: impl Into<String>) {
        self.say(ChatMessage::system(content));
    }

    /// Run one agent against one task until a terminal status. No-ops if the
    /// agent is already working (one run per agent) or either record is gone
    /// (a reset landed first).
    pub async fn run_task(&self, agent_id: AgentId, task_id: TaskId) {
        let Some(agent) = self.store.begin_run(agent_id, task_id) else {
            log::debug!("run request ignored: agent {} unavailable or busy", agent_id);
            return;
        };
        self.events.send(ServerEvent::AgentUpdate(agent.clone()));

        let now = chrono::Utc::now();
        let Some(task) = self.store.update_task(task_id, |t| {
            t.status = TaskStatus::Active;
            t.started_at = Some(now);
            t.last_run_at = Some(now);
        }) else {
            // Task vanished between scheduling and start; release the agent.
            if let Some(agent) = self.store.update_agent(agent_id, |a| {
                a.status = AgentStatus::Idle;
                a.current_task_id = None;
            }) {
                self.events.send(ServerEvent::AgentUpdate(agent));
            }
            return;
        };
        self.events.send(ServerEvent::TaskUpdate(task.clone()));

        let started = Instant::now();
        let time_limit = task.max_duration_seconds.map(Duration::from_secs);
        let time_limit_hit = || time_limit.map_or(false, |limit| started.elapsed() >= limit);

        let mut results: Vec<String> = Vec::new();

        loop {
            // Re-read so a cancel landed between iterations is observed.
            let Some(current) = self.store.get_task(task_id) else {
                return;
            };
            if current.iteration_count >= current.max_iterations
                || current.status != TaskStatus::Active
                || time_limit_hit()
            {
                break;
            }

            let Some(task) = self.store.update_task(task_id, |t| t.iteration_count += 1)
            else {
                return;
            };
            self.events.send(ServerEvent::TaskUpdate(task.clone()));

            self.record(
                agent.id.to_string(),
                agent.name.clone(),
                LogKind::Decision,
                json!({ "iteration": task.iteration_count, "status": "thinking" }),
            );

            let Some(agent_now) = self.store.get_agent(agent_id) else {
                return;
            };

            let outcome = self
                .decider
                .decide(&agent_now, &task, &self.store.context(), &results)
                .await;

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.record(
                        agent.id.to_string(),
                        agent.name.clone(),
                        LogKind::Error,
                        json!({ "error": err.to_string() }),
                    );
                    self.store
                        .update_task(task_id, |t| t.status = TaskStatus::Failed);
                    break;
                }
            };

            // Usage only climbs; totals ride the final agent_update.
            self.store.update_agent(agent_id, |a| {
                a.token_count += outcome.usage.tokens;
                a.cost_spent += outcome.usage.cost;
            });

            let decision = outcome.decision;
            self.record(
                agent.id.to_string(),
                agent.name.clone(),
                LogKind::Decision,
                json!({
                    "action": decision.kind(),
                    "reason": decision.reason(),
                    "tool": match &decision {
                        Decision::UseTool { tool, .. } => Some(tool.clone()),
                        _ => None,
                    },
                }),
            );

            match decision {
                Decision::UseTool { tool, input, .. } => {
                    self.record(
                        agent.id.to_string(),
                        agent.name.clone(),
                        LogKind::Action,
                        json!({ "tool": tool, "input": input }),
                    );

                    let artifacts = self.store.list_artifacts();
                    let result = self.tools.execute(&tool, &input, &artifacts).await;
                    results.push(format!("Tool: {}\nResult: {}", tool, result));
                    if self
                        .store
                        .update_task(task_id, |t| t.outputs.push(result))
                        .is_none()
                    {
                        return;
                    }

                    self.record(
                        agent.id.to_string(),
                        agent.name.clone(),
                        LogKind::Action,
                        json!({ "tool": tool, "result": "completed" }),
                    );
                }
                Decision::CreateArtifact {
                    name,
                    content,
                    kind,
                    ..
                } => {
                    let artifact = Artifact::new(name, kind, content, agent.name.clone());
                    self.store.insert_artifact(artifact.clone());

                    self.record(
                        agent.id.to_string(),
                        agent.name.clone(),
                        LogKind::Artifact,
                        json!({ "name": artifact.name, "type": artifact.kind }),
                    );
                    self.events.send(ServerEvent::Artifact(artifact.clone()));
                    self.say(
                        ChatMessage::agent(
                            agent.id,
                            agent.name.clone(),
                            format!("Created artifact: {}", artifact.name),
                        )
                        .with_artifact(artifact.id),
                    );

                    // Producing an artifact always ends the run.
                    self.store
                        .update_task(task_id, |t| t.status = TaskStatus::Done);
                }
                Decision::Complete { message, .. } => {
                    self.store
                        .update_task(task_id, |t| t.status = TaskStatus::Done);
                    self.say(ChatMessage::agent(agent.id, agent.name.clone(), message));
                }
                Decision::AskUser { message, .. } => {
                    self.store
                        .update_task(task_id, |t| t.status = TaskStatus::Blocked);
                    self.say(ChatMessage::agent(agent.id, agent.name.clone(), message));
                    break;
                }
            }
        }

        let Some(task) = self.store.get_task(task_id) else {
            return;
        };

        // Exhaustion still counts as completion; a task must never be left
        // active.
        if task.status == TaskStatus::Active {
            if time_limit_hit() {
                self.store
                    .update_task(task_id, |t| t.status = TaskStatus::Done);
                let elapsed = started.elapsed().as_secs();
                self.record(
                    agent.id.to_string(),
                    agent.name.clone(),
                    LogKind::Complete,
                    json!({ "reason": "max_duration_reached", "durationSeconds": elapsed }),
                );
                self.system_message(format!(
                    "{} completed after {}s (time limit reached)",
                    agent.name, elapsed
                ));
            } else if task.iteration_count >= task.max_iterations {
                self.store
                    .update_task(task_id, |t| t.status = TaskStatus::Done);
                self.record(
                    agent.id.to_string(),
                    agent.name.clone(),
                    LogKind::Complete,
                    json!({ "reason": "max_iterations_reached" }),
                );
            }
        }

        let Some(task) = self.store.get_task(task_id) else {
            return;
        };
        let final_status = match task.status {
            TaskStatus::Done => AgentStatus::Complete,
            TaskStatus::Failed => AgentStatus::Error,
            _ => AgentStatus::Idle,
        };
        let Some(agent) = self.store.update_agent(agent_id, |a| {
            a.status = final_status;
            a.current_task_id = None;
        }) else {
            return;
        };
        self.events.send(ServerEvent::AgentUpdate(agent));
        self.events.send(ServerEvent::TaskUpdate(task));
    }

    /// One recurring-schedule occurrence. Best effort: a busy agent means
    /// the occurrence is dropped, not queued.
    pub async fn run_scheduled(&self, task_id: TaskId) {
        let Some(task) = self.store.get_task(task_id) else {
            return;
        };
        let Some(agent) = self.store.get_agent(task.assigned_agent_id) else {
            return;
        };
        if agent.status == AgentStatus::Working {
            log::info!("skipping scheduled run - agent {} is busy", agent.name);
            return;
        }

        let Some(task) = self.store.update_task(task_id, |t| {
            t.iteration_count = 0;
            t.status = TaskStatus::Pending;
            t.outputs.clear();
        }) else {
            return;
        };
        self.events.send(ServerEvent::TaskUpdate(task.clone()));
        self.system_message(format!("Running scheduled task: {}", task.goal));

        self.run_task(agent.id, task_id).await;
    }

    /// Register a freshly planned or uploaded agent and tell observers.
    pub fn add_agent(&self, agent: Agent) -> Agent {
        self.store.insert_agent(agent.clone());
        self.events.send(ServerEvent::Agent(agent.clone()));
        agent
    }
}
