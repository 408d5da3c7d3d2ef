use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::{
    Agent, AgentId, AgentStatus, Artifact, ArtifactId, ChatMessage, ExecutionLog, Task, TaskId,
};

/// Process-wide registry of all mission state. Everything lives in memory and
/// dies with the process; `reset` is the only bulk teardown.
///
/// Mutations go through the closure-based `update_*` methods so each one is a
/// single critical section, and the committed snapshot comes back to the
/// caller for broadcasting.
pub struct MissionStore {
    agents: RwLock<HashMap<AgentId, Agent>>,
    tasks: RwLock<HashMap<TaskId, Task>>,
    artifacts: RwLock<HashMap<ArtifactId, Artifact>>,
    logs: RwLock<Vec<ExecutionLog>>,
    messages: RwLock<Vec<ChatMessage>>,
    context: RwLock<String>,
}

impl MissionStore {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
            artifacts: RwLock::new(HashMap::new()),
            logs: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
            context: RwLock::new(String::new()),
        }
    }

    pub fn insert_agent(&self, agent: Agent) {
        let mut agents = self.agents.write().unwrap();
        agents.insert(agent.id, agent);
    }

    pub fn get_agent(&self, id: AgentId) -> Option<Agent> {
        let agents = self.agents.read().unwrap();
        agents.get(&id).cloned()
    }

    /// Apply `f` to the agent under the write lock, returning the committed
    /// snapshot. Returns `None` for an unknown id.
    pub fn update_agent<F>(&self, id: AgentId, f: F) -> Option<Agent>
    where
        F: FnOnce(&mut Agent),
    {
        let mut agents = self.agents.write().unwrap();
        let agent = agents.get_mut(&id)?;
        f(agent);
        Some(agent.clone())
    }

    pub fn list_agents(&self) -> Vec<Agent> {
        let agents = self.agents.read().unwrap();
        agents.values().cloned().collect()
    }

    /// Atomically claim an agent for a run: fails if it is already working.
    /// This is the one-run-per-agent invariant; callers that get `None` must
    /// treat the run request as a no-op.
    pub fn begin_run(&self, agent_id: AgentId, task_id: TaskId) -> Option<Agent> {
        let mut agents = self.agents.write().unwrap();
        let agent = agents.get_mut(&agent_id)?;
        if agent.status == AgentStatus::Working {
            return None;
        }
        agent.status = AgentStatus::Working;
        agent.current_task_id = Some(task_id);
        agent.last_applied_steering_x = Some(agent.steering_x);
        agent.last_applied_steering_y = Some(agent.steering_y);
        Some(agent.clone())
    }

    /// The distinguished chat-only agent, if it exists yet.
    pub fn coordinator(&self) -> Option<Agent> {
        let agents = self.agents.read().unwrap();
        agents.values().find(|a| a.is_coordinator()).cloned()
    }

    /// Insert `agent` only if no coordinator exists yet. Returns the inserted
    /// agent, or `None` when another connection won the race.
    pub fn ensure_coordinator(&self, agent: Agent) -> Option<Agent> {
        let mut agents = self.agents.write().unwrap();
        if agents.values().any(|a| a.is_coordinator()) {
            return None;
        }
        agents.insert(agent.id, agent.clone());
        Some(agent)
    }

    pub fn insert_task(&self, task: Task) {
        let mut tasks = self.tasks.write().unwrap();
        tasks.insert(task.id, task);
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        let tasks = self.tasks.read().unwrap();
        tasks.get(&id).cloned()
    }

    pub fn update_task<F>(&self, id: TaskId, f: F) -> Option<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write().unwrap();
        let task = tasks.get_mut(&id)?;
        f(task);
        Some(task.clone())
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        let tasks = self.tasks.read().unwrap();
        tasks.values().cloned().collect()
    }

    pub fn first_task_for_agent(&self, agent_id: AgentId) -> Option<Task> {
        let tasks = self.tasks.read().unwrap();
        tasks
            .values()
            .find(|t| t.assigned_agent_id == agent_id)
            .cloned()
    }

    pub fn insert_artifact(&self, artifact: Artifact) {
        let mut artifacts = self.artifacts.write().unwrap();
        artifacts.insert(artifact.id, artifact);
    }

    pub fn get_artifact(&self, id: ArtifactId) -> Option<Artifact> {
        let artifacts = self.artifacts.read().unwrap();
        artifacts.get(&id).cloned()
    }

    pub fn list_artifacts(&self) -> Vec<Artifact> {
        let artifacts = self.artifacts.read().unwrap();
        artifacts.values().cloned().collect()
    }

    pub fn append_log(&self, entry: ExecutionLog) {
        let mut logs = self.logs.write().unwrap();
        logs.push(entry);
    }

    pub fn list_logs(&self) -> Vec<ExecutionLog> {
        let logs = self.logs.read().unwrap();
        logs.clone()
    }

    pub fn append_message(&self, message: ChatMessage) {
        let mut messages = self.messages.write().unwrap();
        messages.push(message);
    }

    pub fn list_messages(&self) -> Vec<ChatMessage> {
        let messages = self.messages.read().unwrap();
        messages.clone()
    }

    pub fn set_context(&self, context: impl Into<String>) {
        let mut ctx = self.context.write().unwrap();
        *ctx = context.into();
    }

    pub fn context(&self) -> String {
        let ctx = self.context.read().unwrap();
        ctx.clone()
    }

    /// Clear every collection. Scheduler timers must be cancelled before this
    /// is called so nothing fires against the emptied maps.
    pub fn reset(&self) {
        self.agents.write().unwrap().clear();
        self.tasks.write().unwrap().clear();
        self.artifacts.write().unwrap().clear();
        self.logs.write().unwrap().clear();
        self.messages.write().unwrap().clear();
        self.context.write().unwrap().clear();
    }
}

impl Default for MissionStore {
    fn default() -> Self {
        Self::new()
    }
}
