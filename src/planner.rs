use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::decision::extract_json;
use crate::providers::{LLMProvider, Message};

/// Tools the planner may hand to a new agent. `read_file` is deliberately
/// absent: uploaded artifacts are fed in through task inputs, not planned
/// around.
pub const PLANNER_TOOLS: &[&str] = &["web_search", "analyze_data", "code_writer"];

const DEFAULT_MAX_ITERATIONS: u32 = 5;
const MAX_AGENTS: usize = 3;

#[derive(Debug, Clone)]
pub struct AgentTemplate {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
    pub steering_x: f32,
    pub steering_y: f32,
}

#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub goal: String,
    pub success_criteria: String,
    pub inputs: Vec<String>,
    pub agent_index: usize,
    pub max_iterations: u32,
}

#[derive(Debug, Clone)]
pub struct MissionPlan {
    pub agents: Vec<AgentTemplate>,
    pub tasks: Vec<TaskTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    agents: Vec<RawAgent>,
    #[serde(default)]
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
struct RawAgent {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tools: Vec<String>,
    initial_steering: Option<RawSteering>,
}

#[derive(Debug, Deserialize)]
struct RawSteering {
    x: Option<f32>,
    y: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    goal: String,
    #[serde(default)]
    success_criteria: String,
    #[serde(default)]
    inputs: Vec<String>,
    agent_index: Option<usize>,
}

/// Turns a free-text goal into a small roster of agents and their tasks.
/// `decompose` cannot fail: any planning error collapses into the
/// single-General-Agent fallback.
pub struct Planner {
    llm: Arc<dyn LLMProvider>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }

    pub async fn decompose(&self, goal: &str) -> MissionPlan {
        match self.try_decompose(goal).await {
            Ok(plan) => plan,
            Err(err) => {
                log::warn!("goal decomposition failed, using fallback plan: {:#}", err);
                Self::fallback_plan(goal)
            }
        }
    }

    async fn try_decompose(&self, goal: &str) -> Result<MissionPlan> {
        let prompt = Self::build_prompt(goal);
        let response = self.llm.complete(vec![Message::user(prompt)]).await?;

        let blob =
            extract_json(&response).ok_or_else(|| anyhow!("No JSON found in response"))?;
        let raw: RawPlan = serde_json::from_str(blob)?;

        let agents: Vec<AgentTemplate> = raw
            .agents
            .into_iter()
            .take(MAX_AGENTS)
            .map(|a| {
                let tools: Vec<String> = a
                    .tools
                    .into_iter()
                    .filter(|t| PLANNER_TOOLS.contains(&t.as_str()))
                    .collect();
                let steering = a.initial_steering.as_ref();
                AgentTemplate {
                    name: a.name,
                    description: a.description,
                    tools,
                    steering_x: steering.and_then(|s| s.x).unwrap_or(0.5),
                    steering_y: steering.and_then(|s| s.y).unwrap_or(0.5),
                }
            })
            .collect();

        if agents.is_empty() {
            return Err(anyhow!("Plan produced no agents"));
        }

        let tasks: Vec<TaskTemplate> = raw
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, t)| TaskTemplate {
                goal: t.goal,
                success_criteria: if t.success_criteria.is_empty() {
                    "Task completed successfully".to_string()
                } else {
                    t.success_criteria
                },
                inputs: t.inputs,
                agent_index: t.agent_index.unwrap_or(index) % agents.len(),
                max_iterations: DEFAULT_MAX_ITERATIONS,
            })
            .collect();

        if tasks.is_empty() {
            return Err(anyhow!("Plan produced no tasks"));
        }

        Ok(MissionPlan { agents, tasks })
    }

    /// The terminal error boundary for planning. One general-purpose agent,
    /// every planner tool enabled, one task carrying the verbatim goal.
    fn fallback_plan(goal: &str) -> MissionPlan {
        MissionPlan {
            agents: vec![AgentTemplate {
                name: "General Agent".to_string(),
                description: "A general-purpose agent to handle this request".to_string(),
                tools: PLANNER_TOOLS.iter().map(|t| t.to_string()).collect(),
                steering_x: 0.5,
                steering_y: 0.5,
            }],
            tasks: vec![TaskTemplate {
                goal: goal.to_string(),
                success_criteria: "Task completed successfully".to_string(),
                inputs: Vec::new(),
                agent_index: 0,
                max_iterations: DEFAULT_MAX_ITERATIONS,
            }],
        }
    }

    fn build_prompt(goal: &str) -> String {
        format!(
            r#"You are a mission planner for an AI agent system. Analyze the following goal and decompose it into agents and tasks.

User Goal: "{goal}"

Create a plan with 1-3 specialized agents and their tasks. Respond with valid JSON in this exact format:
{{
  "agents": [
    {{
      "name": "AgentName",
      "description": "What this agent specializes in",
      "tools": ["tool1", "tool2"],
      "initial_steering": {{
        "x": 0.5,
        "y": 0.5
      }}
    }}
  ],
  "tasks": [
    {{
      "goal": "Specific task goal",
      "successCriteria": "How to know when done",
      "inputs": ["any required inputs"],
      "agentIndex": 0
    }}
  ]
}}

Available tools: web_search, analyze_data, code_writer

Keep it focused - maximum 3 agents, 1-2 tasks per agent. Match tools to agent purpose."#
        )
    }
}
