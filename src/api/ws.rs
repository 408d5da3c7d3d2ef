use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;

use crate::api::server::AppState;
use crate::types::{
    Agent, AgentId, AgentStatus, ChatMessage, ClientCommand, LogKind, ServerEvent, Task, TaskId,
    TaskStatus,
};

pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let Ok(text) = serde_json::to_string(event) else {
        return Ok(());
    };
    sink.send(Message::Text(text)).await
}

/// One connected observer. The select loop forwards broadcast events and
/// processes each inbound command to completion before reading the next;
/// observers on other sockets interleave freely at await points.
async fn handle_socket(socket: WebSocket, state: AppState) {
    log::info!("observer connected");
    let (mut sink, mut stream) = socket.split();
    let mut events = state.events.subscribe();

    if let Some(coordinator) = state.store.ensure_coordinator(Agent::new(
        "Coordinator",
        "Helpful assistant for answering questions about agents, artifacts, and mission progress",
        vec![],
        0.7,
        0.5,
    )) {
        state.events.send(ServerEvent::Agent(coordinator));
    }

    // Greeting plus a snapshot replay, so a late observer starts from the
    // current state rather than an empty canvas.
    if send_event(&mut sink, &ServerEvent::Connected).await.is_err() {
        return;
    }
    for agent in state.store.list_agents() {
        if send_event(&mut sink, &ServerEvent::Agent(agent)).await.is_err() {
            return;
        }
    }
    for task in state.store.list_tasks() {
        if send_event(&mut sink, &ServerEvent::Task(task)).await.is_err() {
            return;
        }
    }
    for artifact in state.store.list_artifacts() {
        if send_event(&mut sink, &ServerEvent::Artifact(artifact))
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("observer lagged, dropped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => apply_command(&state, command).await,
                    Err(err) => log::warn!("unreadable client command: {}", err),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log::debug!("websocket receive error: {}", err);
                    break;
                }
            },
        }
    }

    log::info!("observer disconnected");
}

/// Apply one observer command against mission state. Every command maps 1:1
/// onto an orchestration operation and runs to completion, including any
/// agent runs it triggers.
pub async fn apply_command(state: &AppState, command: ClientCommand) {
    match command {
        ClientCommand::GodMode { goal } => start_mission(state, goal).await,
        ClientCommand::Chat { content } => answer_chat(state, content).await,
        ClientCommand::SteeringUpdate {
            agent_id,
            steering_x,
            steering_y,
        } => update_steering(state, agent_id, steering_x, steering_y),
        ClientCommand::ToolToggle {
            agent_id,
            tool,
            enabled,
        } => toggle_tool(state, agent_id, tool, enabled),
        ClientCommand::RerunAgent {
            agent_id,
            max_duration_seconds,
            run_interval_minutes,
        } => rerun_agent(state, agent_id, max_duration_seconds, run_interval_minutes).await,
        ClientCommand::CancelTask { task_id } => cancel_task(state, task_id),
        ClientCommand::Reset => reset(state),
    }
}

async fn start_mission(state: &AppState, goal: String) {
    state.store.set_context(goal.clone());
    state
        .runtime
        .system_message("Analyzing request and planning mission...");
    state.runtime.record(
        "system",
        "Mission Control",
        LogKind::Action,
        json!({ "action": "decompose_goal", "goal": goal }),
    );

    let plan = state.planner.decompose(&goal).await;

    let mut agents = Vec::new();
    for template in &plan.agents {
        let agent = Agent::new(
            template.name.clone(),
            template.description.clone(),
            template.tools.clone(),
            template.steering_x,
            template.steering_y,
        );
        agents.push(state.runtime.add_agent(agent));
    }

    let mut tasks = Vec::new();
    for template in &plan.tasks {
        let agent = &agents[template.agent_index % agents.len()];
        let task = Task::new(
            template.goal.clone(),
            template.success_criteria.clone(),
            agent.id,
            template.max_iterations,
        )
        .with_inputs(template.inputs.clone());
        state.store.insert_task(task.clone());
        state.events.send(ServerEvent::Task(task.clone()));
        tasks.push(task);
    }

    let names = agents
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    state.runtime.system_message(format!(
        "Created {} agent(s): {}. Starting execution...",
        agents.len(),
        names
    ));

    for task in tasks {
        if task.is_scheduled() {
            state.scheduler.schedule(&task);
        } else {
            state.runtime.run_task(task.assigned_agent_id, task.id).await;
        }
    }

    state
        .runtime
        .system_message("Mission complete. All agents have finished their tasks.");
}

/// Chat goes to the Coordinator and nowhere else. A busy Coordinator drops
/// the question rather than queueing work behind a run in flight.
async fn answer_chat(state: &AppState, content: String) {
    state.runtime.say(ChatMessage::user(content.clone()));

    let Some(coordinator) = state.store.coordinator() else {
        return;
    };
    if coordinator.status == AgentStatus::Working {
        return;
    }

    let task = Task::new(
        format!("Answer user question: {}", content),
        "Provide helpful response",
        coordinator.id,
        1,
    )
    .with_inputs(vec![content]);
    state.store.insert_task(task.clone());

    state.runtime.run_task(coordinator.id, task.id).await;

    // The Coordinator is always ready for the next question.
    if let Some(coordinator) = state
        .store
        .update_agent(coordinator.id, |a| a.status = AgentStatus::Idle)
    {
        state.events.send(ServerEvent::AgentUpdate(coordinator));
    }
}

fn update_steering(state: &AppState, agent_id: AgentId, steering_x: f32, steering_y: f32) {
    if let Some(agent) = state.store.update_agent(agent_id, |a| {
        a.steering_x = steering_x.clamp(0.0, 1.0);
        a.steering_y = steering_y.clamp(0.0, 1.0);
    }) {
        state.events.send(ServerEvent::AgentUpdate(agent));
    }
}

fn toggle_tool(state: &AppState, agent_id: AgentId, tool: String, enabled: bool) {
    let Some(agent) = state.store.update_agent(agent_id, |a| {
        if enabled {
            if !a.enabled_tools.contains(&tool) {
                a.enabled_tools.push(tool.clone());
            }
        } else {
            a.enabled_tools.retain(|t| t != &tool);
        }
    }) else {
        return;
    };
    state.events.send(ServerEvent::AgentUpdate(agent.clone()));
    state.runtime.record(
        agent.id.to_string(),
        agent.name,
        LogKind::Action,
        json!({ "action": "tool_toggle", "tool": tool, "enabled": enabled }),
    );
}

async fn rerun_agent(
    state: &AppState,
    agent_id: AgentId,
    max_duration_seconds: Option<u64>,
    run_interval_minutes: Option<u64>,
) {
    let Some(agent) = state.store.get_agent(agent_id) else {
        return;
    };
    if agent.status == AgentStatus::Working {
        return;
    }

    state.runtime.record(
        agent.id.to_string(),
        agent.name.clone(),
        LogKind::Action,
        json!({
            "action": "rerun",
            "steeringX": agent.steering_x,
            "steeringY": agent.steering_y,
        }),
    );

    let existing = state.store.first_task_for_agent(agent_id);
    let goal = existing.as_ref().map(|t| t.goal.clone()).unwrap_or_else(|| {
        format!(
            "Continue work with updated steering (X: {:.0}%, Y: {:.0}%)",
            agent.steering_x * 100.0,
            agent.steering_y * 100.0
        )
    });
    let success_criteria = existing
        .as_ref()
        .map(|t| t.success_criteria.clone())
        .unwrap_or_else(|| "Complete task with new steering parameters".to_string());
    let inputs = existing.map(|t| t.inputs).unwrap_or_default();

    let mut task = Task::new(goal, success_criteria, agent_id, 3).with_inputs(inputs);
    task.max_duration_seconds = max_duration_seconds;
    task.run_interval_minutes = run_interval_minutes.filter(|m| *m > 0);

    state.store.insert_task(task.clone());
    state.events.send(ServerEvent::Task(task.clone()));

    if task.run_interval_minutes.is_some() {
        state.scheduler.schedule(&task);
    } else {
        state.runtime.run_task(agent_id, task.id).await;
    }
}

fn cancel_task(state: &AppState, task_id: TaskId) {
    let Some(task) = state.store.get_task(task_id) else {
        return;
    };

    if task.status != TaskStatus::Failed {
        if let Some(task) = state
            .store
            .update_task(task_id, |t| t.status = TaskStatus::Failed)
        {
            state.events.send(ServerEvent::TaskUpdate(task));
        }
    }

    if state.scheduler.cancel(task_id) {
        state
            .runtime
            .system_message(format!("Cancelled scheduled task: {}", task.goal));
    }
}

fn reset(state: &AppState) {
    // Timers first, so nothing fires against the cleared maps.
    state.scheduler.cancel_all();
    state.store.reset();
    state.events.send(ServerEvent::Reset);
}
