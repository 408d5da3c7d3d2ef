use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::engine::MissionRuntime;
use crate::types::{Task, TaskId};

type TimerMap = Arc<Mutex<HashMap<TaskId, JoinHandle<()>>>>;

/// Deferred and recurring task execution. Timers are plain tokio tasks keyed
/// by task id; they live only in process memory and share the mission's
/// lifecycle: cancel and reset abort them before any state is touched.
pub struct Scheduler {
    runtime: Arc<MissionRuntime>,
    timers: TimerMap,
}

impl Scheduler {
    pub fn new(runtime: Arc<MissionRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            timers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Arrange future run(s) for a task carrying schedule fields. A task with
    /// neither a positive interval nor a future start time is left alone.
    pub fn schedule(&self, task: &Task) {
        if let Some(minutes) = task.run_interval_minutes.filter(|m| *m > 0) {
            self.schedule_recurring(task, minutes);
        } else if let Some(start_at) = task.scheduled_start_time {
            let delay = (start_at - chrono::Utc::now()).to_std().ok();
            // Only positive delays are honored.
            let Some(delay) = delay.filter(|d| !d.is_zero()) else {
                return;
            };
            self.schedule_one_shot(task, delay);
        }
    }

    fn schedule_recurring(&self, task: &Task, minutes: u64) {
        let period = Duration::from_secs(minutes * 60);
        let runtime = self.runtime.clone();
        let task_id = task.id;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            // Occurrences are best-effort; a tick that could not run on time
            // is dropped, never queued.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                runtime.run_scheduled(task_id).await;
            }
        });

        self.timers.lock().unwrap().insert(task_id, handle);
        self.runtime.system_message(format!(
            "Scheduled task \"{}\" to run every {} minute(s)",
            task.goal, minutes
        ));
    }

    fn schedule_one_shot(&self, task: &Task, delay: Duration) {
        self.runtime.system_message(format!(
            "Task \"{}\" scheduled to start in {}s",
            task.goal,
            delay.as_secs()
        ));

        let runtime = self.runtime.clone();
        let timers = self.timers.clone();
        let task_id = task.id;
        let agent_id = task.assigned_agent_id;
        let goal = task.goal.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            runtime.system_message(format!("Starting scheduled task: {}", goal));
            runtime.run_task(agent_id, task_id).await;
            timers.lock().unwrap().remove(&task_id);
        });

        self.timers.lock().unwrap().insert(task_id, handle);
    }

    /// Stop a pending one-shot or recurring timer. Unknown and
    /// already-cancelled ids are a no-op; returns whether a timer existed.
    pub fn cancel(&self, task_id: TaskId) -> bool {
        match self.timers.lock().unwrap().remove(&task_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every outstanding timer. Must run before the store is cleared so
    /// nothing fires against emptied state.
    pub fn cancel_all(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.timers.lock().unwrap().len()
    }
}
