//! Per-worker activity counters (§4.K). Advances on every RPC event a
//! `TeammateRpc` emits; the coordinator uses the snapshot to drive the
//! widget projection's `working`/`idle` disambiguation and to answer
//! "what is this worker doing right now" without replaying its event log.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

const RING_BUFFER_CAPACITY: usize = 10;

/// One RPC event as seen by the activity tracker. Mirrors the event
/// vocabulary in §4.G (`agent_start`, `agent_end`, `tool_execution_*`,
/// `message_update`) without depending on the RPC crate's wire types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityEvent {
    AgentStart,
    AgentEnd,
    ToolExecutionStart { tool_name: String },
    ToolExecutionEnd { tool_name: String },
    MessageUpdate { tokens: u64 },
}

/// Aggregated counters for one worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityStats {
    pub tool_use_count: u64,
    pub current_tool_name: Option<String>,
    pub last_tool_name: Option<String>,
    pub turn_count: u64,
    pub total_tokens: u64,
}

struct WorkerActivity {
    stats: ActivityStats,
    recent_events: VecDeque<ActivityEvent>,
}

impl WorkerActivity {
    fn new() -> Self {
        Self {
            stats: ActivityStats::default(),
            recent_events: VecDeque::with_capacity(RING_BUFFER_CAPACITY),
        }
    }

    fn push_event(&mut self, event: ActivityEvent) {
        if self.recent_events.len() == RING_BUFFER_CAPACITY {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(event);
    }
}

/// Per-worker-name activity tracker. One instance per coordinator.
#[derive(Default)]
pub struct ActivityTracker {
    workers: HashMap<String, WorkerActivity>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances `name`'s counters and ring buffer by one event.
    pub fn record_event(&mut self, name: &str, event: ActivityEvent) {
        let worker = self
            .workers
            .entry(name.to_string())
            .or_insert_with(WorkerActivity::new);

        match &event {
            ActivityEvent::AgentStart => {}
            ActivityEvent::AgentEnd => worker.stats.turn_count += 1,
            ActivityEvent::ToolExecutionStart { tool_name } => {
                worker.stats.tool_use_count += 1;
                worker.stats.current_tool_name = Some(tool_name.clone());
            }
            ActivityEvent::ToolExecutionEnd { tool_name } => {
                worker.stats.last_tool_name = Some(tool_name.clone());
                if worker.stats.current_tool_name.as_deref() == Some(tool_name.as_str()) {
                    worker.stats.current_tool_name = None;
                }
            }
            ActivityEvent::MessageUpdate { tokens } => {
                worker.stats.total_tokens += tokens;
            }
        }

        worker.push_event(event);
    }

    /// Current aggregated counters for `name`, if any event has been
    /// recorded for it.
    pub fn stats(&self, name: &str) -> Option<&ActivityStats> {
        self.workers.get(name).map(|w| &w.stats)
    }

    /// Last (up to) 10 events recorded for `name`, oldest first.
    pub fn recent_events(&self, name: &str) -> Vec<&ActivityEvent> {
        match self.workers.get(name) {
            Some(w) => w.recent_events.iter().collect(),
            None => Vec::new(),
        }
    }

    /// Drops all state for `name`. Called on worker removal (kill/prune)
    /// so a later re-spawn of the same name starts from a clean slate.
    pub fn reset(&mut self, name: &str) {
        self.workers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_worker_has_no_stats() {
        let tracker = ActivityTracker::new();
        assert!(tracker.stats("nova").is_none());
        assert!(tracker.recent_events("nova").is_empty());
    }

    #[test]
    fn tool_execution_updates_current_and_last_tool() {
        let mut tracker = ActivityTracker::new();
        tracker.record_event(
            "nova",
            ActivityEvent::ToolExecutionStart { tool_name: "bash".into() },
        );
        let stats = tracker.stats("nova").expect("stats");
        assert_eq!(stats.tool_use_count, 1);
        assert_eq!(stats.current_tool_name.as_deref(), Some("bash"));
        assert_eq!(stats.last_tool_name, None);

        tracker.record_event(
            "nova",
            ActivityEvent::ToolExecutionEnd { tool_name: "bash".into() },
        );
        let stats = tracker.stats("nova").expect("stats");
        assert_eq!(stats.current_tool_name, None);
        assert_eq!(stats.last_tool_name.as_deref(), Some("bash"));
    }

    #[test]
    fn agent_end_increments_turn_count() {
        let mut tracker = ActivityTracker::new();
        tracker.record_event("nova", ActivityEvent::AgentStart);
        tracker.record_event("nova", ActivityEvent::AgentEnd);
        tracker.record_event("nova", ActivityEvent::AgentEnd);
        assert_eq!(tracker.stats("nova").expect("stats").turn_count, 2);
    }

    #[test]
    fn message_update_accumulates_tokens() {
        let mut tracker = ActivityTracker::new();
        tracker.record_event("nova", ActivityEvent::MessageUpdate { tokens: 40 });
        tracker.record_event("nova", ActivityEvent::MessageUpdate { tokens: 25 });
        assert_eq!(tracker.stats("nova").expect("stats").total_tokens, 65);
    }

    #[test]
    fn ring_buffer_caps_at_ten_events() {
        let mut tracker = ActivityTracker::new();
        for i in 0..15u64 {
            tracker.record_event("nova", ActivityEvent::MessageUpdate { tokens: i });
        }
        let events = tracker.recent_events("nova");
        assert_eq!(events.len(), 10);
        assert_eq!(events[0], &ActivityEvent::MessageUpdate { tokens: 5 });
        assert_eq!(events[9], &ActivityEvent::MessageUpdate { tokens: 14 });
    }

    #[test]
    fn reset_drops_all_state_for_worker() {
        let mut tracker = ActivityTracker::new();
        tracker.record_event("nova", ActivityEvent::AgentStart);
        tracker.reset("nova");
        assert!(tracker.stats("nova").is_none());
    }

    #[test]
    fn workers_are_tracked_independently() {
        let mut tracker = ActivityTracker::new();
        tracker.record_event(
            "nova",
            ActivityEvent::ToolExecutionStart { tool_name: "bash".into() },
        );
        tracker.record_event("atlas", ActivityEvent::AgentEnd);
        assert_eq!(tracker.stats("nova").expect("stats").tool_use_count, 1);
        assert_eq!(tracker.stats("atlas").expect("stats").turn_count, 1);
    }
}
