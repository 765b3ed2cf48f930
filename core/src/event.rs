//! Events emitted by the model and the engine.
//!
//! The model records an event for every registry change and every
//! isolated step failure; the engine persists them to the event log.
//! Variants are appended, never removed or reordered.

use crate::types::{AgentId, RunId, SnapshotId, Tick};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    SnapshotTaken {
        tick: Tick,
        snapshot_id: SnapshotId,
        agent_count: usize,
    },

    // ── Model events ───────────────────────────────
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
        agent_count: usize,
    },
    AgentAdded {
        tick: Tick,
        agent_id: AgentId,
        agent_type: String,
    },
    AgentDestroyed {
        tick: Tick,
        agent_id: AgentId,
        agent_type: String,
    },
    AgentStepFailed {
        tick: Tick,
        agent_id: AgentId,
        error: String,
    },
}

impl SimEvent {
    /// Stable name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }  => "run_initialized",
            Self::SnapshotTaken { .. }   => "snapshot_taken",
            Self::TickStarted { .. }     => "tick_started",
            Self::TickCompleted { .. }   => "tick_completed",
            Self::AgentAdded { .. }      => "agent_added",
            Self::AgentDestroyed { .. }  => "agent_destroyed",
            Self::AgentStepFailed { .. } => "agent_step_failed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub source: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
