//! Shared primitive types used across the entire simulation.

/// A simulation tick. One tick = one model step.
pub type Tick = u64;

/// A stable, unique identifier for an agent. Allocated by the Model,
/// preserved across snapshot/restore.
pub type AgentId = u64;

/// The canonical run identifier.
pub type RunId = String;

/// Key under which a snapshot is persisted.
pub type SnapshotId = String;
