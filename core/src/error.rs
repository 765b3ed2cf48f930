use crate::types::AgentId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Unknown agent type '{name}'")]
    UnknownAgentType { name: String },

    #[error("Inconsistent hierarchy for agent type '{agent_type}': {detail}")]
    InconsistentHierarchy { agent_type: String, detail: String },

    #[error("Type mismatch on attribute '{name}': expected {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Agent {id} is already registered")]
    DuplicateAgent { id: AgentId },

    #[error("Agent {id} is not registered")]
    UnknownAgent { id: AgentId },

    #[error("Agent {agent_id} is missing required dependency '{dependency}'")]
    MissingDependency { agent_id: AgentId, dependency: String },

    #[error("No snapshot stored for run '{run_id}'")]
    SnapshotNotFound { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
