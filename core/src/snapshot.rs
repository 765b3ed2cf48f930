//! Snapshot serialization: full model state to and from JSON.
//!
//! A snapshot captures everything needed to rebuild a running model:
//! clock, RNG state, and every live agent with its persisted attributes.
//! Agent references are stored as ids, which is what lets cyclic agent
//! graphs serialise without special handling.
//!
//! Restore runs in two passes:
//!   1. construct and register every recorded agent under its original id;
//!   2. write persisted attributes, resolving references against the
//!      agents materialised in pass 1.
//!
//! A reference whose target was not materialised is a dangling reference.
//! It is logged and the attribute falls back to its declared default.

use crate::{
    agent::AgentFactory,
    attribute::AttributeSpec,
    catalog::TypeCatalog,
    clock::SimClock,
    error::{SimError, SimResult},
    model::Model,
    rng::ModelRng,
    types::{AgentId, SnapshotId, Tick},
    value::AttrValue,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id:   SnapshotId,
    pub version:       u32,
    pub tick:          Tick,
    pub clock:         SimClock,
    pub width:         u32,
    pub height:        u32,
    pub seed:          u64,
    pub rng:           ModelRng,
    pub next_agent_id: AgentId,
    /// Live agents in registration order.
    pub agents:        Vec<AgentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub agent_type: String,
    pub unique_id:  AgentId,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Snapshot {
    pub fn agent(&self, id: AgentId) -> Option<&AgentRecord> {
        self.agents.iter().find(|record| record.unique_id == id)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(SimError::Other(anyhow::anyhow!(
                "unsupported snapshot version {} (expected {SNAPSHOT_FORMAT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

/// Capture the persisted state of every live agent.
pub fn capture(model: &Model) -> Snapshot {
    let agents: Vec<AgentRecord> = model
        .get_agents()
        .into_iter()
        .map(|agent| {
            let core = agent.core();
            let attributes = core
                .attributes()
                .declarations()
                .filter(|decl| decl.persisted)
                .filter_map(|decl| {
                    let value = core.get(&decl.name).ok()?.clone();
                    let value = match value {
                        AttrValue::Agent(Some(target)) if !model.contains(target) => {
                            log::debug!(
                                "agent {} attribute '{}' points at destroyed agent {target}; captured as empty",
                                core.id(),
                                decl.name
                            );
                            AttrValue::Agent(None)
                        }
                        other => other,
                    };
                    Some((decl.name.clone(), value))
                })
                .collect();
            AgentRecord {
                agent_type: core.type_name().to_string(),
                unique_id:  core.id(),
                attributes,
            }
        })
        .collect();

    let snapshot = Snapshot {
        snapshot_id:   uuid::Uuid::new_v4().to_string(),
        version:       SNAPSHOT_FORMAT_VERSION,
        tick:          model.clock.current_tick,
        clock:         model.clock.clone(),
        width:         model.width,
        height:        model.height,
        seed:          model.seed(),
        rng:           model.rng_state().clone(),
        next_agent_id: model.peek_next_agent_id(),
        agents,
    };
    log::debug!(
        "Snapshot {} captured at tick {} with {} agents",
        snapshot.snapshot_id,
        snapshot.tick,
        snapshot.agents.len()
    );
    snapshot
}

/// Rebuild a live model equivalent to the one `snapshot` was taken from.
pub fn restore(
    snapshot: &Snapshot,
    catalog: Arc<TypeCatalog>,
    factory: &AgentFactory,
) -> SimResult<Model> {
    let mut model = Model::with_seed(snapshot.width, snapshot.height, snapshot.seed, catalog);

    // Pass 1: materialise every agent before any reference is resolved.
    for record in &snapshot.agents {
        let agent = factory.construct(&record.agent_type, &mut model, record.unique_id)?;
        if agent.id() != record.unique_id {
            return Err(SimError::Other(anyhow::anyhow!(
                "constructor for '{}' ignored the requested id {}",
                record.agent_type,
                record.unique_id
            )));
        }
        model.add_agent(agent)?;
    }
    let materialised: HashSet<AgentId> = snapshot.agents.iter().map(|r| r.unique_id).collect();

    // Pass 2: persisted attributes.
    for record in &snapshot.agents {
        let agent = model
            .agent_mut(record.unique_id)
            .ok_or(SimError::UnknownAgent { id: record.unique_id })?;
        let core = agent.core_mut();

        for (name, value) in &record.attributes {
            if !core.attributes().is_declared(name) {
                log::debug!(
                    "agent {} restoring undeclared attribute '{name}' as a persisted instance attribute",
                    record.unique_id
                );
                let spec = match value {
                    AttrValue::Agent(_) => AttributeSpec::agent_ref(name.as_str()),
                    other => AttributeSpec::new(name.as_str(), other.clone()),
                };
                core.attributes_mut().declare(spec.persisted())?;
            }

            match value {
                AttrValue::Agent(Some(target)) if !materialised.contains(target) => {
                    log::warn!(
                        "DanglingReference: agent {} attribute '{name}' references missing agent {target}; using default",
                        record.unique_id
                    );
                    core.attributes_mut().reset_to_default(name)?;
                }
                _ => core.set(name, value.clone())?,
            }
        }
    }

    // Constructors may have drawn from the RNG; the recorded stream wins.
    model.restore_runtime(snapshot.clock.clone(), snapshot.rng.clone(), snapshot.next_agent_id);
    model.drain_events();

    log::info!(
        "Model restored from snapshot {} at tick {} ({} agents)",
        snapshot.snapshot_id,
        snapshot.tick,
        model.agent_count()
    );
    Ok(model)
}
