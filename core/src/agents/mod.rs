//! Habitat agent kinds shipped with the core.
//!
//! Each kind is a thin struct around `AgentCore`; its attributes are
//! declared in the constructor and its type-level constants come from the
//! catalog (`data/agent_types.json`).

mod enclosure;
pub mod habitat;
mod human;

pub use enclosure::{AtmosphereAgent, PlumbingSystemAgent, StructureAgent};
pub use human::HumanAgent;

use crate::agent::AgentFactory;

/// The construction mapping for every bundled agent kind.
pub fn default_factory() -> AgentFactory {
    let mut factory = AgentFactory::new();
    factory
        .register(AtmosphereAgent::TYPE_NAME, AtmosphereAgent::construct)
        .register(PlumbingSystemAgent::TYPE_NAME, PlumbingSystemAgent::construct)
        .register(StructureAgent::TYPE_NAME, StructureAgent::construct)
        .register(HumanAgent::TYPE_NAME, HumanAgent::construct);
    factory
}
