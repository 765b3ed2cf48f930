//! Wiring a habitat: one structure, its atmosphere and plumbing, and a crew.

use super::{AtmosphereAgent, HumanAgent, PlumbingSystemAgent, StructureAgent};
use crate::{
    agent::{Agent, AgentFactory},
    config::HabitatConfig,
    error::{SimError, SimResult},
    model::Model,
    types::AgentId,
};

/// Ids of everything `build` registered.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitatIds {
    pub structure:       AgentId,
    pub atmosphere:      AgentId,
    pub plumbing_system: AgentId,
    pub humans:          Vec<AgentId>,
}

/// Register a complete habitat with `model`.
///
/// Atmosphere and plumbing are registered before the structure, and the
/// structure before the crew, so within a tick every human is stepped
/// after the plumbing has recycled.
pub fn build(model: &mut Model, factory: &AgentFactory, config: &HabitatConfig) -> SimResult<HabitatIds> {
    let atmosphere = factory.spawn(AtmosphereAgent::TYPE_NAME, model)?;
    let plumbing_system = factory.spawn(PlumbingSystemAgent::TYPE_NAME, model)?;
    let structure = factory.spawn(StructureAgent::TYPE_NAME, model)?;

    {
        let agent = downcast_mut::<AtmosphereAgent>(model, atmosphere)?;
        agent.core_mut().set("oxygen", config.initial_oxygen)?;
        agent.core_mut().set("carbon_dioxide", config.initial_carbon_dioxide)?;
    }
    downcast_mut::<PlumbingSystemAgent>(model, plumbing_system)?
        .core_mut()
        .set("water", config.initial_water)?;
    {
        let agent = downcast_mut::<StructureAgent>(model, structure)?;
        agent.core_mut().set_agent_ref("atmosphere", Some(atmosphere))?;
        agent.core_mut().set_agent_ref("plumbing_system", Some(plumbing_system))?;
    }

    let mut humans = Vec::with_capacity(config.humans);
    for _ in 0..config.humans {
        let id = factory.spawn(HumanAgent::TYPE_NAME, model)?;
        downcast_mut::<HumanAgent>(model, id)?.set_structure(Some(structure))?;
        humans.push(id);
    }

    log::info!(
        "Habitat built: structure={structure} atmosphere={atmosphere} plumbing={plumbing_system} crew={}",
        humans.len()
    );
    Ok(HabitatIds {
        structure,
        atmosphere,
        plumbing_system,
        humans,
    })
}

fn downcast_mut<T: Agent + 'static>(model: &mut Model, id: AgentId) -> SimResult<&mut T> {
    model.agent_as_mut::<T>(id).ok_or(SimError::UnknownAgent { id })
}
