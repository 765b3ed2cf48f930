//! The habitat shell: structure, atmosphere, and plumbing.

use crate::{
    agent::{Agent, AgentCore},
    attribute::AttributeSpec,
    error::SimResult,
    model::Model,
    types::AgentId,
};
use std::any::Any;

// ── Atmosphere ─────────────────────────────────────────────────

pub struct AtmosphereAgent {
    core: AgentCore,
}

impl AtmosphereAgent {
    pub const TYPE_NAME: &'static str = "atmosphere";

    pub fn with_id(model: &mut Model, id: AgentId) -> SimResult<Self> {
        let mut core = AgentCore::new(model, Self::TYPE_NAME, id)?;
        core.declare(AttributeSpec::new("oxygen", 0.0).client_visible().persisted())?;
        core.declare(AttributeSpec::new("carbon_dioxide", 0.0).client_visible().persisted())?;
        Ok(Self { core })
    }

    pub fn construct(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::with_id(model, id)?))
    }

    pub fn oxygen(&self) -> SimResult<f64> {
        self.core.get_f64("oxygen")
    }

    pub fn carbon_dioxide(&self) -> SimResult<f64> {
        self.core.get_f64("carbon_dioxide")
    }

    /// Remove oxygen and add carbon dioxide, both in kPa. Oxygen never
    /// drops below zero.
    pub fn respire(&mut self, oxygen_used: f64, carbon_dioxide_produced: f64) -> SimResult<()> {
        let oxygen = (self.oxygen()? - oxygen_used).max(0.0);
        let carbon_dioxide = self.carbon_dioxide()? + carbon_dioxide_produced;
        self.core.set_f64("oxygen", oxygen)?;
        self.core.set_f64("carbon_dioxide", carbon_dioxide)
    }
}

impl Agent for AtmosphereAgent {
    fn core(&self) -> &AgentCore { &self.core }
    fn core_mut(&mut self) -> &mut AgentCore { &mut self.core }

    fn step(&mut self, _model: &mut Model) -> SimResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}

// ── Plumbing ───────────────────────────────────────────────────

pub struct PlumbingSystemAgent {
    core: AgentCore,
}

impl PlumbingSystemAgent {
    pub const TYPE_NAME: &'static str = "plumbing_system";

    pub fn with_id(model: &mut Model, id: AgentId) -> SimResult<Self> {
        let mut core = AgentCore::new(model, Self::TYPE_NAME, id)?;
        core.declare(AttributeSpec::new("water", 0.0).client_visible().persisted())?;
        core.declare(AttributeSpec::new("waste_water", 0.0).client_visible().persisted())?;
        Ok(Self { core })
    }

    pub fn construct(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::with_id(model, id)?))
    }

    pub fn water(&self) -> SimResult<f64> {
        self.core.get_f64("water")
    }

    pub fn waste_water(&self) -> SimResult<f64> {
        self.core.get_f64("waste_water")
    }

    /// Move up to `amount` kg of potable water to waste. Returns the
    /// amount actually moved.
    pub fn water_to_waste(&mut self, amount: f64) -> SimResult<f64> {
        let water = self.water()?;
        let waste_water = self.waste_water()?;
        let moved = amount.max(0.0).min(water.max(0.0));
        self.core.set("water", water - moved)?;
        self.core.set("waste_water", waste_water + moved)?;
        Ok(moved)
    }
}

impl Agent for PlumbingSystemAgent {
    fn core(&self) -> &AgentCore { &self.core }
    fn core_mut(&mut self) -> &mut AgentCore { &mut self.core }

    /// Recycle a share of the waste water back to potable water.
    fn step(&mut self, model: &mut Model) -> SimResult<()> {
        let rate = self.core.type_f64("recycle_rate_per_day")?;
        let share = (rate * model.clock.days_per_step()).clamp(0.0, 1.0);
        let waste_water = self.waste_water()?;
        let water = self.water()?;
        let recovered = waste_water * share;
        self.core.set("waste_water", waste_water - recovered)?;
        self.core.set("water", water + recovered)
    }

    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}

// ── Structure ──────────────────────────────────────────────────

/// The enclosing structure. Holds references to its atmosphere and
/// plumbing; enclosed agents reach both through it.
pub struct StructureAgent {
    core: AgentCore,
}

impl StructureAgent {
    pub const TYPE_NAME: &'static str = "structure";

    pub fn with_id(model: &mut Model, id: AgentId) -> SimResult<Self> {
        let mut core = AgentCore::new(model, Self::TYPE_NAME, id)?;
        core.declare(AttributeSpec::agent_ref("atmosphere").client_visible().persisted())?;
        core.declare(AttributeSpec::agent_ref("plumbing_system").client_visible().persisted())?;
        Ok(Self { core })
    }

    pub fn construct(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::with_id(model, id)?))
    }

    pub fn atmosphere(&self) -> SimResult<Option<AgentId>> {
        self.core.get_agent_ref("atmosphere")
    }

    pub fn plumbing_system(&self) -> SimResult<Option<AgentId>> {
        self.core.get_agent_ref("plumbing_system")
    }
}

impl Agent for StructureAgent {
    fn core(&self) -> &AgentCore { &self.core }
    fn core_mut(&mut self) -> &mut AgentCore { &mut self.core }

    fn step(&mut self, _model: &mut Model) -> SimResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}
