use super::enclosure::{AtmosphereAgent, PlumbingSystemAgent, StructureAgent};
use crate::{
    agent::{Agent, AgentCore},
    attribute::AttributeSpec,
    error::{SimError, SimResult},
    model::Model,
    types::AgentId,
    value::AttrValue,
};
use std::any::Any;

const WATER_USAGE_KEY: &str = "total_water_usage_per_day";

/// A crew member living inside a structure.
///
/// Each step the human breathes from the structure's atmosphere,
/// metabolises (energy falls with a BMR-style rate scaled by activity), and
/// sends its daily water usage to the plumbing as waste. A human dies,
/// i.e. destroys itself, when the air becomes unbreathable or its energy
/// runs out.
pub struct HumanAgent {
    core: AgentCore,
}

impl HumanAgent {
    pub const TYPE_NAME: &'static str = "human";

    /// Draws mass, age and height from the model RNG: always six draws.
    pub fn with_id(model: &mut Model, id: AgentId) -> SimResult<Self> {
        let mut core = AgentCore::new(model, Self::TYPE_NAME, id)?;

        let mass_mean = core.type_f64("initial_mass_mean")?;
        let mass_std = core.type_f64("initial_mass_std")?;
        let age_mean = core.type_f64("initial_age_mean")?;
        let age_std = core.type_f64("initial_age_std")?;
        let height_mean = core.type_f64("initial_height_mean")?;
        let height_std = core.type_f64("initial_height_std")?;

        let rng = model.rng();
        let initial_mass = rng.normal(mass_mean, mass_std);
        let initial_age = rng.normal(age_mean, age_std);
        let initial_height = rng.normal(height_mean, height_std);

        let max_energy = core.type_f64("max_energy")?;
        core.declare(AttributeSpec::new("energy", max_energy).client_visible().persisted())?;
        core.declare(AttributeSpec::new("mass", initial_mass).client_visible().persisted())?;
        core.declare(AttributeSpec::new("age", initial_age).client_visible().persisted())?;
        core.declare(AttributeSpec::new("height", initial_height).client_visible().persisted())?;
        core.declare(AttributeSpec::agent_ref("structure").persisted())?;
        Ok(Self { core })
    }

    pub fn construct(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::with_id(model, id)?))
    }

    pub fn energy(&self) -> SimResult<f64> {
        self.core.get_f64("energy")
    }

    pub fn structure(&self) -> SimResult<Option<AgentId>> {
        self.core.get_agent_ref("structure")
    }

    pub fn set_structure(&mut self, structure: Option<AgentId>) -> SimResult<()> {
        self.core.set_agent_ref("structure", structure)
    }

    fn missing(&self, dependency: &str) -> SimError {
        SimError::MissingDependency {
            agent_id: self.core.id(),
            dependency: dependency.to_string(),
        }
    }

    /// Energy burned per day:
    /// (A - age_factor*age + B*(mass_factor*mass + height_factor*height)) / C,
    /// scaled by the activity factor.
    fn metabolize(&mut self, is_working: bool, days_per_step: f64) -> SimResult<()> {
        let work_factor = if is_working {
            self.core.type_f64("metabolism_work_factor_working")?
        } else {
            self.core.type_f64("metabolism_work_factor_idle")?
        };
        let a = self.core.type_f64("metabolism_A")?;
        let b = self.core.type_f64("metabolism_B")?;
        let c = self.core.type_f64("metabolism_C")?;
        let age_factor = self.core.type_f64("metabolism_age_factor")?;
        let mass_factor = self.core.type_f64("metabolism_mass_factor")?;
        let height_factor = self.core.type_f64("metabolism_height_factor")?;

        let age = self.core.get_f64("age")?;
        let mass = self.core.get_f64("mass")?;
        let height = self.core.get_f64("height")?;

        let per_day = (a - age_factor * age + b * (mass_factor * mass + height_factor * height)) / c;
        let energy = self.energy()? - per_day * work_factor * days_per_step;
        self.core.set_f64("energy", energy)
    }

    fn total_water_usage_per_day(&mut self) -> SimResult<f64> {
        let total = self.core.cached(WATER_USAGE_KEY, |agent_type| {
            let mut sum = 0.0;
            for name in ["consumed_water_usage", "hygiene_water_usage", "medical_water_usage"] {
                sum += agent_type.resolve(name)?.as_f64().unwrap_or(0.0);
            }
            Ok(AttrValue::Float(sum))
        })?;
        Ok(total.as_f64().unwrap_or(0.0))
    }
}

impl Agent for HumanAgent {
    fn core(&self) -> &AgentCore { &self.core }
    fn core_mut(&mut self) -> &mut AgentCore { &mut self.core }

    fn step(&mut self, model: &mut Model) -> SimResult<()> {
        let id = self.core.id();
        let structure = self
            .structure()?
            .and_then(|s| model.agent_as::<StructureAgent>(s))
            .ok_or_else(|| self.missing("structure"))?;
        let atmosphere_id = structure.atmosphere()?;
        let plumbing_id = structure
            .plumbing_system()?
            .filter(|p| model.agent_as::<PlumbingSystemAgent>(*p).is_some())
            .ok_or_else(|| self.missing("plumbing_system"))?;

        let breathable = match atmosphere_id.and_then(|a| model.agent_as::<AtmosphereAgent>(a)) {
            None => false,
            Some(atmosphere) => {
                atmosphere.oxygen()? >= self.core.type_f64("fatal_o2_lower")?
                    && atmosphere.carbon_dioxide()? <= self.core.type_f64("fatal_co2_upper")?
            }
        };
        if !breathable {
            log::debug!("tick={} human {id} suffocated", model.current_tick());
            return model.remove_agent(id);
        }

        let days_per_step = model.clock.days_per_step();
        let is_working = f64::from(model.clock.hour_of_day()) < self.core.type_f64("work_day_hours")?;
        self.metabolize(is_working, days_per_step)?;

        let oxygen_used = self.core.type_f64("oxygen_usage")? * days_per_step;
        let carbon_dioxide_produced = self.core.type_f64("carbon_dioxide_output")? * days_per_step;
        if let Some(atmosphere) = atmosphere_id.and_then(|a| model.agent_as_mut::<AtmosphereAgent>(a)) {
            atmosphere.respire(oxygen_used, carbon_dioxide_produced)?;
        }

        let water_used = self.total_water_usage_per_day()? * days_per_step;
        if let Some(plumbing) = model.agent_as_mut::<PlumbingSystemAgent>(plumbing_id) {
            plumbing.water_to_waste(water_used)?;
        }

        if self.energy()? <= 0.0 {
            log::debug!("tick={} human {id} exhausted", model.current_tick());
            model.remove_agent(id)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}
