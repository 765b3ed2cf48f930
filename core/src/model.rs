//! The Model: sole owner of every agent, the RNG, and simulation time.
//!
//! EXECUTION ORDER:
//!   1. advance the clock;
//!   2. capture the roster (registration order) at tick start;
//!   3. step each agent on the roster that is still registered.
//!
//! RULES:
//!   - Agents created during tick T are first stepped in tick T+1.
//!   - Agents destroyed during tick T are not stepped again in tick T.
//!   - A failing agent step is logged and recorded; the tick continues.
//!   - Only the Model mutates the registry.

use crate::{
    agent::{Agent, AgentFactory},
    catalog::TypeCatalog,
    clock::SimClock,
    error::{SimError, SimResult},
    event::SimEvent,
    rng::ModelRng,
    snapshot::{self, Snapshot},
    types::{AgentId, Tick},
};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Model {
    pub width:  u32,
    pub height: u32,
    pub clock:  SimClock,
    rng:        ModelRng,
    catalog:    Arc<TypeCatalog>,
    agents:     HashMap<AgentId, Box<dyn Agent>>,
    /// Registration order. Includes the agent currently being stepped.
    order:      Vec<AgentId>,
    next_id:    AgentId,
    stepping:   Option<AgentId>,
    stepping_destroyed: bool,
    events:     Vec<SimEvent>,
}

impl Model {
    /// An empty model with a fresh, non-reproducible seed.
    pub fn create_new(width: u32, height: u32, catalog: Arc<TypeCatalog>) -> Self {
        let seed: u64 = rand::random();
        Self::with_seed(width, height, seed, catalog)
    }

    /// An empty model whose random stream is fully determined by `seed`.
    pub fn with_seed(width: u32, height: u32, seed: u64, catalog: Arc<TypeCatalog>) -> Self {
        log::debug!("Model created: {width}x{height} seed={seed}");
        Self {
            width,
            height,
            clock: SimClock::default(),
            rng: ModelRng::new(seed),
            catalog,
            agents: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            stepping: None,
            stepping_destroyed: false,
            events: Vec::new(),
        }
    }

    /// Rebuild a model from a persisted snapshot.
    pub fn load_from_db(
        snapshot: &Snapshot,
        catalog: Arc<TypeCatalog>,
        factory: &AgentFactory,
    ) -> SimResult<Self> {
        snapshot::restore(snapshot, catalog, factory)
    }

    pub fn snapshot(&self) -> Snapshot {
        snapshot::capture(self)
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn rng(&mut self) -> &mut ModelRng {
        &mut self.rng
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    /// Reserve a fresh agent id.
    pub fn next_agent_id(&mut self) -> AgentId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn rng_state(&self) -> &ModelRng {
        &self.rng
    }

    pub(crate) fn peek_next_agent_id(&self) -> AgentId {
        self.next_id
    }

    pub fn add_agent(&mut self, agent: Box<dyn Agent>) -> SimResult<AgentId> {
        let id = agent.id();
        if self.contains(id) {
            return Err(SimError::DuplicateAgent { id });
        }
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.events.push(SimEvent::AgentAdded {
            tick:       self.clock.current_tick,
            agent_id:   id,
            agent_type: agent.type_name().to_string(),
        });
        self.order.push(id);
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Destroy an agent. References held by peers are left in place and
    /// resolve to nothing from now on.
    pub fn remove_agent(&mut self, id: AgentId) -> SimResult<()> {
        if self.stepping == Some(id) {
            // Self-destruction: step() drops the agent and records the event.
            if self.stepping_destroyed {
                return Err(SimError::UnknownAgent { id });
            }
            self.stepping_destroyed = true;
        } else {
            let agent = self.agents.remove(&id).ok_or(SimError::UnknownAgent { id })?;
            self.events.push(SimEvent::AgentDestroyed {
                tick:       self.clock.current_tick,
                agent_id:   id,
                agent_type: agent.type_name().to_string(),
            });
        }
        self.order.retain(|registered| *registered != id);
        log::debug!("tick={} agent {id} destroyed", self.clock.current_tick);
        Ok(())
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id) || (self.stepping == Some(id) && !self.stepping_destroyed)
    }

    pub fn agent_count(&self) -> usize {
        self.order.len()
    }

    /// Registered ids in registration order.
    pub fn agent_ids(&self) -> &[AgentId] {
        &self.order
    }

    /// Live agents in registration order. The agent currently being
    /// stepped is not visible here.
    pub fn get_agents(&self) -> Vec<&dyn Agent> {
        self.order
            .iter()
            .filter_map(|id| self.agents.get(id).map(|agent| agent.as_ref()))
            .collect()
    }

    pub fn agent(&self, id: AgentId) -> Option<&dyn Agent> {
        self.agents.get(&id).map(|agent| agent.as_ref())
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut (dyn Agent + 'static)> {
        self.agents.get_mut(&id).map(|agent| agent.as_mut())
    }

    /// Resolve an agent reference. Empty or dangling references yield `None`.
    pub fn resolve_ref(&self, target: Option<AgentId>) -> Option<&dyn Agent> {
        target.and_then(|id| self.agent(id))
    }

    pub fn agent_as<T: Agent + 'static>(&self, id: AgentId) -> Option<&T> {
        self.agents.get(&id)?.as_any().downcast_ref::<T>()
    }

    pub fn agent_as_mut<T: Agent + 'static>(&mut self, id: AgentId) -> Option<&mut T> {
        self.agents.get_mut(&id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Ids of live agents of exactly `type_name`, in registration order.
    pub fn agents_of_type(&self, type_name: &str) -> Vec<AgentId> {
        self.get_agents()
            .into_iter()
            .filter(|agent| agent.type_name() == type_name)
            .map(|agent| agent.id())
            .collect()
    }

    /// Advance one tick. Returns every event recorded since the previous
    /// call, ending with this tick's TickCompleted.
    pub fn step(&mut self) -> SimResult<Vec<SimEvent>> {
        let tick = self.clock.advance();
        self.events.push(SimEvent::TickStarted { tick });

        let roster = self.order.clone();
        for id in roster {
            // Destroyed earlier this tick.
            let Some(mut agent) = self.agents.remove(&id) else { continue };

            self.stepping = Some(id);
            self.stepping_destroyed = false;
            let result = agent.step(self);
            self.stepping = None;

            let destroyed = std::mem::take(&mut self.stepping_destroyed);
            if destroyed {
                self.events.push(SimEvent::AgentDestroyed {
                    tick,
                    agent_id:   id,
                    agent_type: agent.type_name().to_string(),
                });
            }

            if let Err(e) = result {
                log::warn!("tick={tick} agent {id} ({}) step failed: {e}", agent.type_name());
                self.events.push(SimEvent::AgentStepFailed {
                    tick,
                    agent_id: id,
                    error:    e.to_string(),
                });
            }

            if !destroyed {
                self.agents.insert(id, agent);
            }
        }

        self.events.push(SimEvent::TickCompleted {
            tick,
            agent_count: self.order.len(),
        });
        log::debug!("tick={tick} completed with {} agents", self.order.len());
        Ok(self.drain_events())
    }

    /// Run `n` ticks, discarding events.
    pub fn run(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn restore_runtime(&mut self, clock: SimClock, rng: ModelRng, next_id: AgentId) {
        self.clock = clock;
        self.rng = rng;
        self.next_id = self.next_id.max(next_id);
    }
}
