//! The simulation engine: a Model bound to a run and a store.
//!
//! EXECUTION ORDER per tick:
//!   1. the Model steps every agent (see `model.rs`);
//!   2. every event the tick produced is appended to the event log;
//!   3. every `snapshot_interval` ticks the full model state is saved.
//!
//! RULES:
//!   - All randomness flows through the Model's RNG.
//!   - All registry changes are recorded in the event log.
//!   - A resumed run continues from its latest snapshot and produces the
//!     same ticks the uninterrupted run would have.

use crate::{
    agent::AgentFactory,
    agents::{self, habitat},
    catalog::TypeCatalog,
    clock::SimClock,
    config::HabitatConfig,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    model::Model,
    snapshot::Snapshot,
    store::SimStore,
    types::{RunId, Tick},
};
use std::sync::Arc;

pub struct SimEngine {
    pub run_id:        RunId,
    pub model:         Model,
    pub store:         SimStore,
    factory:           AgentFactory,
    snapshot_interval: Tick,
}

impl SimEngine {
    pub fn new(run_id: RunId, model: Model, factory: AgentFactory, store: SimStore) -> Self {
        Self {
            run_id,
            model,
            store,
            factory,
            snapshot_interval: 24,
        }
    }

    /// Build a fully wired habitat run with the bundled agent kinds.
    pub fn build(
        run_id: RunId,
        seed: u64,
        config: &HabitatConfig,
        catalog: Arc<TypeCatalog>,
        store: SimStore,
    ) -> SimResult<Self> {
        config.validate()?;
        let factory = agents::default_factory();
        let mut model = Model::with_seed(config.width, config.height, seed, catalog);
        model.clock = SimClock::new(config.step_seconds);
        habitat::build(&mut model, &factory, config)?;
        Ok(Self::new(run_id, model, factory, store).with_snapshot_interval(config.snapshot_interval))
    }

    /// In-memory engine over the bundled catalog and the test habitat.
    pub fn build_test(run_id: &str, seed: u64) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(run_id, seed, "test")?;
        let catalog = Arc::new(TypeCatalog::bundled()?);
        store.insert_type_catalog(&catalog)?;
        Self::build(run_id.to_string(), seed, &HabitatConfig::default_test(), catalog, store)
    }

    /// Continue a stored run from its latest snapshot.
    pub fn resume(
        run_id: &str,
        store: SimStore,
        catalog: Arc<TypeCatalog>,
        factory: AgentFactory,
    ) -> SimResult<Self> {
        let snapshot = store
            .latest_snapshot(run_id)?
            .ok_or_else(|| SimError::SnapshotNotFound {
                run_id: run_id.to_string(),
            })?;
        let model = Model::load_from_db(&snapshot, catalog, &factory)?;
        log::info!(
            "Run {run_id} resumed at tick {} from snapshot {}",
            snapshot.tick,
            snapshot.snapshot_id
        );
        Ok(Self::new(run_id.to_string(), model, factory, store))
    }

    pub fn with_snapshot_interval(mut self, interval: Tick) -> Self {
        self.snapshot_interval = interval.max(1);
        self
    }

    /// Release the store, e.g. to resume the run in a fresh engine.
    pub fn into_store(self) -> SimStore {
        self.store
    }

    pub fn snapshot_interval(&self) -> Tick {
        self.snapshot_interval
    }

    pub fn factory(&self) -> &AgentFactory {
        &self.factory
    }

    pub fn current_tick(&self) -> Tick {
        self.model.current_tick()
    }

    /// Advance one tick and persist its events.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        let events = self.model.step()?;
        let tick = self.model.current_tick();
        for event in &events {
            self.log_event(tick, "model", event)?;
        }

        if tick % self.snapshot_interval == 0 {
            self.take_snapshot()?;
        }
        Ok(events)
    }

    /// Run n ticks in a loop.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        // Emit RunInitialized at tick 0 so seed differences are observable.
        if self.model.current_tick() == 0 {
            let init_event = SimEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed:   self.model.seed(),
            };
            self.log_event(0, "engine", &init_event)?;
            // Agents registered while the run was being set up.
            for event in self.model.drain_events() {
                self.log_event(0, "model", &event)?;
            }
        }
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Capture and persist the current model state.
    pub fn take_snapshot(&mut self) -> SimResult<Snapshot> {
        let snapshot = self.model.snapshot();
        self.store.save_snapshot(&self.run_id, &snapshot)?;
        let event = SimEvent::SnapshotTaken {
            tick:        snapshot.tick,
            snapshot_id: snapshot.snapshot_id.clone(),
            agent_count: snapshot.agents.len(),
        };
        self.log_event(snapshot.tick, "engine", &event)?;
        log::debug!("Snapshot {} saved at tick {}", snapshot.snapshot_id, snapshot.tick);
        Ok(snapshot)
    }

    /// Query events for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(&self.run_id, tick)
    }

    fn log_event(&self, tick: Tick, source: &str, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            tick,
            source:     source.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }
}
