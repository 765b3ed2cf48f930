//! Tick semantics: roster capture, mid-tick creation and destruction,
//! and per-agent failure isolation.

use habitat_core::{
    agent::{Agent, AgentCore, AgentFactory},
    attribute::AttributeSpec,
    catalog::{AgentTypeDef, TypeCatalog},
    error::{SimError, SimResult},
    event::SimEvent,
    model::Model,
    types::AgentId,
};
use std::any::Any;
use std::sync::Arc;

/// Counts its own steps. `target` is used by the behaviours below.
struct Ticker {
    core: AgentCore,
    behaviour: Behaviour,
}

#[derive(Clone, Copy)]
enum Behaviour {
    Count,
    Spawn,
    KillTarget,
    KillSelf,
    Fail,
}

impl Ticker {
    fn new(model: &mut Model, id: AgentId, type_name: &str, behaviour: Behaviour) -> SimResult<Self> {
        let mut core = AgentCore::new(model, type_name, id)?;
        core.declare(AttributeSpec::new("steps", 0i64).persisted())?;
        core.declare(AttributeSpec::agent_ref("target").persisted())?;
        Ok(Self { core, behaviour })
    }

    fn counter(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::new(model, id, "counter", Behaviour::Count)?))
    }

    fn spawner(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::new(model, id, "spawner", Behaviour::Spawn)?))
    }

    fn killer(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::new(model, id, "killer", Behaviour::KillTarget)?))
    }

    fn mayfly(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::new(model, id, "mayfly", Behaviour::KillSelf)?))
    }

    fn broken(model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        Ok(Box::new(Self::new(model, id, "broken", Behaviour::Fail)?))
    }
}

impl Agent for Ticker {
    fn core(&self) -> &AgentCore { &self.core }
    fn core_mut(&mut self) -> &mut AgentCore { &mut self.core }

    fn step(&mut self, model: &mut Model) -> SimResult<()> {
        let steps = self.core.get_i64("steps")?;
        self.core.set("steps", steps + 1)?;
        match self.behaviour {
            Behaviour::Count => Ok(()),
            Behaviour::Spawn => {
                let id = model.next_agent_id();
                let child = Ticker::counter(model, id)?;
                model.add_agent(child)?;
                Ok(())
            }
            Behaviour::KillTarget => {
                if let Some(target) = self.core.get_agent_ref("target")? {
                    if model.contains(target) {
                        model.remove_agent(target)?;
                    }
                }
                Ok(())
            }
            Behaviour::KillSelf => model.remove_agent(self.id()),
            Behaviour::Fail => Err(SimError::MissingDependency {
                agent_id: self.id(),
                dependency: "nothing".to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}

fn setup() -> (Model, AgentFactory) {
    let catalog = TypeCatalog::build(vec![
        AgentTypeDef::new("counter"),
        AgentTypeDef::new("spawner"),
        AgentTypeDef::new("killer"),
        AgentTypeDef::new("mayfly"),
        AgentTypeDef::new("broken"),
    ])
    .expect("catalog");
    let mut factory = AgentFactory::new();
    factory
        .register("counter", Ticker::counter)
        .register("spawner", Ticker::spawner)
        .register("killer", Ticker::killer)
        .register("mayfly", Ticker::mayfly)
        .register("broken", Ticker::broken);
    (Model::with_seed(10, 10, 7, Arc::new(catalog)), factory)
}

fn steps(model: &Model, id: AgentId) -> i64 {
    model
        .agent_as::<Ticker>(id)
        .expect("ticker")
        .core()
        .get_i64("steps")
        .expect("steps")
}

#[test]
fn agents_step_once_per_tick_in_registration_order() {
    let (mut model, factory) = setup();
    let a = factory.spawn("counter", &mut model).unwrap();
    let b = factory.spawn("counter", &mut model).unwrap();
    assert_eq!(model.agent_ids(), &[a, b]);

    model.run(3).unwrap();
    assert_eq!(model.current_tick(), 3);
    assert_eq!(steps(&model, a), 3);
    assert_eq!(steps(&model, b), 3);
}

#[test]
fn agents_created_mid_tick_are_first_stepped_next_tick() {
    let (mut model, factory) = setup();
    let spawner = factory.spawn("spawner", &mut model).unwrap();

    let events = model.step().unwrap();
    assert_eq!(model.agent_count(), 2);
    let child = model.agent_ids()[1];
    assert_eq!(steps(&model, child), 0, "child stepped in the tick it was born");
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::AgentAdded { tick: 1, agent_id, .. } if *agent_id == child
    )));

    model.step().unwrap();
    assert_eq!(steps(&model, child), 1);
    assert_eq!(steps(&model, spawner), 2);
    assert_eq!(model.agent_count(), 3);
}

#[test]
fn agents_destroyed_mid_tick_are_not_stepped() {
    let (mut model, factory) = setup();
    let killer = factory.spawn("killer", &mut model).unwrap();
    let victim = factory.spawn("counter", &mut model).unwrap();
    model
        .agent_mut(killer)
        .unwrap()
        .core_mut()
        .set_agent_ref("target", Some(victim))
        .unwrap();

    let events = model.step().unwrap();
    assert!(!model.contains(victim));
    assert!(model.agent(victim).is_none());
    assert_eq!(model.agent_count(), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::AgentDestroyed { agent_id, .. } if *agent_id == victim
    )));

    // The killer still holds the id; it resolves to nothing.
    let target = model.agent(killer).unwrap().core().get_agent_ref("target").unwrap();
    assert_eq!(target, Some(victim));
    assert!(model.resolve_ref(target).is_none());
}

#[test]
fn an_agent_can_destroy_itself() {
    let (mut model, factory) = setup();
    let mayfly = factory.spawn("mayfly", &mut model).unwrap();
    let counter = factory.spawn("counter", &mut model).unwrap();

    let events = model.step().unwrap();
    assert!(!model.contains(mayfly));
    assert_eq!(model.agent_ids(), &[counter]);
    assert_eq!(steps(&model, counter), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::AgentDestroyed { tick: 1, agent_id, agent_type } if *agent_id == mayfly && agent_type == "mayfly"
    )));
}

#[test]
fn a_failing_agent_does_not_stop_the_tick() {
    let (mut model, factory) = setup();
    let broken = factory.spawn("broken", &mut model).unwrap();
    let counter = factory.spawn("counter", &mut model).unwrap();

    let events = model.step().unwrap();
    assert_eq!(steps(&model, counter), 1);
    assert!(model.contains(broken), "a failed step does not destroy the agent");
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::AgentStepFailed { agent_id, error, .. }
            if *agent_id == broken && error.contains("nothing")
    )));
    assert!(matches!(events.last(), Some(SimEvent::TickCompleted { tick: 1, agent_count: 2 })));
}

#[test]
fn registry_rejects_duplicates_and_unknown_ids() {
    let (mut model, factory) = setup();
    let id = factory.spawn("counter", &mut model).unwrap();

    let twin = factory.construct("counter", &mut model, id).unwrap();
    assert!(matches!(model.add_agent(twin), Err(SimError::DuplicateAgent { id: dup }) if dup == id));

    model.remove_agent(id).unwrap();
    assert!(matches!(model.remove_agent(id), Err(SimError::UnknownAgent { .. })));

    assert!(matches!(
        factory.construct("unicorn", &mut model, 99),
        Err(SimError::UnknownAgentType { .. })
    ));
}

#[test]
fn ids_are_never_reused() {
    let (mut model, factory) = setup();
    let first = factory.spawn("counter", &mut model).unwrap();
    model.remove_agent(first).unwrap();
    let second = factory.spawn("counter", &mut model).unwrap();
    assert!(second > first);
}

#[test]
fn create_new_starts_empty_at_tick_zero() {
    let catalog = TypeCatalog::build(vec![AgentTypeDef::new("counter")]).expect("catalog");
    let mut model = Model::create_new(10, 10, Arc::new(catalog));
    assert_eq!(model.agent_count(), 0);
    assert_eq!(model.current_tick(), 0);
    assert_eq!(model.clock.model_time().num_seconds(), 0);

    let events = model.step().unwrap();
    assert_eq!(model.current_tick(), 1);
    assert_eq!(model.clock.current_tick, 1);
    assert!(model.clock.model_time().num_seconds() > 0);
    assert!(matches!(events.last(), Some(SimEvent::TickCompleted { tick: 1, agent_count: 0 })));
}

#[test]
fn an_agent_with_the_largest_id_can_be_registered() {
    let (mut model, factory) = setup();
    let agent = factory.construct("counter", &mut model, AgentId::MAX).unwrap();
    assert_eq!(model.add_agent(agent).unwrap(), AgentId::MAX);
    assert!(model.contains(AgentId::MAX));

    model.step().unwrap();
    assert_eq!(steps(&model, AgentId::MAX), 1);
}
