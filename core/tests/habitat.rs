//! Behaviour of the bundled habitat agent kinds.

use habitat_core::{
    agent::Agent,
    agents::{self, habitat, AtmosphereAgent, HumanAgent, PlumbingSystemAgent, StructureAgent},
    catalog::TypeCatalog,
    config::HabitatConfig,
    event::SimEvent,
    model::Model,
    types::AgentId,
};
use std::sync::Arc;

fn new_model(seed: u64) -> Model {
    let catalog = Arc::new(TypeCatalog::bundled().expect("bundled catalog"));
    Model::with_seed(100, 100, seed, catalog)
}

fn built(seed: u64) -> (Model, habitat::HabitatIds) {
    let mut model = new_model(seed);
    let ids = habitat::build(&mut model, &agents::default_factory(), &HabitatConfig::default_test())
        .expect("habitat");
    (model, ids)
}

fn oxygen(model: &Model, id: AgentId) -> f64 {
    model.agent_as::<AtmosphereAgent>(id).unwrap().oxygen().unwrap()
}

fn destroyed(events: &[SimEvent]) -> Vec<AgentId> {
    events
        .iter()
        .filter_map(|e| match e {
            SimEvent::AgentDestroyed { agent_id, .. } => Some(*agent_id),
            _ => None,
        })
        .collect()
}

fn step_failures(events: &[SimEvent]) -> Vec<(AgentId, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            SimEvent::AgentStepFailed { agent_id, error, .. } => Some((*agent_id, error.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn build_wires_the_habitat() {
    let (model, ids) = built(1);
    assert_eq!(model.agent_count(), 7);
    assert_eq!(ids.humans.len(), 4);

    let structure = model.agent_as::<StructureAgent>(ids.structure).unwrap();
    assert_eq!(structure.atmosphere().unwrap(), Some(ids.atmosphere));
    assert_eq!(structure.plumbing_system().unwrap(), Some(ids.plumbing_system));
    assert_eq!(oxygen(&model, ids.atmosphere), 21.2);

    for &id in &ids.humans {
        let human = model.agent_as::<HumanAgent>(id).unwrap();
        assert_eq!(human.structure().unwrap(), Some(ids.structure));
        assert_eq!(human.energy().unwrap(), 20_000.0);
        let mass = human.core().get_f64("mass").unwrap();
        assert!(mass > 20.0 && mass < 130.0, "implausible mass {mass}");
    }
}

#[test]
fn humans_breathe_metabolise_and_use_water() {
    let (mut model, ids) = built(2);
    let events = model.step().unwrap();
    assert!(step_failures(&events).is_empty(), "{events:?}");

    let per_tick = 1.0 / 24.0;
    let expected_oxygen = 21.2 - 4.0 * 0.08 * per_tick;
    assert!((oxygen(&model, ids.atmosphere) - expected_oxygen).abs() < 1e-9);

    let plumbing = model.agent_as::<PlumbingSystemAgent>(ids.plumbing_system).unwrap();
    let expected_waste = 4.0 * 10.0 * per_tick;
    assert!((plumbing.waste_water().unwrap() - expected_waste).abs() < 1e-9);
    assert!((plumbing.water().unwrap() - (1_000.0 - expected_waste)).abs() < 1e-9);

    for &id in &ids.humans {
        let energy = model.agent_as::<HumanAgent>(id).unwrap().energy().unwrap();
        assert!(energy < 20_000.0 && energy > 19_000.0, "energy {energy}");
    }
}

#[test]
fn plumbing_recycles_waste_water() {
    let (mut model, ids) = built(3);
    model.step().unwrap();
    let waste_before = model
        .agent_as::<PlumbingSystemAgent>(ids.plumbing_system)
        .unwrap()
        .waste_water()
        .unwrap();
    for &id in &ids.humans {
        model.remove_agent(id).unwrap();
    }

    model.step().unwrap();
    let plumbing = model.agent_as::<PlumbingSystemAgent>(ids.plumbing_system).unwrap();
    let expected = waste_before * (1.0 - 0.8 / 24.0);
    assert!((plumbing.waste_water().unwrap() - expected).abs() < 1e-9);
    let total = plumbing.water().unwrap() + plumbing.waste_water().unwrap();
    assert!((total - 1_000.0).abs() < 1e-9, "water is conserved");
}

#[test]
fn unbreathable_air_kills_the_crew() {
    let (mut model, ids) = built(4);
    model
        .agent_mut(ids.atmosphere)
        .unwrap()
        .core_mut()
        .set("oxygen", 10.0)
        .unwrap();

    let events = model.step().unwrap();
    assert_eq!(destroyed(&events), ids.humans);
    assert_eq!(model.agent_count(), 3);
    assert!(model.agents_of_type(HumanAgent::TYPE_NAME).is_empty());
}

#[test]
fn carbon_dioxide_above_the_limit_is_fatal() {
    let (mut model, ids) = built(5);
    model
        .agent_mut(ids.atmosphere)
        .unwrap()
        .core_mut()
        .set("carbon_dioxide", 6.0)
        .unwrap();
    let events = model.step().unwrap();
    assert_eq!(destroyed(&events).len(), 4);
}

#[test]
fn missing_atmosphere_is_fatal() {
    let (mut model, ids) = built(6);
    model.remove_agent(ids.atmosphere).unwrap();
    model.drain_events();
    let events = model.step().unwrap();
    assert_eq!(destroyed(&events), ids.humans);
}

#[test]
fn exhausted_humans_die_after_their_step() {
    let (mut model, ids) = built(7);
    let tired = ids.humans[0];
    model.agent_mut(tired).unwrap().core_mut().set("energy", 1.0).unwrap();

    let events = model.step().unwrap();
    assert_eq!(destroyed(&events), vec![tired]);
    // The tired human still breathed and used water this tick.
    let plumbing = model.agent_as::<PlumbingSystemAgent>(ids.plumbing_system).unwrap();
    assert!((plumbing.waste_water().unwrap() - 4.0 * 10.0 / 24.0).abs() < 1e-9);
}

#[test]
fn human_without_structure_fails_its_step() {
    let mut model = new_model(8);
    let factory = agents::default_factory();
    let human = factory.spawn(HumanAgent::TYPE_NAME, &mut model).unwrap();

    let events = model.step().unwrap();
    let failures = step_failures(&events);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, human);
    assert!(failures[0].1.contains("structure"));
    assert!(model.contains(human));
}

#[test]
fn human_in_destroyed_structure_fails_its_step() {
    let (mut model, ids) = built(9);
    model.remove_agent(ids.structure).unwrap();
    model.drain_events();
    let events = model.step().unwrap();
    assert_eq!(step_failures(&events).len(), 4);
    assert!(destroyed(&events).is_empty());
}

#[test]
fn human_without_plumbing_fails_before_breathing() {
    let (mut model, ids) = built(10);
    model
        .agent_mut(ids.structure)
        .unwrap()
        .core_mut()
        .set_agent_ref("plumbing_system", None)
        .unwrap();

    let events = model.step().unwrap();
    let failures = step_failures(&events);
    assert_eq!(failures.len(), 4);
    assert!(failures.iter().all(|(_, error)| error.contains("plumbing_system")));
    assert_eq!(oxygen(&model, ids.atmosphere), 21.2);
}

#[test]
fn crew_state_survives_a_snapshot() {
    let (mut model, ids) = built(11);
    model.run(5).unwrap();

    let restored =
        Model::load_from_db(&model.snapshot(), model.catalog().clone(), &agents::default_factory()).unwrap();
    for &id in &ids.humans {
        let before = model.agent_as::<HumanAgent>(id).unwrap();
        let after = restored.agent_as::<HumanAgent>(id).unwrap();
        for name in ["energy", "mass", "age", "height"] {
            assert_eq!(before.core().get(name).unwrap(), after.core().get(name).unwrap());
        }
        assert_eq!(after.structure().unwrap(), Some(ids.structure));
    }
    assert_eq!(oxygen(&restored, ids.atmosphere), oxygen(&model, ids.atmosphere));
}
