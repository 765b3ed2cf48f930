//! habitat-runner: headless runner for the habitat life-support simulation.
//!
//! Usage:
//!   habitat-runner --seed 12345 --ticks 240 --db run.db
//!   habitat-runner --db run.db --resume run-12345-1700000000 --ticks 24
//!   habitat-runner --seed 12345 --ipc-mode

use anyhow::Result;
use habitat_core::{
    agent::AgentState,
    agents::{self, AtmosphereAgent, HumanAgent, PlumbingSystemAgent},
    catalog::TypeCatalog,
    config::HabitatConfig,
    engine::SimEngine,
    store::SimStore,
    types::Tick,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick { count: u64 },
    Snapshot,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    tick:   Tick,
    agents: Vec<AgentState>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 240u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let resume = string_arg(&args, "--resume");

    if !ipc_mode {
        println!("Habitat life support: habitat-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        if let Some(run_id) = resume {
            println!("  resume:    {run_id}");
        }
        println!();
    }

    let config = HabitatConfig::load(data_dir)?;
    let store = SimStore::open(db)?;
    store.migrate()?;

    let mut engine = match resume {
        Some(run_id) => {
            let catalog = Arc::new(store.load_type_catalog()?);
            SimEngine::resume(run_id, store, catalog, agents::default_factory())?
                .with_snapshot_interval(config.snapshot_interval)
        }
        None => {
            let catalog = Arc::new(TypeCatalog::load(&format!("{data_dir}/agent_types.json"))?);
            if store.agent_type_defs()?.is_empty() {
                store.insert_type_catalog(&catalog)?;
            }
            let run_id = format!("run-{seed}-{}", unix_time());
            store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
            SimEngine::build(run_id, seed, &config, catalog, store)?
        }
    };

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        engine.run_ticks(ticks)?;
        if engine.current_tick() % engine.snapshot_interval() != 0 {
            engine.take_snapshot()?;
        }
        log::info!("Run {} finished at tick {}", engine.run_id, engine.current_tick());
        print_summary(&engine, ticks)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                engine.run_ticks(count)?;
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
            IpcCommand::GetState => {
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
            IpcCommand::Snapshot => {
                let snapshot = engine.take_snapshot()?;
                let reply = serde_json::json!({
                    "snapshot_id": snapshot.snapshot_id,
                    "tick": snapshot.tick,
                });
                writeln!(stdout, "{}", reply)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn build_ui_state(engine: &SimEngine) -> UiState {
    UiState {
        tick:   engine.current_tick(),
        agents: engine.model.get_agents().into_iter().map(AgentState::of).collect(),
    }
}

fn print_summary(engine: &SimEngine, ticks: u64) -> Result<()> {
    let model = &engine.model;
    let crew = model.agents_of_type(HumanAgent::TYPE_NAME);
    let destroyed = engine.store.event_count(&engine.run_id, "agent_destroyed")?;
    let failures = engine.store.event_count(&engine.run_id, "agent_step_failed")?;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", engine.run_id);
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", model.current_tick());
    println!("  model time:     {}h", model.clock.model_time().num_hours());
    println!("  agents:         {}", model.agent_count());
    println!("  crew alive:     {}", crew.len());
    println!("  destroyed:      {destroyed}");
    println!("  step failures:  {failures}");

    for id in model.agents_of_type(AtmosphereAgent::TYPE_NAME) {
        if let Some(atmosphere) = model.agent_as::<AtmosphereAgent>(id) {
            println!(
                "  atmosphere {id}:   O2 {:.2} kPa | CO2 {:.2} kPa",
                atmosphere.oxygen()?,
                atmosphere.carbon_dioxide()?
            );
        }
    }
    for id in model.agents_of_type(PlumbingSystemAgent::TYPE_NAME) {
        if let Some(plumbing) = model.agent_as::<PlumbingSystemAgent>(id) {
            println!(
                "  plumbing {id}:     water {:.1} kg | waste {:.1} kg",
                plumbing.water()?,
                plumbing.waste_water()?
            );
        }
    }

    println!();
    println!("=== SNAPSHOTS ===");
    for (snapshot_id, tick) in engine.store.snapshot_ids(&engine.run_id)? {
        println!("  tick {tick:>6} | {snapshot_id}");
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn unix_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
