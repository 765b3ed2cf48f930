use crate::types::Tick;
use serde::{Deserialize, Serialize};

/// Runner-level description of a habitat: grid size, step length, and the
/// initial contents of its single structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitatConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_step_seconds")]
    pub step_seconds: i64,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: Tick,
    pub humans: usize,
    /// kPa
    pub initial_oxygen: f64,
    /// kPa
    pub initial_carbon_dioxide: f64,
    /// kg
    pub initial_water: f64,
}

fn default_step_seconds() -> i64 {
    crate::clock::DEFAULT_STEP_SECONDS
}

fn default_snapshot_interval() -> Tick {
    24
}

impl HabitatConfig {
    /// Read `{data_dir}/habitat.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/habitat.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: HabitatConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.step_seconds <= 0 {
            anyhow::bail!("step_seconds must be positive, got {}", self.step_seconds);
        }
        if self.snapshot_interval == 0 {
            anyhow::bail!("snapshot_interval must be at least 1");
        }
        if self.initial_oxygen < 0.0 || self.initial_carbon_dioxide < 0.0 || self.initial_water < 0.0 {
            anyhow::bail!("initial resource levels must be non-negative");
        }
        Ok(())
    }

    /// Small habitat for tests: four humans, one-hour steps.
    pub fn default_test() -> Self {
        Self {
            width: 100,
            height: 100,
            step_seconds: 3_600,
            snapshot_interval: 24,
            humans: 4,
            initial_oxygen: 21.2,
            initial_carbon_dioxide: 0.04,
            initial_water: 1_000.0,
        }
    }
}
