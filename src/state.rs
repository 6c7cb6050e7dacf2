//! Application state shared by every handler: difficulty table, template bank,
//! timing and the moment tracker. Immutable after startup.

use tracing::{info, instrument};

use crate::bank::TemplateBank;
use crate::config::{load_config_from_env, AppConfig, TimingCfg};
use crate::domain::{Difficulty, DifficultyTable};
use crate::error::BankError;
use crate::tracker::Tracker;

pub struct AppState {
    pub difficulties: DifficultyTable,
    pub bank: TemplateBank,
    pub timing: TimingCfg,
    pub tracker: Tracker,
}

impl AppState {
    /// Build state from env: load config, validate the template bank, init the tracker.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, BankError> {
        Self::from_config(load_config_from_env())
    }

    pub fn from_config(cfg: AppConfig) -> Result<Self, BankError> {
        let bank = TemplateBank::with_config(&cfg.templates)?;
        let difficulties = cfg.difficulty_table();
        for d in Difficulty::ALL {
            let c = difficulties.get(d);
            info!(target: "calm_space", difficulty = d.as_str(), rounds = c.rounds, grid = c.grid_size, targets = c.targets, time_limit = c.time_limit_secs, "Difficulty configured");
        }
        let tracker = Tracker::from_config(&cfg.tracker);
        Ok(Self { difficulties, bank, timing: cfg.timing, tracker })
    }
}
