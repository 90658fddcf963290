use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Runs batches of outbreaks inside a simulation directory.
///
/// The directory holds `config.toml` and receives `results.toml`.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn run_batch(&self) -> Result<()> {
        let mut analyzer = Analyzer::new();

        for run_idx in 0..self.cfg.outbreak.n_runs {
            let seed = self.cfg.outbreak.seed.wrapping_add(run_idx as u64);
            log::info!("starting run {run_idx} with seed {seed}");

            let mut engine = Engine::generate_initial_condition(self.cfg.clone(), seed)
                .with_context(|| format!("failed to generate initial condition of run {run_idx}"))?;
            let outcome = engine.perform_simulation();

            let (peak, peak_tick) = outcome.peak_infected();
            log::info!(
                "run {run_idx} ended after {} ticks (extinct: {}), peak of {peak} infected at tick {peak_tick}, {} recovered",
                outcome.ticks,
                outcome.extinct,
                outcome.final_census().recovered
            );

            analyzer.add_outcome(&outcome);
        }

        let results_file = self.results_file();
        analyzer
            .save_results(&results_file)
            .context("failed to save results")?;
        log::info!("saved {results_file:?}");

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let results_file = self.results_file();
        if results_file.exists() {
            fs::remove_file(&results_file)
                .with_context(|| format!("failed to remove {results_file:?}"))?;
            log::info!("removed {results_file:?}");
        }
        Ok(())
    }

    fn results_file(&self) -> PathBuf {
        self.sim_dir.join("results.toml")
    }
}
