use crate::engine::Outcome;
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{collections::BTreeMap, fs, path::Path};

/// Observable measured once per run.
pub trait Obs {
    fn name(&self) -> &'static str;
    fn update(&mut self, outcome: &Outcome);
    fn report(&self) -> AccumulatorReport;
}

/// Ticks until the infection died out or the run was stopped.
#[derive(Default)]
pub struct Duration {
    acc: Accumulator,
}

impl Obs for Duration {
    fn name(&self) -> &'static str {
        "duration"
    }

    fn update(&mut self, outcome: &Outcome) {
        self.acc.add(outcome.ticks as f64);
    }

    fn report(&self) -> AccumulatorReport {
        self.acc.report()
    }
}

/// Recovered agents at the end of a run.
#[derive(Default)]
pub struct FinalRecovered {
    acc: Accumulator,
}

impl Obs for FinalRecovered {
    fn name(&self) -> &'static str {
        "final_recovered"
    }

    fn update(&mut self, outcome: &Outcome) {
        self.acc.add(outcome.final_census().recovered as f64);
    }

    fn report(&self) -> AccumulatorReport {
        self.acc.report()
    }
}

#[derive(Default)]
pub struct PeakInfected {
    acc: Accumulator,
}

impl Obs for PeakInfected {
    fn name(&self) -> &'static str {
        "peak_infected"
    }

    fn update(&mut self, outcome: &Outcome) {
        self.acc.add(outcome.peak_infected().0 as f64);
    }

    fn report(&self) -> AccumulatorReport {
        self.acc.report()
    }
}

#[derive(Debug, Serialize)]
struct Results {
    n_runs: usize,
    n_extinct: usize,
    observables: BTreeMap<&'static str, AccumulatorReport>,
}

pub struct Analyzer {
    n_runs: usize,
    n_extinct: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Duration::default()),
            Box::new(FinalRecovered::default()),
            Box::new(PeakInfected::default()),
        ];
        Self {
            n_runs: 0,
            n_extinct: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_outcome(&mut self, outcome: &Outcome) {
        self.n_runs += 1;
        if outcome.extinct {
            self.n_extinct += 1;
        }
        for obs in &mut self.obs_ptr_vec {
            obs.update(outcome);
        }
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();

        let results = Results {
            n_runs: self.n_runs,
            n_extinct: self.n_extinct,
            observables: self
                .obs_ptr_vec
                .iter()
                .map(|obs| (obs.name(), obs.report()))
                .collect(),
        };
        let contents = toml::to_string_pretty(&results).context("failed to serialize results")?;

        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}
