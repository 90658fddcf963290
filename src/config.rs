use crate::params::Params;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lattice, seeding and species parameters.
    pub world: Params,
    /// Outbreak scenario and batch settings.
    pub outbreak: OutbreakConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutbreakConfig {
    /// Strain carried by patient zero.
    pub strain: String,
    /// Seed of the first run; run `i` uses `seed + i`.
    pub seed: u64,
    /// Number of replicate runs.
    pub n_runs: usize,
    /// Runs still infected after this many ticks are stopped.
    pub max_ticks: usize,
    /// Number of ticks between progress reports.
    pub ticks_per_report: usize,
}

impl Default for OutbreakConfig {
    fn default() -> Self {
        Self {
            strain: "ACGT".to_string(),
            seed: 55,
            n_runs: 1,
            max_ticks: 100_000,
            ticks_per_report: 24,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        check_num(world.rows, 1..=10_000).context("invalid number of rows")?;
        check_num(world.cols, 1..=10_000).context("invalid number of columns")?;
        check_num(world.time_step_secs, 1e-3..=86_400.0).context("invalid time step")?;
        check_num(world.avg_vector_density, 0.0..1_000.0).context("invalid vector density")?;
        check_num(world.avg_human_density, 0.0..100.0).context("invalid human density")?;
        check_num(world.contact_bite_rate, 0.0..=1.0).context("invalid contact bite rate")?;

        let human = &world.human;
        check_num(human.infectious_period, 0.0..).context("invalid human infectious period")?;
        check_num(human.night_end_hour, 0..=24).context("invalid night end hour")?;
        check_num(human.prob_return_home, 0.0..=1.0)
            .context("invalid return home probability")?;

        let vector = &world.vector;
        check_num(vector.lifespan_max, f64::MIN_POSITIVE..).context("invalid vector lifespan")?;
        check_num(vector.bite_rate, 0.0..=1.0).context("invalid bite rate")?;
        check_num(vector.encounter_survival_rate, 0.0..=1.0)
            .context("invalid encounter survival rate")?;
        if let Some(period) = vector.infectious_period {
            check_num(period, 0.0..).context("invalid vector infectious period")?;
        }

        let outbreak = &self.outbreak;
        if outbreak.strain.is_empty() {
            bail!("strain must not be empty");
        }
        check_num(outbreak.n_runs, 1..10_000).context("invalid number of runs")?;
        check_num(outbreak.max_ticks, 1..=10_000_000).context("invalid maximum number of ticks")?;
        check_num(outbreak.ticks_per_report, 1..).context("invalid number of ticks per report")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tables_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [world]
            rows = 10
            cols = 12
            seeding_sampler = "threshold"
            start_time = "2012-06-01T06:00:00"

            [world.vector]
            bite_rate = 0.02

            [outbreak]
            n_runs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.world.rows, 10);
        assert_eq!(config.world.cols, 12);
        assert_eq!(config.world.vector.bite_rate, 0.02);
        assert_eq!(config.world.vector.encounter_survival_rate, 0.5);
        assert_eq!(config.world.human, Default::default());
        assert_eq!(config.outbreak.n_runs, 3);
        assert_eq!(config.outbreak.strain, "ACGT");
        config.validate().unwrap();
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = Config::default();
        config.world.rows = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.world.vector.bite_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.outbreak.strain.clear();
        assert!(config.validate().is_err());
    }
}
