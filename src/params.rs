//! Model parameters.

use crate::random::SeedingSampler;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Seconds in one day.
pub const DAY_SECS: f64 = 24.0 * 3600.0;

/// World parameters.
///
/// Every field has a default, so a partial `[world]` table is enough.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Number of lattice rows.
    pub rows: usize,
    /// Number of lattice columns.
    pub cols: usize,

    /// Simulated seconds per tick.
    pub time_step_secs: f64,
    /// Clock value before the first tick.
    pub start_time: NaiveDateTime,

    /// Mosquito density recorded on every cell.
    pub avg_vector_density: f64,
    /// Mean number of humans seeded per cell.
    pub avg_human_density: f64,
    /// Sampler used to draw the number of humans seeded per cell.
    pub seeding_sampler: SeedingSampler,

    /// Probability per tick that a resident human is bitten by the cell's resident vector.
    pub contact_bite_rate: f64,

    /// Human parameters.
    pub human: HumanParams,
    /// Mosquito parameters.
    pub vector: VectorParams,
}

impl Params {
    /// Parameters for a `rows x cols` lattice, species defaults elsewhere.
    pub fn new(
        rows: usize,
        cols: usize,
        time_step_secs: f64,
        avg_vector_density: f64,
        avg_human_density: f64,
    ) -> Self {
        Self {
            rows,
            cols,
            time_step_secs,
            avg_vector_density,
            avg_human_density,
            ..Self::default()
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            rows: 50,
            cols: 50,
            time_step_secs: 3600.0,
            start_time: NaiveDateTime::default(),
            avg_vector_density: 0.5,
            avg_human_density: 2.0,
            seeding_sampler: SeedingSampler::default(),
            contact_bite_rate: 0.01,
            human: HumanParams::default(),
            vector: VectorParams::default(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanParams {
    /// Seconds an infection stays infectious before recovery.
    pub infectious_period: f64,
    /// Humans stay home while the clock hour is below this value.
    pub night_end_hour: u32,
    /// Daytime probability of returning home instead of wandering.
    pub prob_return_home: f64,
}

impl Default for HumanParams {
    fn default() -> Self {
        Self {
            infectious_period: 7.0 * DAY_SECS,
            night_end_hour: 8,
            prob_return_home: 0.5,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorParams {
    /// Age in seconds past which a mosquito dies.
    pub lifespan_max: f64,
    /// Probability per tick that a mosquito sharing a cell with humans bites.
    pub bite_rate: f64,
    /// Probability that a mosquito survives a feeding encounter.
    pub encounter_survival_rate: f64,
    /// Infectious period in seconds; mosquitoes stay infectious until death when absent.
    pub infectious_period: Option<f64>,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            lifespan_max: 28.0 * DAY_SECS,
            bite_rate: 0.01,
            encounter_survival_rate: 0.5,
            infectious_period: None,
        }
    }
}
