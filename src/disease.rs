//! Per-agent infection records.

use serde::{Deserialize, Serialize};

/// Progression state of one strain within one agent.
///
/// Ordered by progression: a record only ever moves to a greater state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiseaseState {
    None,
    Susceptible,
    Infected,
    Recovered,
}

/// Infection record of a single strain, owned by the agent carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    strain: String,
    state: DiseaseState,
    /// Seconds; only meaningful once infected.
    time_since_infection: f64,
}

impl Disease {
    /// A record that has not progressed yet.
    pub fn new(strain: impl Into<String>) -> Self {
        Self {
            strain: strain.into(),
            state: DiseaseState::None,
            time_since_infection: 0.0,
        }
    }

    /// A freshly acquired infection.
    pub fn infection(strain: impl Into<String>) -> Self {
        let mut disease = Self::new(strain);
        disease.infect();
        disease
    }

    pub fn strain(&self) -> &str {
        &self.strain
    }

    pub fn state(&self) -> DiseaseState {
        self.state
    }

    pub fn time_since_infection(&self) -> f64 {
        self.time_since_infection
    }

    pub fn is_infected(&self) -> bool {
        self.state == DiseaseState::Infected
    }

    pub fn is_recovered(&self) -> bool {
        self.state == DiseaseState::Recovered
    }

    /// Advance the record's clock. Applies in every state.
    pub fn tick(&mut self, delta_secs: f64) {
        self.time_since_infection += delta_secs;
    }

    /// Move to [`DiseaseState::Infected`].
    ///
    /// Returns `false` and leaves the record untouched if it already reached
    /// infection or recovery.
    pub fn infect(&mut self) -> bool {
        self.advance_to(DiseaseState::Infected)
    }

    /// Move from [`DiseaseState::Infected`] to [`DiseaseState::Recovered`].
    pub fn recover(&mut self) -> bool {
        self.state == DiseaseState::Infected && self.advance_to(DiseaseState::Recovered)
    }

    /// Recover once the infection has lasted longer than `infectious_period`.
    pub fn progress(&mut self, infectious_period: f64) -> bool {
        self.time_since_infection > infectious_period && self.recover()
    }

    fn advance_to(&mut self, state: DiseaseState) -> bool {
        if state <= self.state {
            return false;
        }
        self.state = state;
        true
    }
}
