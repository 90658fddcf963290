//! Agents and their per-tick behavior.
//!
//! An agent never touches the lattice or other agents directly while it
//! behaves. [`Agent::behave`] mutates only the agent itself and returns the
//! [`Effect`]s the world must apply: moves, bites and deaths.

use crate::disease::Disease;
use crate::params::Params;
use crate::random::RandomSource;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an agent, unique within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    pub fn new(uid: u64) -> Self {
        Self(uid)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Archetype-specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentKind {
    /// A human returning to a fixed home.
    Human { home_row: usize, home_col: usize },
    /// A mosquito of the given age in seconds.
    Mosquito { age: f64 },
}

/// Change requested by an agent during its tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Move to a possibly out-of-range coordinate; the world clamps it.
    MoveTo { row: i64, col: i64 },
    /// Bite a human sharing the agent's cell.
    Bite { host: AgentId },
    /// Leave the simulation for good.
    Die(Death),
}

/// Cause of an agent leaving the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Death {
    OldAge,
    KilledFeeding,
}

/// What an agent can observe about its cell while it behaves.
#[derive(Debug, Clone, Copy)]
pub struct Surroundings<'a> {
    /// Hour of day of the world clock.
    pub hour: u32,
    /// Humans committed to the agent's cell at the start of its cell's pass.
    pub hosts: &'a [AgentId],
}

/// Species constants and the distributions derived from them.
#[derive(Debug)]
pub struct Traits {
    pub human_infectious_period: f64,
    pub night_end_hour: u32,
    return_home: Bernoulli,

    pub vector_infectious_period: Option<f64>,
    pub lifespan_max: f64,
    bite: Bernoulli,
    survival: Bernoulli,
    vector_age: Uniform<f64>,

    contact_bite: Bernoulli,
}

impl Traits {
    pub fn new(params: &Params) -> Result<Self> {
        let human = &params.human;
        let vector = &params.vector;
        Ok(Self {
            human_infectious_period: human.infectious_period,
            night_end_hour: human.night_end_hour,
            return_home: Bernoulli::new(human.prob_return_home)
                .context("invalid return home probability")?,

            vector_infectious_period: vector.infectious_period,
            lifespan_max: vector.lifespan_max,
            bite: Bernoulli::new(vector.bite_rate).context("invalid bite rate")?,
            survival: Bernoulli::new(vector.encounter_survival_rate)
                .context("invalid encounter survival rate")?,
            vector_age: Uniform::new(0.0, vector.lifespan_max)
                .context("invalid maximum lifespan")?,

            contact_bite: Bernoulli::new(params.contact_bite_rate)
                .context("invalid contact bite rate")?,
        })
    }

    /// Draw the age of a newly created mosquito, uniform over its lifespan.
    pub fn sample_vector_age(&self, rng: &mut RandomSource) -> f64 {
        self.vector_age.sample(rng)
    }

    /// Roll whether a resident human is bitten by its cell's resident vector.
    pub fn roll_contact_bite(&self, rng: &mut RandomSource) -> bool {
        self.contact_bite.sample(rng)
    }
}

/// A mobile agent on the lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    row: usize,
    col: usize,
    kind: AgentKind,
    /// Records in exposure order, unique by strain.
    infections: Vec<Disease>,
}

impl Agent {
    /// A human whose home is also its starting position.
    pub fn human(id: AgentId, home_row: usize, home_col: usize) -> Self {
        Self {
            id,
            row: home_row,
            col: home_col,
            kind: AgentKind::Human { home_row, home_col },
            infections: Vec::new(),
        }
    }

    pub fn mosquito(id: AgentId, row: usize, col: usize, age: f64) -> Self {
        Self {
            id,
            row,
            col,
            kind: AgentKind::Mosquito { age },
            infections: Vec::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn kind(&self) -> &AgentKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, AgentKind::Human { .. })
    }

    pub fn is_mosquito(&self) -> bool {
        matches!(self.kind, AgentKind::Mosquito { .. })
    }

    pub fn diseases(&self) -> &[Disease] {
        &self.infections
    }

    /// Records can only be moved forward through their own methods.
    pub fn diseases_mut(&mut self) -> &mut [Disease] {
        &mut self.infections
    }

    pub(crate) fn set_position(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
    }

    pub fn is_infected(&self) -> bool {
        self.infections.iter().any(Disease::is_infected)
    }

    pub fn is_recovered(&self) -> bool {
        !self.is_infected() && self.infections.iter().any(Disease::is_recovered)
    }

    /// Never infected by any strain.
    pub fn is_susceptible(&self) -> bool {
        self.strain().is_none()
    }

    /// Most recently acquired strain that is still infectious.
    pub fn infectious_strain(&self) -> Option<&str> {
        self.infections
            .iter()
            .rev()
            .find(|disease| disease.is_infected())
            .map(Disease::strain)
    }

    /// Strain the agent is best described by: the most recent infectious
    /// one, otherwise the most recent one it recovered from.
    pub fn strain(&self) -> Option<&str> {
        self.infectious_strain().or_else(|| {
            self.infections
                .iter()
                .rev()
                .find(|disease| disease.is_recovered())
                .map(Disease::strain)
        })
    }

    /// Catch a strain. Strains already carried, in any state, are ignored.
    pub fn receive_disease(&mut self, strain: &str) -> bool {
        if self.infections.iter().any(|disease| disease.strain() == strain) {
            return false;
        }
        self.infections.push(Disease::infection(strain));
        log::debug!("{} {} became infectious with {strain}", self.kind_name(), self.id);
        true
    }

    /// Be bitten by `vector`: each side catches what the other carries.
    pub fn receive_bite(&mut self, vector: &mut Agent) {
        debug_assert!(vector.is_mosquito(), "only mosquitoes bite");
        if let Some(strain) = vector.infectious_strain() {
            self.receive_disease(strain);
        }
        if let Some(strain) = self.infectious_strain() {
            vector.receive_disease(strain);
        }
    }

    /// Run one tick of the agent's own behavior.
    pub fn behave(
        &mut self,
        delta_secs: f64,
        surroundings: &Surroundings<'_>,
        traits: &Traits,
        rng: &mut RandomSource,
    ) -> Vec<Effect> {
        let infectious_period = match self.kind {
            AgentKind::Human { .. } => Some(traits.human_infectious_period),
            AgentKind::Mosquito { .. } => traits.vector_infectious_period,
        };
        self.advance_infections(delta_secs, infectious_period);

        match &mut self.kind {
            AgentKind::Human { home_row, home_col } => {
                let home = Effect::MoveTo {
                    row: *home_row as i64,
                    col: *home_col as i64,
                };
                // Night keeps everyone home without consuming a draw.
                if surroundings.hour < traits.night_end_hour || traits.return_home.sample(rng) {
                    return vec![home];
                }
                let row = levy_flight(self.row, rng);
                let col = levy_flight(self.col, rng);
                vec![Effect::MoveTo { row, col }]
            }
            AgentKind::Mosquito { age } => {
                *age += delta_secs;
                if *age > traits.lifespan_max {
                    return vec![Effect::Die(Death::OldAge)];
                }
                if surroundings.hosts.is_empty() {
                    let row = levy_flight(self.row, rng);
                    let col = levy_flight(self.col, rng);
                    return vec![Effect::MoveTo { row, col }];
                }
                if !traits.bite.sample(rng) {
                    return Vec::new();
                }
                let Some(&host) = surroundings.hosts.choose(rng) else {
                    return Vec::new();
                };
                let mut effects = vec![Effect::Bite { host }];
                if !traits.survival.sample(rng) {
                    effects.push(Effect::Die(Death::KilledFeeding));
                }
                effects
            }
        }
    }

    fn advance_infections(&mut self, delta_secs: f64, infectious_period: Option<f64>) {
        for disease in &mut self.infections {
            disease.tick(delta_secs);
            if let Some(period) = infectious_period {
                if disease.progress(period) {
                    log::debug!(
                        "{} {} recovered from {}",
                        self.kind.name(),
                        self.id,
                        disease.strain()
                    );
                }
            }
        }
    }
}

impl AgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Human { .. } => "human",
            AgentKind::Mosquito { .. } => "mosquito",
        }
    }
}

/// Jump along one axis from `start`.
///
/// Direction is a fair coin. The step length counts how many times a
/// threshold starting at 0.5 can be halved while a single uniform draw stays
/// below it, so most jumps are short and a few are long. The result may lie
/// outside the lattice.
pub fn levy_flight(start: usize, rng: &mut RandomSource) -> i64 {
    let direction = if rng.next() < 0.5 { 1 } else { -1 };
    let sample = rng.next();
    let mut threshold = 0.5;
    let mut count = 0;
    while sample < threshold {
        count += 1;
        threshold /= 2.0;
    }
    start as i64 + direction * count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::DiseaseState;

    fn traits_with(update: impl FnOnce(&mut Params)) -> Traits {
        let mut params = Params::default();
        update(&mut params);
        Traits::new(&params).unwrap()
    }

    #[test]
    fn levy_flight_is_mostly_short() {
        let mut rng = RandomSource::seeded(5);
        let n = 10_000;
        let mut stays = 0;
        for _ in 0..n {
            let pos = levy_flight(100, &mut rng);
            if pos == 100 {
                stays += 1;
            }
            assert!((0..=200).contains(&pos));
        }
        let frac = stays as f64 / n as f64;
        assert!((frac - 0.5).abs() < 0.03, "fraction was {frac}");
    }

    #[test]
    fn levy_flight_can_leave_the_lattice() {
        let mut rng = RandomSource::seeded(9);
        let min = (0..10_000).map(|_| levy_flight(0, &mut rng)).min().unwrap();
        assert!(min < 0);
    }

    #[test]
    fn same_strain_is_caught_once() {
        let mut agent = Agent::human(AgentId::new(1), 0, 0);
        assert!(agent.is_susceptible());
        assert!(agent.receive_disease("ACGT"));
        assert!(!agent.receive_disease("ACGT"));
        assert_eq!(agent.diseases().len(), 1);
        assert!(agent.is_infected());
        assert!(!agent.is_susceptible());
    }

    #[test]
    fn recovered_strain_blocks_reinfection() {
        let mut agent = Agent::human(AgentId::new(1), 0, 0);
        agent.receive_disease("ACGT");
        agent.diseases_mut()[0].recover();
        assert!(agent.is_recovered());
        assert!(!agent.receive_disease("ACGT"));
        assert!(agent.is_recovered());
    }

    #[test]
    fn strain_prefers_the_latest_infectious_one() {
        let mut agent = Agent::human(AgentId::new(1), 0, 0);
        agent.receive_disease("A");
        agent.receive_disease("B");
        assert_eq!(agent.strain(), Some("B"));

        agent.diseases_mut()[1].recover();
        assert_eq!(agent.strain(), Some("A"));
        assert!(!agent.is_recovered());

        agent.diseases_mut()[0].recover();
        assert_eq!(agent.strain(), Some("B"));
        assert!(agent.is_recovered());
    }

    #[test]
    fn bite_transmits_both_ways() {
        let mut host = Agent::human(AgentId::new(1), 0, 0);
        let mut vector = Agent::mosquito(AgentId::new(2), 0, 0, 0.0);
        vector.receive_disease("ACGT");
        host.receive_bite(&mut vector);
        assert!(host.is_infected());

        let mut host = Agent::human(AgentId::new(3), 0, 0);
        let mut vector = Agent::mosquito(AgentId::new(4), 0, 0, 0.0);
        host.receive_disease("ACGT");
        host.receive_bite(&mut vector);
        assert!(vector.is_infected());
        assert_eq!(vector.infectious_strain(), Some("ACGT"));
    }

    #[test]
    fn bite_between_healthy_agents_changes_nothing() {
        let mut host = Agent::human(AgentId::new(1), 0, 0);
        let mut vector = Agent::mosquito(AgentId::new(2), 0, 0, 0.0);
        host.receive_bite(&mut vector);
        assert!(host.is_susceptible());
        assert!(vector.is_susceptible());
    }

    #[test]
    fn human_goes_home_at_night() {
        let traits = traits_with(|_| {});
        let mut rng = RandomSource::seeded(1);
        let mut human = Agent::human(AgentId::new(1), 4, 6);
        human.set_position(10, 12);
        let surroundings = Surroundings {
            hour: 3,
            hosts: &[],
        };
        let effects = human.behave(3600.0, &surroundings, &traits, &mut rng);
        assert_eq!(effects, vec![Effect::MoveTo { row: 4, col: 6 }]);
    }

    #[test]
    fn human_recovers_after_infectious_period() {
        let traits = traits_with(|params| params.human.infectious_period = 7200.0);
        let mut rng = RandomSource::seeded(1);
        let mut human = Agent::human(AgentId::new(1), 0, 0);
        human.receive_disease("ACGT");
        let surroundings = Surroundings {
            hour: 0,
            hosts: &[],
        };
        for _ in 0..2 {
            human.behave(3600.0, &surroundings, &traits, &mut rng);
            assert!(human.is_infected());
        }
        human.behave(3600.0, &surroundings, &traits, &mut rng);
        assert!(human.is_recovered());
        assert_eq!(human.diseases()[0].state(), DiseaseState::Recovered);
    }

    #[test]
    fn mosquito_dies_of_old_age() {
        let traits = traits_with(|_| {});
        let mut rng = RandomSource::seeded(1);
        let mut vector = Agent::mosquito(AgentId::new(1), 0, 0, traits.lifespan_max - 1.0);
        let surroundings = Surroundings {
            hour: 12,
            hosts: &[],
        };
        let effects = vector.behave(3600.0, &surroundings, &traits, &mut rng);
        assert_eq!(effects, vec![Effect::Die(Death::OldAge)]);
    }

    #[test]
    fn mosquito_without_hosts_flies() {
        let traits = traits_with(|_| {});
        let mut rng = RandomSource::seeded(1);
        let mut vector = Agent::mosquito(AgentId::new(1), 5, 5, 0.0);
        let surroundings = Surroundings {
            hour: 12,
            hosts: &[],
        };
        let effects = vector.behave(3600.0, &surroundings, &traits, &mut rng);
        assert!(matches!(effects.as_slice(), [Effect::MoveTo { .. }]));
    }

    #[test]
    fn hungry_mosquito_bites_and_may_die() {
        let traits = traits_with(|params| {
            params.vector.bite_rate = 1.0;
            params.vector.encounter_survival_rate = 0.0;
        });
        let mut rng = RandomSource::seeded(1);
        let mut vector = Agent::mosquito(AgentId::new(1), 0, 0, 0.0);
        let hosts = [AgentId::new(7)];
        let surroundings = Surroundings {
            hour: 12,
            hosts: &hosts,
        };
        let effects = vector.behave(3600.0, &surroundings, &traits, &mut rng);
        assert_eq!(
            effects,
            vec![
                Effect::Bite {
                    host: AgentId::new(7)
                },
                Effect::Die(Death::KilledFeeding)
            ]
        );
    }

    #[test]
    fn mosquitoes_stay_infectious_by_default() {
        let traits = traits_with(|_| {});
        let mut rng = RandomSource::seeded(1);
        let mut vector = Agent::mosquito(AgentId::new(1), 0, 0, 0.0);
        vector.receive_disease("ACGT");
        let surroundings = Surroundings {
            hour: 12,
            hosts: &[],
        };
        for _ in 0..24 * 14 {
            vector.behave(3600.0, &surroundings, &traits, &mut rng);
        }
        assert!(vector.is_infected());
    }
}
