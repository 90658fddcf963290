//! The lattice, its clock and the per-step orchestration.

use crate::agent::{Agent, AgentId, Effect, Surroundings, Traits};
use crate::cell::{Cell, CellStatus, Census, Population};
use crate::params::Params;
use crate::random::{RandomSource, ResidentSampler};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use rand::Rng;

/// A simulation: lattice of cells, population, clock and random stream.
///
/// Each step runs three phases: every cell ticks its committed inhabitants,
/// then all staged exits and all staged entrances are committed, then the
/// clock advances.
#[derive(Debug)]
pub struct World {
    params: Params,
    traits: Traits,
    rng: RandomSource,

    clock: NaiveDateTime,
    time_step: TimeDelta,
    ticks: usize,

    /// Row-major.
    cells: Vec<Cell>,
    population: Population,
    next_uid: u64,
}

impl World {
    /// Construct and seed a world from an OS-seeded random stream.
    pub fn new(params: Params) -> Result<Self> {
        let rng = RandomSource::from_os_rng()?;
        Self::with_rng(params, rng)
    }

    /// Construct and seed a world from a fixed seed.
    pub fn seeded(params: Params, seed: u64) -> Result<Self> {
        Self::with_rng(params, RandomSource::seeded(seed))
    }

    /// Construct and seed a world drawing from `rng`.
    ///
    /// # Panics
    /// If the lattice has no rows or no columns.
    pub fn with_rng(params: Params, rng: RandomSource) -> Result<Self> {
        assert!(
            params.rows > 0 && params.cols > 0,
            "lattice must have positive dimensions, got {}x{}",
            params.rows,
            params.cols
        );

        let traits = Traits::new(&params).context("failed to construct traits")?;
        let time_step = TimeDelta::try_milliseconds((params.time_step_secs * 1000.0).round() as i64)
            .context("time step is out of range")?;

        let mut world = Self {
            clock: params.start_time,
            traits,
            rng,
            time_step,
            ticks: 0,
            cells: Vec::with_capacity(params.rows * params.cols),
            population: Population::new(),
            next_uid: 1,
            params,
        };
        world.populate().context("failed to populate world")?;

        Ok(world)
    }

    fn populate(&mut self) -> Result<()> {
        let sampler =
            ResidentSampler::new(self.params.seeding_sampler, self.params.avg_human_density)?;

        for row in 0..self.params.rows {
            for col in 0..self.params.cols {
                let vector = self.new_mosquito(row, col);
                let mut cell = Cell::new(row, col, self.params.avg_vector_density, vector);
                for _ in 0..sampler.sample(&mut self.rng) {
                    let id = self.next_id();
                    self.population.insert(id, Agent::human(id, row, col));
                    cell.enter(id);
                }
                self.cells.push(cell);
            }
        }
        self.commit_migrations();

        log::info!(
            "seeded {} humans on a {}x{} lattice",
            self.population.len(),
            self.params.rows,
            self.params.cols
        );
        Ok(())
    }

    /// Reset the random stream.
    pub fn seed_rand(&mut self, seed: u64) {
        self.rng.seed(seed);
    }

    /// Advance one time step.
    pub fn tick(&mut self) {
        for idx in 0..self.cells.len() {
            self.tick_cell(idx);
        }
        self.commit_migrations();

        self.clock += self.time_step;
        self.ticks += 1;
    }

    /// Apply every staged exit on the lattice, then every staged entrance.
    pub fn commit_migrations(&mut self) {
        for cell in &mut self.cells {
            cell.do_exits();
        }
        for cell in &mut self.cells {
            cell.do_entrances();
        }
    }

    fn tick_cell(&mut self, idx: usize) {
        let residents = self.cells[idx].inhabitants().to_vec();
        if residents.is_empty() {
            return;
        }
        let hosts = self.cells[idx].hosts(&self.population);
        let hour = self.clock.hour();
        let delta_secs = self.params.time_step_secs;

        for id in residents {
            // Taken out while it behaves so bites can borrow the host.
            let Some(mut agent) = self.population.remove(&id) else {
                continue;
            };

            if agent.is_human() && self.traits.roll_contact_bite(&mut self.rng) {
                self.feed_resident_vector(idx, &mut agent);
            }

            let surroundings = Surroundings {
                hour,
                hosts: &hosts,
            };
            let effects = agent.behave(delta_secs, &surroundings, &self.traits, &mut self.rng);

            if self.apply(&mut agent, effects) {
                self.population.insert(id, agent);
            }
        }
    }

    fn feed_resident_vector(&mut self, idx: usize, host: &mut Agent) {
        host.receive_bite(self.cells[idx].resident_vector_mut());
        if !self.cells[idx].resident_vector().is_infected() {
            return;
        }

        let (row, col) = (self.cells[idx].row(), self.cells[idx].col());
        let fresh = self.new_mosquito(row, col);
        let released = self.cells[idx].replace_resident_vector(fresh);
        let id = released.id();
        self.cells[idx].enter(id);
        self.population.insert(id, released);
        log::debug!("released infected mosquito {id} at ({row}, {col})");
    }

    /// Apply an agent's effects. Returns whether it is still alive.
    fn apply(&mut self, agent: &mut Agent, effects: Vec<Effect>) -> bool {
        for effect in effects {
            match effect {
                Effect::MoveTo { row, col } => self.relocate(agent, row, col),
                Effect::Bite { host } => match self.population.get_mut(&host) {
                    Some(host) => host.receive_bite(agent),
                    None => log::warn!("{} {} bit missing agent {host}", agent.kind_name(), agent.id()),
                },
                Effect::Die(death) => {
                    let idx = self.index(agent.row(), agent.col());
                    self.cells[idx].exit(agent.id());
                    log::debug!("{} {} died: {death:?}", agent.kind_name(), agent.id());
                    return false;
                }
            }
        }
        true
    }

    /// Stage a move to the clamped target. Moving onto the current cell is a no-op.
    fn relocate(&mut self, agent: &mut Agent, row: i64, col: i64) {
        let (row, col) = self.clamp(row, col);
        if (row, col) == (agent.row(), agent.col()) {
            return;
        }
        let from = self.index(agent.row(), agent.col());
        let to = self.index(row, col);
        self.cells[from].exit(agent.id());
        self.cells[to].enter(agent.id());
        agent.set_position(row, col);
    }

    fn new_mosquito(&mut self, row: usize, col: usize) -> Agent {
        let id = self.next_id();
        let age = self.traits.sample_vector_age(&mut self.rng);
        Agent::mosquito(id, row, col, age)
    }

    fn next_id(&mut self) -> AgentId {
        let id = AgentId::new(self.next_uid);
        self.next_uid += 1;
        id
    }

    /// Create a human at the clamped home cell and stage its entrance.
    pub fn spawn_human(&mut self, row: i64, col: i64) -> AgentId {
        let (row, col) = self.clamp(row, col);
        let id = self.next_id();
        self.insert(Agent::human(id, row, col))
    }

    /// Create a mosquito of random age at the clamped cell and stage its entrance.
    pub fn spawn_mosquito(&mut self, row: i64, col: i64) -> AgentId {
        let (row, col) = self.clamp(row, col);
        let agent = self.new_mosquito(row, col);
        self.insert(agent)
    }

    /// Stage a move of a living agent to the clamped cell; it lands at the next commit.
    ///
    /// Returns `false` if no such agent is alive.
    pub fn move_agent(&mut self, id: AgentId, row: i64, col: i64) -> bool {
        let Some(mut agent) = self.population.remove(&id) else {
            return false;
        };
        self.relocate(&mut agent, row, col);
        self.population.insert(id, agent);
        true
    }

    fn insert(&mut self, agent: Agent) -> AgentId {
        let id = agent.id();
        let idx = self.index(agent.row(), agent.col());
        self.cells[idx].enter(id);
        self.population.insert(id, agent);
        id
    }

    fn clamp(&self, row: i64, col: i64) -> (usize, usize) {
        (
            clamp_index(row, self.params.rows),
            clamp_index(col, self.params.cols),
        )
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.params.cols + col
    }

    /// Cell at the given coordinates, clamped to the nearest edge.
    pub fn location(&self, row: i64, col: i64) -> &Cell {
        let (row, col) = self.clamp(row, col);
        &self.cells[self.index(row, col)]
    }

    pub fn location_mut(&mut self, row: i64, col: i64) -> &mut Cell {
        let (row, col) = self.clamp(row, col);
        let idx = self.index(row, col);
        &mut self.cells[idx]
    }

    /// Uniformly drawn cell.
    pub fn random_location(&mut self) -> &Cell {
        let row = self.rng.random_range(0..self.params.rows);
        let col = self.rng.random_range(0..self.params.cols);
        &self.cells[self.index(row, col)]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.population.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.population.get_mut(&id)
    }

    /// Living agents, committed or staged.
    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for cell in &self.cells {
            census += cell.census(&self.population);
        }
        census
    }

    pub fn count_infections(&self) -> usize {
        self.census().infected
    }

    pub fn count_susceptible(&self) -> usize {
        self.census().susceptible
    }

    pub fn count_recovered(&self) -> usize {
        self.census().recovered
    }

    pub fn cell_census(&self, row: i64, col: i64) -> Census {
        self.location(row, col).census(&self.population)
    }

    pub fn cell_status(&self, row: i64, col: i64) -> CellStatus {
        self.location(row, col).status(&self.population)
    }

    pub fn clock(&self) -> NaiveDateTime {
        self.clock
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn rows(&self) -> usize {
        self.params.rows
    }

    pub fn cols(&self) -> usize {
        self.params.cols
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

fn clamp_index(val: i64, len: usize) -> usize {
    val.clamp(0, len as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_index_pins_to_edges() {
        assert_eq!(clamp_index(-3, 10), 0);
        assert_eq!(clamp_index(0, 10), 0);
        assert_eq!(clamp_index(9, 10), 9);
        assert_eq!(clamp_index(10, 10), 9);
        assert_eq!(clamp_index(i64::MAX, 10), 9);
        assert_eq!(clamp_index(5, 1), 0);
    }

    #[test]
    fn relocate_skips_own_cell() {
        let mut world = World::seeded(Params::new(3, 3, 3600.0, 0.5, 0.0), 1).unwrap();
        let id = world.spawn_human(0, 0);
        world.commit_migrations();

        let mut agent = world.population.remove(&id).unwrap();
        world.relocate(&mut agent, -4, -1);
        assert!(world.cells.iter().all(|cell| !cell.has_pending()));

        world.relocate(&mut agent, 1, 7);
        assert_eq!((agent.row(), agent.col()), (1, 2));
        assert!(world.location(0, 0).has_pending());
        assert!(world.location(1, 2).has_pending());
    }

    #[test]
    fn moving_a_fresh_spawn_commits_once() {
        let mut world = World::seeded(Params::new(3, 3, 3600.0, 0.5, 0.0), 1).unwrap();
        let id = world.spawn_human(0, 0);
        assert!(world.move_agent(id, 2, 1));
        world.commit_migrations();

        assert!(!world.location(0, 0).contains(id));
        assert!(world.location(2, 1).contains(id));
        assert!(!world.move_agent(AgentId::new(u64::MAX), 0, 0));
    }

    #[test]
    fn dead_agents_leave_population_and_cell() {
        let mut params = Params::new(1, 1, 3600.0, 0.5, 0.0);
        params.vector.lifespan_max = 1.0;
        let mut world = World::seeded(params, 1).unwrap();
        let id = world.spawn_mosquito(0, 0);
        world.commit_migrations();
        assert!(world.location(0, 0).contains(id));

        world.tick();
        assert!(world.agent(id).is_none());
        assert!(!world.location(0, 0).contains(id));
    }
}
