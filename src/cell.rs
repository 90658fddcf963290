//! Lattice locations and the staged migration protocol.
//!
//! [`Cell::enter`] and [`Cell::exit`] only stage requests. Inhabitants change
//! when the world commits: [`Cell::do_exits`] on every cell, then
//! [`Cell::do_entrances`] on every cell, after all cells finished their pass.
//! A mover therefore is ticked exactly once per step and is never committed
//! to two cells at once.

use crate::agent::{Agent, AgentId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// Every agent of a world, keyed by identity.
pub type Population = BTreeMap<AgentId, Agent>;

/// Number of agents per health status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Census {
    pub infected: usize,
    pub susceptible: usize,
    pub recovered: usize,
}

impl Census {
    pub fn count(&mut self, agent: &Agent) {
        if agent.is_infected() {
            self.infected += 1;
        }
        if agent.is_susceptible() {
            self.susceptible += 1;
        }
        if agent.is_recovered() {
            self.recovered += 1;
        }
    }
}

impl AddAssign for Census {
    fn add_assign(&mut self, other: Self) {
        self.infected += other.infected;
        self.susceptible += other.susceptible;
        self.recovered += other.recovered;
    }
}

/// Display classification of a cell, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStatus {
    Infected,
    Susceptible,
    Recovered,
    Empty,
}

impl From<Census> for CellStatus {
    fn from(census: Census) -> Self {
        if census.infected > 0 {
            CellStatus::Infected
        } else if census.susceptible > 0 {
            CellStatus::Susceptible
        } else if census.recovered > 0 {
            CellStatus::Recovered
        } else {
            CellStatus::Empty
        }
    }
}

/// One lattice location.
#[derive(Debug)]
pub struct Cell {
    row: usize,
    col: usize,
    vector_density: f64,
    /// Committed agents, unique, in arrival order.
    inhabitants: Vec<AgentId>,
    incoming: Vec<AgentId>,
    outgoing: Vec<AgentId>,
    /// Standing vector that bites residents; released into the cell once infected.
    resident_vector: Agent,
}

impl Cell {
    pub fn new(row: usize, col: usize, vector_density: f64, resident_vector: Agent) -> Self {
        Self {
            row,
            col,
            vector_density,
            inhabitants: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            resident_vector,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn vector_density(&self) -> f64 {
        self.vector_density
    }

    pub fn inhabitants(&self) -> &[AgentId] {
        &self.inhabitants
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.inhabitants.contains(&id)
    }

    pub fn resident_vector(&self) -> &Agent {
        &self.resident_vector
    }

    pub(crate) fn resident_vector_mut(&mut self) -> &mut Agent {
        &mut self.resident_vector
    }

    /// Swap in a fresh resident vector, returning the previous one.
    pub(crate) fn replace_resident_vector(&mut self, fresh: Agent) -> Agent {
        std::mem::replace(&mut self.resident_vector, fresh)
    }

    /// Stage an arrival.
    ///
    /// Only the world stages moves, so an agent's position and its cell agree.
    pub(crate) fn enter(&mut self, id: AgentId) {
        self.incoming.push(id);
    }

    /// Stage a departure. An arrival still pending here is cancelled instead.
    pub(crate) fn exit(&mut self, id: AgentId) {
        if let Some(idx) = self.incoming.iter().position(|&other| other == id) {
            self.incoming.remove(idx);
            return;
        }
        self.outgoing.push(id);
    }

    pub fn has_pending(&self) -> bool {
        !self.incoming.is_empty() || !self.outgoing.is_empty()
    }

    /// Remove every staged departure from the inhabitants.
    pub fn do_exits(&mut self) {
        for id in self.outgoing.drain(..) {
            if let Some(idx) = self.inhabitants.iter().position(|&other| other == id) {
                self.inhabitants.remove(idx);
            } else {
                log::warn!(
                    "agent {id} left ({}, {}) without being committed there",
                    self.row,
                    self.col
                );
            }
        }
    }

    /// Add every staged arrival to the inhabitants.
    ///
    /// An identity already present is dropped: inhabitants form a set.
    pub fn do_entrances(&mut self) {
        for id in self.incoming.drain(..) {
            if self.inhabitants.contains(&id) {
                log::warn!(
                    "agent {id} entered ({}, {}) twice, dropping duplicate",
                    self.row,
                    self.col
                );
                continue;
            }
            self.inhabitants.push(id);
        }
    }

    /// Humans among the inhabitants, in inhabitant order.
    pub fn hosts(&self, population: &Population) -> Vec<AgentId> {
        self.agents(population)
            .filter(|agent| agent.is_human())
            .map(Agent::id)
            .collect()
    }

    pub fn census(&self, population: &Population) -> Census {
        let mut census = Census::default();
        for agent in self.agents(population) {
            census.count(agent);
        }
        census
    }

    pub fn status(&self, population: &Population) -> CellStatus {
        self.census(population).into()
    }

    fn agents<'a>(&'a self, population: &'a Population) -> impl Iterator<Item = &'a Agent> {
        self.inhabitants.iter().filter_map(|id| population.get(id))
    }
}
