//! Agent-based simulation of vector-borne disease on a 2-D lattice.
//!
//! Humans and mosquitoes move over a grid of [`Cell`]s owned by a [`World`],
//! passing strains to each other through bites. Every stochastic decision
//! draws from the world's single [`RandomSource`], so a seed fixes a run.

pub mod agent;
pub mod analysis;
pub mod cell;
pub mod config;
pub mod disease;
pub mod engine;
pub mod manager;
pub mod params;
pub mod random;
pub mod stats;
pub mod world;

pub use agent::{Agent, AgentId, AgentKind};
pub use cell::{Cell, CellStatus, Census};
pub use disease::{Disease, DiseaseState};
pub use params::Params;
pub use random::{RandomSource, SeedingSampler};
pub use world::World;
