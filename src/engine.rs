use crate::cell::Census;
use crate::config::Config;
use crate::world::World;
use anyhow::{Context, Result};

/// Simulation engine.
///
/// Holds the configuration and a seeded world with one infected human, and
/// runs the outbreak until no infection remains.
pub struct Engine {
    cfg: Config,
    world: World,
}

/// Result of one outbreak run.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Number of ticks performed.
    pub ticks: usize,
    /// Whether the infection died out before the tick cap.
    pub extinct: bool,
    /// Census before the first tick and after every tick.
    pub trajectory: Vec<Census>,
}

impl Outcome {
    pub fn final_census(&self) -> Census {
        self.trajectory.last().copied().unwrap_or_default()
    }

    /// Largest simultaneous number of infected agents, with the tick it occurred at.
    pub fn peak_infected(&self) -> (usize, usize) {
        self.trajectory
            .iter()
            .enumerate()
            .map(|(tick, census)| (census.infected, tick))
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .unwrap_or_default()
    }
}

impl Engine {
    /// Create an `Engine` with a seeded world and patient zero at a random cell.
    pub fn generate_initial_condition(cfg: Config, seed: u64) -> Result<Self> {
        let mut world =
            World::seeded(cfg.world.clone(), seed).context("failed to construct world")?;

        let (row, col) = {
            let cell = world.random_location();
            (cell.row(), cell.col())
        };
        let id = world.spawn_human(row as i64, col as i64);
        if let Some(patient_zero) = world.agent_mut(id) {
            patient_zero.receive_disease(&cfg.outbreak.strain);
        }
        world.commit_migrations();
        log::info!("patient zero {id} placed at ({row}, {col})");

        Ok(Self { cfg, world })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Tick until no agent is infected or the tick cap is reached.
    pub fn perform_simulation(&mut self) -> Outcome {
        let max_ticks = self.cfg.outbreak.max_ticks;
        let ticks_per_report = self.cfg.outbreak.ticks_per_report;

        let mut census = self.world.census();
        let mut trajectory = vec![census];

        while census.infected > 0 {
            if self.world.ticks() >= max_ticks {
                log::warn!("stopped after {max_ticks} ticks with {} infected", census.infected);
                break;
            }

            self.world.tick();
            census = self.world.census();
            trajectory.push(census);

            if self.world.ticks() % ticks_per_report == 0 {
                log::info!(
                    "tick {:6} at {}: {} infected, {} recovered, {} susceptible",
                    self.world.ticks(),
                    self.world.clock(),
                    census.infected,
                    census.recovered,
                    census.susceptible
                );
            }
        }

        Outcome {
            ticks: self.world.ticks(),
            extinct: census.infected == 0,
            trajectory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut cfg = Config::default();
        cfg.world.rows = 8;
        cfg.world.cols = 8;
        cfg.outbreak.max_ticks = 20_000;
        cfg
    }

    #[test]
    fn initial_condition_has_one_infection() {
        let engine = Engine::generate_initial_condition(small_config(), 55).unwrap();
        assert_eq!(engine.world().count_infections(), 1);
        assert_eq!(engine.world().ticks(), 0);
    }

    #[test]
    fn trajectory_covers_every_tick() {
        let mut engine = Engine::generate_initial_condition(small_config(), 55).unwrap();
        let outcome = engine.perform_simulation();

        assert_eq!(outcome.trajectory.len(), outcome.ticks + 1);
        assert_eq!(outcome.trajectory[0].infected, 1);
        assert!(outcome.peak_infected().0 >= 1);
        if outcome.extinct {
            assert_eq!(outcome.final_census().infected, 0);
            assert!(outcome.ticks >= 169);
        } else {
            assert_eq!(outcome.ticks, 20_000);
        }
    }

    #[test]
    fn tick_cap_stops_the_run() {
        let mut cfg = small_config();
        cfg.outbreak.max_ticks = 10;
        let mut engine = Engine::generate_initial_condition(cfg, 1).unwrap();
        let outcome = engine.perform_simulation();
        assert_eq!(outcome.ticks, 10);
        assert!(!outcome.extinct);
    }
}
