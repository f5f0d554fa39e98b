pub mod metrics;
#[cfg(test)]
mod tests;

pub use metrics::*;

use crate::agent::{self, Agent};
use crate::config::{SimConfig, SimConfigError};
use crate::environment::{Environment, Grid};
use crate::spatial::SpatialIndex;
use crate::start_positions::StartPositions;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};
use tracing::{debug, info, warn};

/// Result of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    Running,
    /// Every agent's store is capped and full.
    Complete,
}

/// Owns the environment and the agent population and advances them tick by
/// tick. Agents refer to each other only by slot in `agents`.
pub struct Model {
    pub agents: Vec<Agent>,
    pub(crate) environment: Environment,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) tick_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelInitError {
    Config(SimConfigError),
    EmptyEnvironment { x_length: usize, y_length: usize },
}

impl fmt::Display for ModelInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelInitError::Config(e) => write!(f, "{}", e),
            ModelInitError::EmptyEnvironment { x_length, y_length } => write!(
                f,
                "environment window is {x_length}x{y_length}; agents need at least one cell"
            ),
        }
    }
}

impl From<SimConfigError> for ModelInitError {
    fn from(err: SimConfigError) -> Self {
        ModelInitError::Config(err)
    }
}

impl Error for ModelInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    InvalidSampleEvery,
    TooManyTicks { max: usize, actual: usize },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            RunError::TooManyTicks { max, actual } => {
                write!(f, "ticks ({actual}) exceed supported maximum ({max})")
            }
        }
    }
}

impl Error for RunError {}

impl Model {
    pub const MAX_RUN_TICKS: usize = 1_000_000;

    pub fn new(
        config: SimConfig,
        grid: Grid,
        start_positions: &StartPositions,
    ) -> Result<Self, ModelInitError> {
        config.validate()?;
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        let environment = Environment::new(grid, config.x_limit, config.y_limit);
        let mut model = Self {
            agents: Vec::new(),
            environment,
            config,
            rng,
            tick_index: 0,
        };
        model.populate(start_positions)?;
        Ok(model)
    }

    /// Rebuild the environment from `grid` and create a fresh population.
    /// The random stream carries on from where it was, so successive resets
    /// differ while a whole session stays reproducible from the seed.
    pub fn reset(
        &mut self,
        grid: Grid,
        start_positions: &StartPositions,
    ) -> Result<(), ModelInitError> {
        self.config.validate()?;
        let environment = Environment::new(grid, self.config.x_limit, self.config.y_limit);
        let previous = std::mem::replace(&mut self.environment, environment);
        if let Err(e) = self.populate(start_positions) {
            self.environment = previous;
            return Err(e);
        }
        self.tick_index = 0;
        info!(
            agents = self.agents.len(),
            x_length = self.environment.x_length(),
            y_length = self.environment.y_length(),
            "Model has been reset"
        );
        Ok(())
    }

    fn populate(&mut self, start_positions: &StartPositions) -> Result<(), ModelInitError> {
        let x_length = self.environment.x_length();
        let y_length = self.environment.y_length();
        if self.config.num_agents > 0 && self.environment.is_empty() {
            return Err(ModelInitError::EmptyEnvironment { x_length, y_length });
        }

        let mut agents = Vec::with_capacity(self.config.num_agents);
        for i in 0..self.config.num_agents {
            let y = match start_positions.y(i) {
                Some(v) => Self::seeded_coord(v, y_length, 'y', i),
                None => self.rng.random_range(0..y_length),
            };
            let x = match start_positions.x(i) {
                Some(v) => Self::seeded_coord(v, x_length, 'x', i),
                None => self.rng.random_range(0..x_length),
            };
            agents.push(Agent::new(
                i as u32,
                x,
                y,
                self.config.bite_size,
                self.config.store_size,
            ));
        }
        self.agents = agents;
        Ok(())
    }

    fn seeded_coord(value: i64, length: usize, axis: char, slot: usize) -> usize {
        let wrapped = value.rem_euclid(length as i64) as usize;
        if wrapped as i64 != value {
            warn!(
                slot,
                axis = %axis,
                value,
                wrapped,
                "Seed coordinate outside environment, wrapped"
            );
        }
        wrapped
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn tick_index(&self) -> usize {
        self.tick_index
    }

    /// True when stores are capped and no agent can take another bite.
    pub fn is_complete(&self) -> bool {
        !self.agents.is_empty()
            && self
                .agents
                .iter()
                .all(|a| a.is_capped() && !a.has_capacity())
    }

    /// One pass over the population: shuffle, then move, eat and share for
    /// each agent in the new order.
    pub fn tick(&mut self) -> TickOutcome {
        self.tick_index = self.tick_index.saturating_add(1);
        self.agents.shuffle(&mut self.rng);

        let radius = self.config.neighbourhood_radius;
        let mut index = SpatialIndex::build(&self.agents);
        let mut bites = 0usize;
        for i in 0..self.agents.len() {
            let from = self.agents[i].position();
            self.agents[i].move_step(&mut self.rng, &self.environment);
            let to = self.agents[i].position();
            index.relocate(i, from, to);

            if self.agents[i].eat(&mut self.environment) {
                bites += 1;
            }

            let neighbours = index.query_neighbors(to, radius, i);
            agent::share_with(&mut self.agents, i, &neighbours);
        }

        let outcome = if self.is_complete() {
            info!(tick = self.tick_index, "Simulation complete: every store is full");
            TickOutcome::Complete
        } else {
            TickOutcome::Running
        };
        debug!(tick = self.tick_index, bites, ?outcome, "Tick finished");
        outcome
    }

    pub fn run(&mut self, ticks: usize, sample_every: usize) -> RunSummary {
        self.try_run(ticks, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Tick up to `ticks` times, sampling metrics every `sample_every` ticks
    /// and on the last tick. Stops early once the model is complete.
    pub fn try_run(&mut self, ticks: usize, sample_every: usize) -> Result<RunSummary, RunError> {
        if sample_every == 0 {
            return Err(RunError::InvalidSampleEvery);
        }
        if ticks > Self::MAX_RUN_TICKS {
            return Err(RunError::TooManyTicks {
                max: Self::MAX_RUN_TICKS,
                actual: ticks,
            });
        }

        let mut samples = Vec::with_capacity(ticks / sample_every + 1);
        let mut ticks_run = 0;
        let mut completed = false;
        for step in 1..=ticks {
            let outcome = self.tick();
            ticks_run = step;
            completed = outcome == TickOutcome::Complete;
            if step % sample_every == 0 || step == ticks || completed {
                samples.push(self.collect_tick_metrics());
            }
            if completed {
                break;
            }
        }

        let mut final_stores: Vec<(u32, f64)> =
            self.agents.iter().map(|a| (a.id, a.store)).collect();
        final_stores.sort_by_key(|&(id, _)| id);
        Ok(RunSummary {
            schema_version: 1,
            ticks_requested: ticks,
            ticks_run,
            sample_every,
            completed,
            samples,
            final_stores: final_stores.into_iter().map(|(_, s)| s).collect(),
        })
    }
}
