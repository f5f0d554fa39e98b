use crate::config::SimConfig;
use crate::environment::Grid;
use crate::model::{Model, ModelInitError, RunError, RunSummary};
use crate::start_positions::StartPositions;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicateError {
    Init(ModelInitError),
    Run(RunError),
}

impl fmt::Display for ReplicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicateError::Init(e) => write!(f, "{e}"),
            ReplicateError::Run(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ReplicateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReplicateError::Init(e) => Some(e),
            ReplicateError::Run(e) => Some(e),
        }
    }
}

impl From<ModelInitError> for ReplicateError {
    fn from(err: ModelInitError) -> Self {
        ReplicateError::Init(err)
    }
}

impl From<RunError> for ReplicateError {
    fn from(err: RunError) -> Self {
        ReplicateError::Run(err)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicateSummary {
    pub seed: u64,
    pub summary: RunSummary,
}

/// Run one independent model per seed on the rayon pool. Each model ticks
/// single-threaded; results come back in seed order.
pub fn run_replicates(
    config: &SimConfig,
    grid: &Grid,
    start_positions: &StartPositions,
    seeds: &[u64],
    sample_every: usize,
) -> Result<Vec<ReplicateSummary>, ReplicateError> {
    seeds
        .par_iter()
        .map(|&seed| -> Result<ReplicateSummary, ReplicateError> {
            let replicate_config = SimConfig {
                seed,
                ..config.clone()
            };
            let mut model = Model::new(replicate_config, grid.clone(), start_positions)?;
            let summary = model.try_run(config.num_iterations, sample_every)?;
            Ok(ReplicateSummary { seed, summary })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SimConfig, Grid) {
        let config = SimConfig {
            num_agents: 10,
            num_iterations: 15,
            x_limit: None,
            y_limit: None,
            ..SimConfig::default()
        };
        let grid = Grid::from_rows(vec![vec![40.0; 12]; 12]).unwrap();
        (config, grid)
    }

    #[test]
    fn replicates_match_sequential_runs() {
        let (config, grid) = setup();
        let seeds = [1, 2, 3, 4];
        let parallel =
            run_replicates(&config, &grid, &StartPositions::default(), &seeds, 5).unwrap();
        assert_eq!(parallel.len(), 4);
        for (rep, &seed) in parallel.iter().zip(seeds.iter()) {
            assert_eq!(rep.seed, seed);
            let mut model = Model::new(
                SimConfig {
                    seed,
                    ..config.clone()
                },
                grid.clone(),
                &StartPositions::default(),
            )
            .unwrap();
            let sequential = model.run(15, 5);
            assert_eq!(rep.summary.final_stores, sequential.final_stores);
            assert_eq!(rep.summary.samples, sequential.samples);
        }
    }

    #[test]
    fn bad_sampling_fails_every_replicate() {
        let (config, grid) = setup();
        let err = run_replicates(&config, &grid, &StartPositions::default(), &[1], 0).unwrap_err();
        assert_eq!(err, ReplicateError::Run(RunError::InvalidSampleEvery));
    }
}
