//! Timer-driven run control over a [`Model`].
//!
//! A host event loop calls [`Controller::on_frame`] at a fixed interval; the
//! remaining methods map onto the user's run/stop/start/reset/load actions.
//! Everything runs on the caller's thread.

use crate::config::SimConfig;
use crate::environment::{Grid, GridError};
use crate::model::{Model, ModelInitError, TickMetrics, TickOutcome};
use crate::params::{ParameterError, ParameterForm};
use crate::start_positions::{StartPositions, StartPositionsError};
use std::path::Path;
use std::{error::Error, fmt};
use tracing::info;

/// Source of the external inputs a reset needs.
pub trait ScenarioLoader {
    fn load_grid(&self, path: &Path) -> Result<Grid, GridError>;
    /// `source` is a URL or a file path.
    fn load_start_positions(&self, source: &str) -> Result<StartPositions, StartPositionsError>;
}

/// Reads the grid and start positions from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileLoader;

impl ScenarioLoader for FileLoader {
    fn load_grid(&self, path: &Path) -> Result<Grid, GridError> {
        Grid::load_csv(path)
    }

    fn load_start_positions(&self, source: &str) -> Result<StartPositions, StartPositionsError> {
        StartPositions::load_file(Path::new(source))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug)]
pub enum ControllerError {
    Parameters(ParameterError),
    Grid(GridError),
    StartPositions(StartPositionsError),
    Model(ModelInitError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Parameters(e) => write!(f, "{e}"),
            ControllerError::Grid(e) => write!(f, "{e}"),
            ControllerError::StartPositions(e) => write!(f, "{e}"),
            ControllerError::Model(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ControllerError::Parameters(e) => Some(e),
            ControllerError::Grid(e) => Some(e),
            ControllerError::StartPositions(e) => Some(e),
            ControllerError::Model(e) => Some(e),
        }
    }
}

impl From<ParameterError> for ControllerError {
    fn from(err: ParameterError) -> Self {
        ControllerError::Parameters(err)
    }
}

impl From<GridError> for ControllerError {
    fn from(err: GridError) -> Self {
        ControllerError::Grid(err)
    }
}

impl From<StartPositionsError> for ControllerError {
    fn from(err: StartPositionsError) -> Self {
        ControllerError::StartPositions(err)
    }
}

impl From<ModelInitError> for ControllerError {
    fn from(err: ModelInitError) -> Self {
        ControllerError::Model(err)
    }
}

pub struct Controller {
    model: Model,
    loader: Box<dyn ScenarioLoader>,
    start_positions: StartPositions,
    state: AnimationState,
    frames_remaining: usize,
}

impl Controller {
    /// Load the inputs named by `config` and build the first model.
    pub fn new(
        config: SimConfig,
        loader: Box<dyn ScenarioLoader>,
    ) -> Result<Self, ControllerError> {
        let start_positions = match &config.start_positions {
            Some(source) => loader.load_start_positions(source)?,
            None => StartPositions::default(),
        };
        let grid = loader.load_grid(&config.environment_path)?;
        let model = Model::new(config, grid, &start_positions)?;
        Ok(Self {
            model,
            loader,
            start_positions,
            state: AnimationState::Idle,
            frames_remaining: 0,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> &SimConfig {
        self.model.config()
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn frames_remaining(&self) -> usize {
        self.frames_remaining
    }

    /// Reset, then animate for `num_iterations` frames.
    pub fn run_model(&mut self) -> Result<(), ControllerError> {
        info!("Running model.\n{}", self.model.config());
        self.reset()?;
        self.frames_remaining = self.model.config().num_iterations;
        self.state = if self.frames_remaining > 0 {
            AnimationState::Running
        } else {
            AnimationState::Finished
        };
        Ok(())
    }

    pub fn stop_animation(&mut self) {
        if self.state == AnimationState::Running {
            info!("Stopping animation.");
            self.state = AnimationState::Paused;
        }
    }

    pub fn start_animation(&mut self) {
        if self.state == AnimationState::Paused {
            info!("Starting animation.");
            self.state = AnimationState::Running;
        }
    }

    /// Stop any animation and rebuild the model from freshly loaded inputs.
    /// On failure the previous model is left as it was.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        info!("Resetting model.");
        self.stop_animation();
        let grid = self.loader.load_grid(&self.model.config().environment_path)?;
        self.model.reset(grid, &self.start_positions)?;
        self.state = AnimationState::Idle;
        self.frames_remaining = 0;
        Ok(())
    }

    /// Apply a parameter form and reset with the result. Nothing changes
    /// unless the form parses and the new inputs load.
    pub fn load_parameters(&mut self, form: &ParameterForm) -> Result<(), ControllerError> {
        info!("Updating model parameters.");
        let config = form.apply(self.model.config())?;
        let start_positions = match &config.start_positions {
            Some(source) => {
                info!(source = %source, "Fetching start positions");
                self.loader.load_start_positions(source)?
            }
            None => StartPositions::default(),
        };
        let grid = self.loader.load_grid(&config.environment_path)?;
        let model = Model::new(config, grid, &start_positions)?;
        self.model = model;
        self.start_positions = start_positions;
        self.state = AnimationState::Idle;
        self.frames_remaining = 0;
        info!("Model has been reset.\n{}", self.model.config());
        Ok(())
    }

    /// Timer callback. Advances one tick while running and returns its
    /// metrics; returns `None` otherwise.
    pub fn on_frame(&mut self) -> Option<TickMetrics> {
        if self.state != AnimationState::Running {
            return None;
        }
        let outcome = self.model.tick();
        self.frames_remaining = self.frames_remaining.saturating_sub(1);
        if outcome == TickOutcome::Complete || self.frames_remaining == 0 {
            info!(tick = self.model.tick_index(), ?outcome, "Animation finished");
            self.state = AnimationState::Finished;
        }
        Some(self.model.collect_tick_metrics())
    }
}
