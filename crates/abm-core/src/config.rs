use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{error::Error, fmt};

/// Model parameters. Every field has a default so partial JSON files load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub num_agents: usize,
    pub num_iterations: usize,
    /// Maximum Euclidean distance at which two agents average their stores.
    pub neighbourhood_radius: f64,
    /// Store capacity per agent; `<= 0` means unlimited.
    pub store_size: f64,
    pub bite_size: f64,
    /// Optional clip on the x axis of the loaded grid.
    pub x_limit: Option<usize>,
    /// Optional clip on the y axis of the loaded grid.
    pub y_limit: Option<usize>,
    pub environment_path: PathBuf,
    /// URL or file path of an HTML page listing seed coordinates.
    pub start_positions: Option<String>,
    pub seed: u64,
    /// Timer interval between animation frames.
    pub frame_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_agents: 50,
            num_iterations: 200,
            neighbourhood_radius: 20.0,
            store_size: 100.0,
            bite_size: 10.0,
            x_limit: Some(100),
            y_limit: Some(100),
            environment_path: PathBuf::from("in.txt"),
            start_positions: None,
            seed: 42,
            frame_interval_ms: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    TooManyAgents { max: usize, actual: usize },
    InvalidRadius(f64),
    InvalidBiteSize(f64),
    InvalidStoreSize(f64),
    ZeroFrameInterval,
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::TooManyAgents { max, actual } => {
                write!(f, "num_agents ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::InvalidRadius(r) => {
                write!(f, "neighbourhood_radius must be finite and >= 0, got {r}")
            }
            SimConfigError::InvalidBiteSize(b) => {
                write!(f, "bite_size must be finite and > 0, got {b}")
            }
            SimConfigError::InvalidStoreSize(s) => {
                write!(f, "store_size must be finite, got {s}")
            }
            SimConfigError::ZeroFrameInterval => write!(f, "frame_interval_ms must be positive"),
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub const MAX_AGENTS: usize = 100_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.num_agents > Self::MAX_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_AGENTS,
                actual: self.num_agents,
            });
        }
        if !self.neighbourhood_radius.is_finite() || self.neighbourhood_radius < 0.0 {
            return Err(SimConfigError::InvalidRadius(self.neighbourhood_radius));
        }
        if !self.bite_size.is_finite() || self.bite_size <= 0.0 {
            return Err(SimConfigError::InvalidBiteSize(self.bite_size));
        }
        if !self.store_size.is_finite() {
            return Err(SimConfigError::InvalidStoreSize(self.store_size));
        }
        if self.frame_interval_ms == 0 {
            return Err(SimConfigError::ZeroFrameInterval);
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl fmt::Display for SimConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model")?;
        writeln!(f, "-----")?;
        writeln!(f, "Number of agents: {}", self.num_agents)?;
        writeln!(f, "Number of iterations: {}", self.num_iterations)?;
        writeln!(f, "Neighbourhood size: {}", self.neighbourhood_radius)?;
        writeln!(f, "Agent store size: {}", self.store_size)?;
        writeln!(f, "Bite size: {}", self.bite_size)?;
        match (self.x_limit, self.y_limit) {
            (Some(x), Some(y)) => writeln!(f, "Environment limit: {x},{y}")?,
            (Some(x), None) => writeln!(f, "Environment limit: {x},-")?,
            (None, Some(y)) => writeln!(f, "Environment limit: -,{y}")?,
            (None, None) => writeln!(f, "Environment limit: none")?,
        }
        write!(f, "Environment file: {}", self.environment_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_bite = SimConfig {
            bite_size: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(
            bad_bite.validate(),
            Err(SimConfigError::InvalidBiteSize(0.0))
        );

        let bad_radius = SimConfig {
            neighbourhood_radius: -1.0,
            ..SimConfig::default()
        };
        assert_eq!(
            bad_radius.validate(),
            Err(SimConfigError::InvalidRadius(-1.0))
        );

        let too_many = SimConfig {
            num_agents: SimConfig::MAX_AGENTS + 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            too_many.validate(),
            Err(SimConfigError::TooManyAgents { .. })
        ));

        let no_interval = SimConfig {
            frame_interval_ms: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            no_interval.validate(),
            Err(SimConfigError::ZeroFrameInterval)
        );
    }

    #[test]
    fn unlimited_store_is_valid() {
        let config = SimConfig {
            store_size: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SimConfig::from_json(r#"{"num_agents": 7, "x_limit": null}"#).unwrap();
        assert_eq!(config.num_agents, 7);
        assert_eq!(config.x_limit, None);
        assert_eq!(config.y_limit, Some(100));
        assert_eq!(config.bite_size, 10.0);
    }

    #[test]
    fn display_lists_parameters() {
        let text = SimConfig::default().to_string();
        assert!(text.contains("Number of agents: 50"));
        assert!(text.contains("Environment limit: 100,100"));
    }
}
