//! Free-text parameter entry, as typed into a form, and its all-or-nothing
//! conversion into a [`SimConfig`].

use crate::config::{SimConfig, SimConfigError};
use std::path::PathBuf;
use std::{error::Error, fmt};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterForm {
    pub num_agents: String,
    pub num_iterations: String,
    pub neighbourhood_radius: String,
    pub store_size: String,
    pub bite_size: String,
    /// `"X,Y"`, with `-` for an axis without a limit; empty clears both.
    pub environment_limit: String,
    pub environment_path: String,
    pub start_positions: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    NotAnInteger { field: &'static str, value: String },
    InvalidLimit(String),
    UnknownField(String),
    Config(SimConfigError),
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::NotAnInteger { field, value } => {
                write!(f, "{field} must be an integer, got {value:?}")
            }
            ParameterError::InvalidLimit(value) => write!(
                f,
                "environment limit must be of the form X,Y where X and Y are integers, got {value:?}"
            ),
            ParameterError::UnknownField(name) => write!(f, "unknown parameter {name:?}"),
            ParameterError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ParameterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParameterError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimConfigError> for ParameterError {
    fn from(err: SimConfigError) -> Self {
        ParameterError::Config(err)
    }
}

fn parse_optional<T: std::str::FromStr>(
    field: &'static str,
    text: &str,
) -> Result<Option<T>, ParameterError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<T>()
        .map(Some)
        .map_err(|_| ParameterError::NotAnInteger {
            field,
            value: text.to_string(),
        })
}

/// Parse `"X,Y"` into a pair of axis limits. An axis written as `-` has no
/// limit; empty input means no limits at all.
pub fn parse_limit(text: &str) -> Result<(Option<usize>, Option<usize>), ParameterError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok((None, None));
    }
    let invalid = || ParameterError::InvalidLimit(text.to_string());
    let axis = |part: &str| match part.trim() {
        "-" => Ok(None),
        n => n.parse::<usize>().map(Some).map_err(|_| invalid()),
    };
    let (x, y) = text.split_once(',').ok_or_else(invalid)?;
    Ok((axis(x)?, axis(y)?))
}

fn limit_text(x_limit: Option<usize>, y_limit: Option<usize>) -> String {
    let axis = |limit: Option<usize>| limit.map_or_else(|| "-".to_string(), |n| n.to_string());
    match (x_limit, y_limit) {
        (None, None) => String::new(),
        (x, y) => format!("{},{}", axis(x), axis(y)),
    }
}

/// Text for a numeric field the form reads back as an integer. Values the
/// form cannot hold are left empty so applying the form keeps them.
fn whole_number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= f64::from(u32::MAX) {
        format!("{value}")
    } else {
        String::new()
    }
}

impl ParameterForm {
    pub const FIELDS: [&'static str; 8] = [
        "agents",
        "iterations",
        "radius",
        "store-size",
        "bite-size",
        "limit",
        "environment",
        "start-positions",
    ];

    /// Fill every field from an existing configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            num_agents: config.num_agents.to_string(),
            num_iterations: config.num_iterations.to_string(),
            neighbourhood_radius: whole_number_text(config.neighbourhood_radius),
            store_size: whole_number_text(config.store_size),
            bite_size: whole_number_text(config.bite_size),
            environment_limit: limit_text(config.x_limit, config.y_limit),
            environment_path: config.environment_path.display().to_string(),
            start_positions: config.start_positions.clone().unwrap_or_default(),
        }
    }

    /// Set a field by its short name (see [`ParameterForm::FIELDS`]).
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ParameterError> {
        let slot = match name {
            "agents" => &mut self.num_agents,
            "iterations" => &mut self.num_iterations,
            "radius" => &mut self.neighbourhood_radius,
            "store-size" => &mut self.store_size,
            "bite-size" => &mut self.bite_size,
            "limit" => &mut self.environment_limit,
            "environment" => &mut self.environment_path,
            "start-positions" => &mut self.start_positions,
            other => return Err(ParameterError::UnknownField(other.to_string())),
        };
        *slot = value.to_string();
        Ok(())
    }

    /// Produce a new configuration from `base` with this form applied.
    ///
    /// Empty numeric fields keep the base value. Nothing is returned unless
    /// every field parses and the result validates.
    pub fn apply(&self, base: &SimConfig) -> Result<SimConfig, ParameterError> {
        let num_agents = parse_optional::<usize>("number of agents", &self.num_agents)?;
        let num_iterations =
            parse_optional::<usize>("number of iterations", &self.num_iterations)?;
        let radius = parse_optional::<u32>("neighbourhood size", &self.neighbourhood_radius)?;
        let store_size = parse_optional::<i64>("agent store size", &self.store_size)?;
        let bite_size = parse_optional::<u32>("bite size", &self.bite_size)?;
        let (x_limit, y_limit) = parse_limit(&self.environment_limit)?;

        let mut config = base.clone();
        if let Some(n) = num_agents {
            config.num_agents = n;
        }
        if let Some(n) = num_iterations {
            config.num_iterations = n;
        }
        if let Some(r) = radius {
            config.neighbourhood_radius = f64::from(r);
        }
        if let Some(s) = store_size {
            config.store_size = s as f64;
        }
        if let Some(b) = bite_size {
            config.bite_size = f64::from(b);
        }
        config.x_limit = x_limit;
        config.y_limit = y_limit;
        let path = self.environment_path.trim();
        if !path.is_empty() {
            config.environment_path = PathBuf::from(path);
        }
        let source = self.start_positions.trim();
        config.start_positions = (!source.is_empty()).then(|| source.to_string());

        config.validate()?;
        Ok(config)
    }
}
