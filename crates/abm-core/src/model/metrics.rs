use super::Model;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TickMetrics {
    pub tick: usize,
    pub agent_count: usize,
    pub total_store: f64,
    pub mean_store: f64,
    pub min_store: f64,
    pub max_store: f64,
    /// Agents whose capped store cannot take another bite.
    pub full_agents: usize,
    pub resource_total: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub ticks_requested: usize,
    pub ticks_run: usize,
    pub sample_every: usize,
    pub completed: bool,
    pub samples: Vec<TickMetrics>,
    /// Final store per agent, ordered by agent id.
    #[serde(default)]
    pub final_stores: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentView {
    pub id: u32,
    pub x: usize,
    pub y: usize,
    pub store: f64,
}

/// Everything a renderer needs to draw the current state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub tick: usize,
    pub x_length: usize,
    pub y_length: usize,
    /// Row-major resource levels of the clipped window.
    pub plane: Vec<f64>,
    pub agents: Vec<AgentView>,
}

impl Model {
    pub fn collect_tick_metrics(&self) -> TickMetrics {
        let agent_count = self.agents.len();
        let total_store: f64 = self.agents.iter().map(|a| a.store).sum();
        let (min_store, max_store) = if agent_count == 0 {
            (0.0, 0.0)
        } else {
            self.agents
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                    (lo.min(a.store), hi.max(a.store))
                })
        };
        TickMetrics {
            tick: self.tick_index,
            agent_count,
            total_store,
            mean_store: if agent_count > 0 {
                total_store / agent_count as f64
            } else {
                0.0
            },
            min_store,
            max_store,
            full_agents: self
                .agents
                .iter()
                .filter(|a| a.is_capped() && !a.has_capacity())
                .count(),
            resource_total: self.environment.total(),
        }
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        let mut agents: Vec<AgentView> = self
            .agents
            .iter()
            .map(|a| AgentView {
                id: a.id,
                x: a.x,
                y: a.y,
                store: a.store,
            })
            .collect();
        agents.sort_by_key(|a| a.id);
        ModelSnapshot {
            tick: self.tick_index,
            x_length: self.environment.x_length(),
            y_length: self.environment.y_length(),
            plane: self.environment.window(),
            agents,
        }
    }
}
