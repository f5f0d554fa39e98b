pub mod agent;
pub mod config;
pub mod controller;
pub mod environment;
pub mod experiment;
pub mod model;
pub mod params;
pub mod spatial;
pub mod start_positions;
