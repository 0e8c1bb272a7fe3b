// Hatchet platform client
//
// OrchestrationClient implementation over the platform's v1 REST API.

pub mod client;
pub mod config;
pub mod types;

pub use client::HatchetClient;
pub use config::{ConfigError, HatchetConfig};
