//! Relay orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Relay, RelayConfig};
