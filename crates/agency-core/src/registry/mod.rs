//! Agent registry
//!
//! The registry is loaded once (from YAML or the embedded copy), validated,
//! and then handed to the router. Nothing in it changes afterwards.

pub mod config;
pub mod definition;

pub use config::{AgentConfig, EMBEDDED_DEFINITIONS, EMBEDDED_REGISTRY};
pub use definition::{AgentDefinition, CombinationRule, Phase};
