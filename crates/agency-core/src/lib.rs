//! agency-core - Task routing for a roster of specialist agents
//!
//! This crate provides:
//! - Agent registry loaded from YAML, with definition-document integrity checks
//! - Keyword router that picks the best agent and detects multi-agent tasks
//! - Persona parser for agent definition documents
//! - Coordination planner with handoffs, dependencies and time estimates

pub mod coordination;
pub mod error;
pub mod persona;
pub mod registry;
pub mod router;

// Re-export main types for convenience
pub use coordination::{
    CoordinationPlan, CoordinationPlanner, Handoff, ParallelGroup, PlanAgent, PlanConfig,
    PlanStep, Stage,
};
pub use error::{ConfigError, IntegrityWarning, PersonaError};
pub use persona::{
    CommunicationStyle, Deliverable, Persona, PersonaLoader, format_response, parse_persona,
};
pub use registry::{
    AgentConfig, AgentDefinition, CombinationRule, EMBEDDED_DEFINITIONS, EMBEDDED_REGISTRY, Phase,
};
pub use router::{AgentRouter, RouterConfig, RoutingDecision, TaskAnalysis};
