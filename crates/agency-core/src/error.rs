//! Error types for agency-core

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Registry problems detected while building an [`AgentConfig`](crate::AgentConfig).
///
/// All of these are fatal: a router is never built from a registry that
/// failed validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read agent registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid agent registry YAML: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("Agent registry is empty")]
    Empty,

    #[error("Agent name cannot be blank")]
    BlankName,

    #[error("Duplicate agent name: {0}")]
    DuplicateName(String),

    #[error("Agent registry has no default agent")]
    MissingDefault,

    #[error("Multiple default agents: '{first}' and '{second}'")]
    MultipleDefaults { first: String, second: String },

    #[error("Agent '{0}' has no patterns")]
    NoPatterns(String),

    #[error("Agent '{0}' has a blank pattern")]
    BlankPattern(String),

    #[error("Combination '{rule}' is invalid: {reason}")]
    InvalidCombination { rule: String, reason: String },
}

/// Errors raised while reading an agent's definition document.
#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("Failed to read definition {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing closing --- in definition frontmatter")]
    UnclosedFrontmatter,

    #[error("Invalid definition frontmatter: {0}")]
    Frontmatter(#[from] serde_yml::Error),
}

/// An agent whose definition document cannot be found.
///
/// Routing still works for such an agent, but the condition is reported
/// to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityWarning {
    pub agent: String,
    pub path: PathBuf,
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "definition for agent '{}' not found at {}",
            self.agent,
            self.path.display()
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
