//! Agent definition records and combination rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where in a coordinated workflow an agent does its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Planning,
    Design,
    #[default]
    Implementation,
    Testing,
    Deployment,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Design => write!(f, "design"),
            Self::Implementation => write!(f, "implementation"),
            Self::Testing => write!(f, "testing"),
            Self::Deployment => write!(f, "deployment"),
        }
    }
}

/// A specialist (or the generalist default) that tasks can be routed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Group used to decide whether two agents cover distinct specialties.
    /// Agents without one are their own specialty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default, alias = "keywords")]
    pub patterns: Vec<String>,
    #[serde(rename = "file_path", alias = "definition_path", default)]
    pub definition_path: PathBuf,
    #[serde(default, alias = "is_default")]
    pub default: bool,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: String::new(),
            specialty: None,
            phase: Phase::default(),
            patterns: Vec::new(),
            definition_path: PathBuf::new(),
            default: false,
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_definition_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.definition_path = path.into();
        self
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn specialty(&self) -> &str {
        self.specialty.as_deref().unwrap_or(&self.name)
    }

    pub fn is_default(&self) -> bool {
        self.default
    }
}

/// Phrase groups that, when all present, mark a task as needing a fixed
/// set of agents (e.g. "full-stack" → frontend + backend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRule {
    pub name: String,
    /// Every group must contribute at least one matching phrase.
    pub groups: Vec<Vec<String>>,
    pub agents: Vec<String>,
    /// Any of these phrases in the task vetoes the rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unless: Vec<String>,
}
