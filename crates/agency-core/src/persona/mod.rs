//! Agent personas: structured views of definition documents

pub mod parser;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PersonaError;
use crate::registry::AgentConfig;
pub use parser::parse_persona;

/// A titled deliverable template from the document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deliverable {
    pub title: String,
    pub content: String,
}

/// How the agent talks: tone descriptors and sample phrasings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommunicationStyle {
    pub tone: Vec<String>,
    pub examples: Vec<String>,
}

impl CommunicationStyle {
    pub fn is_empty(&self) -> bool {
        self.tone.is_empty() && self.examples.is_empty()
    }
}

/// Parsed definition document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Persona {
    pub name: String,
    pub description: String,
    pub core_mission: Vec<String>,
    pub workflow: Vec<String>,
    pub critical_rules: Vec<String>,
    pub success_metrics: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    #[serde(skip_serializing_if = "CommunicationStyle::is_empty")]
    pub communication_style: CommunicationStyle,
    /// Raw section bodies keyed by normalized `##` title
    pub sections: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Persona {
    /// Read and parse a definition document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PersonaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PersonaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut persona = parse_persona(&content)?;
        persona.path = Some(path.to_path_buf());
        Ok(persona)
    }

    pub fn section(&self, key: &str) -> Option<&str> {
        self.sections.get(key).map(String::as_str)
    }
}

/// Loads personas for registry agents, caching each by agent name.
pub struct PersonaLoader<'a> {
    registry: &'a AgentConfig,
    cache: HashMap<String, Persona>,
}

impl<'a> PersonaLoader<'a> {
    pub fn new(registry: &'a AgentConfig) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Persona for `agent_name`, or `None` if the agent is unknown or its
    /// document does not exist. Name and description fall back to the
    /// registry entry when the document has no frontmatter.
    pub fn load(&mut self, agent_name: &str) -> Result<Option<&Persona>, PersonaError> {
        let registry = self.registry;
        let Some(agent) = registry.get_agent_by_name(agent_name) else {
            return Ok(None);
        };
        if self.cache.contains_key(&agent.name) {
            return Ok(self.cache.get(&agent.name));
        }

        let path = registry.resolve_definition_path(agent);
        if agent.definition_path.as_os_str().is_empty() || !path.is_file() {
            debug!("PersonaLoader: no definition for '{}' at {}", agent.name, path.display());
            return Ok(None);
        }

        let mut persona = Persona::from_file(&path)?;
        if persona.name.is_empty() {
            persona.name = agent.name.clone();
        }
        if persona.description.is_empty() {
            persona.description = agent.description.clone();
        }
        debug!("PersonaLoader: loaded '{}' from {}", agent.name, path.display());

        Ok(Some(self.cache.entry(agent.name.clone()).or_insert(persona)))
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Prefix a response with the acting agent's header.
pub fn format_response(agent_name: &str, content: &str) -> String {
    format!("🎯 Acting as: {}\n\n{}", agent_name, content)
}
