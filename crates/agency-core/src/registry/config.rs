//! Validated agent registry

use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::definition::{AgentDefinition, CombinationRule};
use crate::error::{ConfigError, IntegrityWarning, Result};
use crate::router::matcher::normalize;

/// Registry shipped with the crate. Definition paths in it are relative to
/// the workspace root.
pub const EMBEDDED_REGISTRY: &str = include_str!("../../../../agents.yaml");

/// Definition documents referenced by [`EMBEDDED_REGISTRY`], as
/// (relative path, content) pairs.
pub const EMBEDDED_DEFINITIONS: &[(&str, &str)] = &[
    (
        "agents/engineering/frontend-developer.md",
        include_str!("../../../../agents/engineering/frontend-developer.md"),
    ),
    (
        "agents/engineering/backend-architect.md",
        include_str!("../../../../agents/engineering/backend-architect.md"),
    ),
    (
        "agents/engineering/ai-engineer.md",
        include_str!("../../../../agents/engineering/ai-engineer.md"),
    ),
    (
        "agents/engineering/mobile-app-builder.md",
        include_str!("../../../../agents/engineering/mobile-app-builder.md"),
    ),
    (
        "agents/engineering/devops-automator.md",
        include_str!("../../../../agents/engineering/devops-automator.md"),
    ),
    (
        "agents/engineering/senior-developer.md",
        include_str!("../../../../agents/engineering/senior-developer.md"),
    ),
    (
        "agents/design/ui-designer.md",
        include_str!("../../../../agents/design/ui-designer.md"),
    ),
    (
        "agents/design/ux-architect.md",
        include_str!("../../../../agents/design/ux-architect.md"),
    ),
    (
        "agents/testing/reality-checker.md",
        include_str!("../../../../agents/testing/reality-checker.md"),
    ),
    (
        "agents/testing/performance-benchmarker.md",
        include_str!("../../../../agents/testing/performance-benchmarker.md"),
    ),
    (
        "agents/product/product-manager.md",
        include_str!("../../../../agents/product/product-manager.md"),
    ),
    (
        "agents/marketing/content-creator.md",
        include_str!("../../../../agents/marketing/content-creator.md"),
    ),
    (
        "agents/support/support-responder.md",
        include_str!("../../../../agents/support/support-responder.md"),
    ),
];

/// On-disk registry layout
#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    agents: Vec<AgentDefinition>,
    #[serde(default)]
    combinations: Vec<CombinationRule>,
}

/// A validated, immutable registry of agents.
///
/// Registration order is preserved and used for tie-breaking. Exactly one
/// agent is the default; it is only ever reached by fallback.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    agents: Vec<AgentDefinition>,
    combinations: Vec<CombinationRule>,
    default_index: usize,
    base_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Validate and build a registry. Relative definition paths resolve
    /// against `base_dir` (or the working directory when `None`).
    pub fn new(
        agents: Vec<AgentDefinition>,
        combinations: Vec<CombinationRule>,
        base_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if agents.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut names = HashSet::new();
        let mut default_index: Option<usize> = None;
        let mut validated = Vec::with_capacity(agents.len());

        for (index, mut agent) in agents.into_iter().enumerate() {
            agent.name = agent.name.trim().to_string();
            if agent.name.is_empty() {
                return Err(ConfigError::BlankName);
            }
            if !names.insert(agent.name.clone()) {
                return Err(ConfigError::DuplicateName(agent.name));
            }

            agent.patterns = normalize_phrases(&agent.patterns)
                .ok_or_else(|| ConfigError::BlankPattern(agent.name.clone()))?;

            if agent.default {
                if let Some(first) = default_index {
                    let first: &AgentDefinition = &validated[first];
                    return Err(ConfigError::MultipleDefaults {
                        first: first.name.clone(),
                        second: agent.name,
                    });
                }
                default_index = Some(index);
            } else if agent.patterns.is_empty() {
                return Err(ConfigError::NoPatterns(agent.name));
            }

            validated.push(agent);
        }

        let default_index = default_index.ok_or(ConfigError::MissingDefault)?;

        let combinations = combinations
            .into_iter()
            .map(|rule| validate_combination(rule, &validated, default_index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            agents: validated,
            combinations,
            default_index,
            base_dir,
        })
    }

    /// Parse a registry from YAML text.
    pub fn from_yaml_str(yaml: &str, base_dir: Option<PathBuf>) -> Result<Self> {
        let doc: RegistryDocument = serde_yml::from_str(yaml)?;
        Self::new(doc.agents, doc.combinations, base_dir)
    }

    /// Load a registry file. Definition paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let config = Self::from_yaml_str(&content, base_dir)?;

        info!(
            "AgentConfig: loaded {} agents and {} combinations from {}",
            config.agents.len(),
            config.combinations.len(),
            path.display()
        );
        Ok(config)
    }

    /// The registry compiled into the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml_str(EMBEDDED_REGISTRY, None)
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// All agents, default included, in registration order.
    pub fn get_all_agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get_agent_by_name(&self, name: &str) -> Option<&AgentDefinition> {
        let name = name.trim();
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn get_agents_by_category(&self, category: &str) -> Vec<&AgentDefinition> {
        self.agents
            .iter()
            .filter(|a| a.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// Categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.agents
            .iter()
            .map(|a| a.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn default_agent(&self) -> &AgentDefinition {
        &self.agents[self.default_index]
    }

    pub(crate) fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn combinations(&self) -> &[CombinationRule] {
        &self.combinations
    }

    /// Agents with a pattern containing `keyword` (case-insensitive).
    pub fn search_agents(&self, keyword: &str) -> Vec<&AgentDefinition> {
        let keyword = normalize(keyword);
        if keyword.is_empty() {
            return Vec::new();
        }
        self.agents
            .iter()
            .filter(|a| a.patterns.iter().any(|p| p.contains(&keyword)))
            .collect()
    }

    pub fn resolve_definition_path(&self, agent: &AgentDefinition) -> PathBuf {
        match &self.base_dir {
            Some(base) if agent.definition_path.is_relative() => base.join(&agent.definition_path),
            _ => agent.definition_path.clone(),
        }
    }

    /// Report every agent whose definition document is missing.
    pub fn check_definitions(&self) -> Vec<IntegrityWarning> {
        let mut warnings = Vec::new();
        for agent in &self.agents {
            let path = self.resolve_definition_path(agent);
            if agent.definition_path.as_os_str().is_empty() || !path.is_file() {
                let warning = IntegrityWarning {
                    agent: agent.name.clone(),
                    path,
                };
                warn!("AgentConfig: {}", warning);
                warnings.push(warning);
            }
        }
        debug!(
            "AgentConfig: checked {} definitions, {} missing",
            self.agents.len(),
            warnings.len()
        );
        warnings
    }

    /// Markdown files sitting next to known definitions that no agent
    /// references.
    pub fn orphaned_definitions(&self) -> Vec<PathBuf> {
        let referenced: HashSet<PathBuf> = self
            .agents
            .iter()
            .map(|a| canonical(&self.resolve_definition_path(a)))
            .collect();

        let dirs: BTreeSet<PathBuf> = self
            .agents
            .iter()
            .filter_map(|a| self.resolve_definition_path(a).parent().map(Path::to_path_buf))
            .filter(|d| d.is_dir())
            .collect();

        let mut orphans = Vec::new();
        for dir in dirs {
            let pattern = format!(
                "{}/*.md",
                glob::Pattern::escape(&dir.to_string_lossy())
            );
            let entries = match glob::glob(&pattern) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("AgentConfig: cannot scan {}: {}", dir.display(), e);
                    continue;
                }
            };
            for path in entries.flatten() {
                if !referenced.contains(&canonical(&path)) {
                    warn!("AgentConfig: orphaned definition {}", path.display());
                    orphans.push(path);
                }
            }
        }
        orphans
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Normalize and de-duplicate phrases, keeping first-seen order.
/// Returns `None` if any phrase is blank.
fn normalize_phrases(phrases: &[String]) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(phrases.len());
    for phrase in phrases {
        let phrase = normalize(phrase);
        if phrase.is_empty() {
            return None;
        }
        if seen.insert(phrase.clone()) {
            out.push(phrase);
        }
    }
    Some(out)
}

fn validate_combination(
    mut rule: CombinationRule,
    agents: &[AgentDefinition],
    default_index: usize,
) -> Result<CombinationRule> {
    let invalid = |rule: &CombinationRule, reason: String| ConfigError::InvalidCombination {
        rule: rule.name.clone(),
        reason,
    };

    if rule.groups.is_empty() || rule.groups.iter().any(|g| g.is_empty()) {
        return Err(invalid(&rule, "every phrase group needs at least one phrase".into()));
    }
    let mut groups = Vec::with_capacity(rule.groups.len());
    for group in &rule.groups {
        let group = normalize_phrases(group)
            .ok_or_else(|| invalid(&rule, "blank trigger phrase".into()))?;
        groups.push(group);
    }
    rule.groups = groups;
    rule.unless = normalize_phrases(&rule.unless)
        .ok_or_else(|| invalid(&rule, "blank veto phrase".into()))?;

    let mut named = HashSet::new();
    for name in &rule.agents {
        let index = agents
            .iter()
            .position(|a| a.name == name.trim())
            .ok_or_else(|| invalid(&rule, format!("unknown agent '{}'", name)))?;
        if index == default_index {
            return Err(invalid(&rule, format!("cannot name the default agent '{}'", name)));
        }
        named.insert(index);
    }
    if named.len() < 2 {
        return Err(invalid(&rule, "must name at least two distinct agents".into()));
    }
    rule.agents = rule.agents.iter().map(|n| n.trim().to_string()).collect();

    Ok(rule)
}
