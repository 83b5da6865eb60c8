//! Agent router - maps task text to the best-suited agent
//!
//! Scoring is plain phrase matching over a lower-cased task: an agent's score
//! is the number of its patterns present in the text. The highest score wins,
//! earlier registration breaks ties, and a task that matches nothing goes to
//! the registry's default agent. A multi-agent task is led by its
//! highest-scoring agent. Routing never fails and never touches the
//! filesystem.

pub mod decision;
pub mod matcher;

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::registry::{AgentConfig, AgentDefinition, CombinationRule};
pub use decision::{RoutingDecision, TaskAnalysis};
use matcher::{contains_phrase, normalize};

/// Tuning knobs for multi-agent detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Distinguishing matches an agent needs before it counts toward a
    /// multi-agent task
    pub min_confidence: u32,
    /// Upper bound on `required_agents` for multi-agent tasks
    pub max_required_agents: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 2,
            max_required_agents: 5,
        }
    }
}

#[derive(Debug)]
struct CompiledPattern {
    phrase: String,
    /// Only one agent in the registry lists this phrase
    distinguishing: bool,
}

#[derive(Debug)]
struct AgentMatcher {
    index: usize,
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone, Copy)]
struct AgentScore {
    index: usize,
    score: u32,
    distinguishing: u32,
}

/// Routes task descriptions to agents from an immutable registry.
#[derive(Debug)]
pub struct AgentRouter {
    registry: AgentConfig,
    config: RouterConfig,
    matchers: Vec<AgentMatcher>,
}

impl AgentRouter {
    pub fn new(registry: AgentConfig) -> Self {
        Self::with_config(registry, RouterConfig::default())
    }

    pub fn with_config(registry: AgentConfig, config: RouterConfig) -> Self {
        let matchers = {
            let specialists = || {
                registry
                    .get_all_agents()
                    .iter()
                    .enumerate()
                    .filter(|(_, agent)| !agent.is_default())
            };

            let mut owners: HashMap<&str, usize> = HashMap::new();
            for (_, agent) in specialists() {
                for pattern in &agent.patterns {
                    *owners.entry(pattern.as_str()).or_default() += 1;
                }
            }

            specialists()
                .map(|(index, agent)| AgentMatcher {
                    index,
                    patterns: agent
                        .patterns
                        .iter()
                        .map(|p| CompiledPattern {
                            phrase: p.clone(),
                            distinguishing: owners.get(p.as_str()).copied() == Some(1),
                        })
                        .collect(),
                })
                .collect::<Vec<_>>()
        };

        info!(
            "AgentRouter: initialized with {} specialists, default agent '{}'",
            matchers.len(),
            registry.default_agent().name
        );

        Self {
            registry,
            config,
            matchers,
        }
    }

    pub fn registry(&self) -> &AgentConfig {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn agents(&self) -> &[AgentDefinition] {
        self.registry.get_all_agents()
    }

    /// Pick the single best agent for a task, falling back to the default.
    ///
    /// For a multi-agent task this is the first of `required_agents`.
    pub fn select_agent(&self, task: &str) -> &AgentDefinition {
        let (index, _) = self.evaluate(&normalize(task));
        let agent = &self.registry.get_all_agents()[index];
        debug!(
            "AgentRouter: selected '{}' for task ({} chars)",
            agent.name,
            task.chars().count()
        );
        agent
    }

    /// Score a task against every specialist and decide whether it spans
    /// more than one specialty.
    pub fn analyze_task(&self, task: &str) -> TaskAnalysis {
        self.evaluate(&normalize(task)).1
    }

    /// Selection and analysis in one pass.
    pub fn route(&self, task: &str) -> RoutingDecision {
        let (index, analysis) = self.evaluate(&normalize(task));
        let selected = &self.registry.get_all_agents()[index];

        debug!(
            "AgentRouter: routed task ({} chars) → '{}' (multi_agent={}, confidence={:.2})",
            task.chars().count(),
            selected.name,
            analysis.is_multi_agent,
            analysis.confidence
        );

        RoutingDecision {
            selected_agent: selected.name.clone(),
            is_fallback: selected.is_default(),
            confidence: analysis.confidence,
            scores: analysis.scores,
            is_multi_agent: analysis.is_multi_agent,
            required_agents: analysis.required_agents,
            triggered_combinations: analysis.triggered_combinations,
        }
    }

    fn score(&self, normalized: &str) -> Vec<AgentScore> {
        self.matchers
            .iter()
            .map(|m| {
                let mut score = 0;
                let mut distinguishing = 0;
                for pattern in &m.patterns {
                    if contains_phrase(normalized, &pattern.phrase) {
                        score += 1;
                        if pattern.distinguishing {
                            distinguishing += 1;
                        }
                    }
                }
                AgentScore {
                    index: m.index,
                    score,
                    distinguishing,
                }
            })
            .collect()
    }

    /// Highest non-zero score; the first registered agent wins a tie.
    fn best(scores: &[AgentScore]) -> Option<AgentScore> {
        let mut best: Option<AgentScore> = None;
        for s in scores {
            if s.score > 0 && best.is_none_or(|b| s.score > b.score) {
                best = Some(*s);
            }
        }
        best
    }

    /// Registry index of the selected agent plus the full analysis.
    ///
    /// Candidates for a multi-agent task are the best-scoring agent, the
    /// agents named by fired combination rules that scored, and the strong
    /// agents of distinct specialties. A rule's agents are taken unscored only
    /// when nothing else in the task matched.
    fn evaluate(&self, normalized: &str) -> (usize, TaskAnalysis) {
        let agents = self.registry.get_all_agents();
        let scores = self.score(normalized);
        let score_of: HashMap<usize, u32> = scores.iter().map(|s| (s.index, s.score)).collect();
        let score_map: BTreeMap<String, u32> = scores
            .iter()
            .map(|s| (agents[s.index].name.clone(), s.score))
            .collect();
        let best = Self::best(&scores);

        let fired: Vec<&CombinationRule> = self
            .registry
            .combinations()
            .iter()
            .filter(|rule| fires(rule, normalized))
            .collect();

        let strong: Vec<&AgentScore> = scores
            .iter()
            .filter(|s| s.distinguishing >= self.config.min_confidence.max(1))
            .collect();
        let specialties: HashSet<&str> = strong
            .iter()
            .map(|s| agents[s.index].specialty())
            .collect();

        let mut candidates: Vec<usize> = best.iter().map(|b| b.index).collect();
        let named = fired
            .iter()
            .flat_map(|rule| rule.agents.iter())
            .filter_map(|name| agents.iter().position(|a| &a.name == name))
            .filter(|i| best.is_none() || score_of.get(i).is_some_and(|&score| score > 0));
        let strong_indices: Vec<usize> = if specialties.len() >= 2 {
            strong.iter().map(|s| s.index).collect()
        } else {
            Vec::new()
        };
        for index in named.chain(strong_indices) {
            if !candidates.contains(&index) {
                candidates.push(index);
            }
        }

        let is_multi_agent = candidates.len() >= 2;
        let (selected, required, triggered) = if is_multi_agent {
            candidates.sort_by_key(|i| (Reverse(score_of.get(i).copied().unwrap_or(0)), *i));
            candidates.truncate(self.config.max_required_agents.max(2));
            let selected = candidates
                .first()
                .copied()
                .unwrap_or_else(|| self.registry.default_index());
            (selected, candidates, fired)
        } else {
            let selected = best.map_or(self.registry.default_index(), |b| b.index);
            (selected, vec![selected], Vec::new())
        };

        let confidence = if agents[selected].is_default() {
            0.0
        } else {
            confidence_for(score_of.get(&selected).copied().unwrap_or(0))
        };

        let analysis = TaskAnalysis {
            is_multi_agent,
            scores: score_map,
            required_agents: required.iter().map(|&i| agents[i].name.clone()).collect(),
            triggered_combinations: triggered.iter().map(|r| r.name.clone()).collect(),
            confidence,
        };
        (selected, analysis)
    }
}

/// Every phrase group matches and no veto phrase is present.
fn fires(rule: &CombinationRule, normalized: &str) -> bool {
    rule.groups
        .iter()
        .all(|group| group.iter().any(|phrase| contains_phrase(normalized, phrase)))
        && !rule.unless.iter().any(|phrase| contains_phrase(normalized, phrase))
}

fn confidence_for(score: u32) -> f32 {
    (0.3 + 0.2 * score as f32).min(1.0)
}
