//! Routing outputs

use serde::Serialize;
use std::collections::BTreeMap;

/// Result of [`AgentRouter::analyze_task`](super::AgentRouter::analyze_task).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskAnalysis {
    pub is_multi_agent: bool,
    /// Match score per specialist (the default agent is never scored)
    pub scores: BTreeMap<String, u32>,
    /// Agents the task needs, strongest first
    pub required_agents: Vec<String>,
    /// Names of combination rules that fired
    pub triggered_combinations: Vec<String>,
    /// 0.0 on fallback, approaching 1.0 as more patterns match
    pub confidence: f32,
}

impl TaskAnalysis {
    pub fn score_for(&self, agent: &str) -> u32 {
        self.scores.get(agent).copied().unwrap_or(0)
    }
}

/// Everything the router knows about one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub selected_agent: String,
    /// True when no specialist matched and the default agent was chosen
    pub is_fallback: bool,
    pub confidence: f32,
    pub scores: BTreeMap<String, u32>,
    pub is_multi_agent: bool,
    pub required_agents: Vec<String>,
    pub triggered_combinations: Vec<String>,
}

impl RoutingDecision {
    pub fn score_for(&self, agent: &str) -> u32 {
        self.scores.get(agent).copied().unwrap_or(0)
    }

    /// Specialists with a non-zero score, highest first
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        let mut ranked: Vec<(&str, u32)> = self
            .scores
            .iter()
            .filter(|(_, score)| **score > 0)
            .map(|(name, score)| (name.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_skips_zero_scores() {
        let decision = RoutingDecision {
            selected_agent: "Backend Architect".into(),
            is_fallback: false,
            confidence: 0.7,
            scores: BTreeMap::from([
                ("Backend Architect".to_string(), 2),
                ("UI Designer".to_string(), 1),
                ("AI Engineer".to_string(), 0),
            ]),
            is_multi_agent: false,
            required_agents: vec!["Backend Architect".into()],
            triggered_combinations: vec![],
        };
        assert_eq!(decision.ranked(), vec![("Backend Architect", 2), ("UI Designer", 1)]);
        assert_eq!(decision.score_for("AI Engineer"), 0);
        assert_eq!(decision.score_for("Unknown"), 0);
    }

    #[test]
    fn test_serializes_to_json() {
        let analysis = TaskAnalysis {
            is_multi_agent: true,
            scores: BTreeMap::from([("Frontend Developer".to_string(), 1)]),
            required_agents: vec!["Frontend Developer".into(), "Backend Architect".into()],
            triggered_combinations: vec!["full-stack".into()],
            confidence: 0.5,
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["is_multi_agent"], true);
        assert_eq!(json["scores"]["Frontend Developer"], 1);
        assert_eq!(json["triggered_combinations"][0], "full-stack");
    }
}
