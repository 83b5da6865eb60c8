//! Coordination planning for tasks that need one or more agents
//!
//! A plan walks the task through fixed stages (requirements, design,
//! implementation, testing, deployment). Each stage gets one or more steps
//! owned by the agents the router picked; a step depends on every step of
//! the stage before it, so steps within a stage can run in parallel.

mod render;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::registry::{AgentDefinition, Phase};
use crate::router::AgentRouter;
use crate::router::matcher::{contains_phrase, normalize};

/// Stage of a coordination plan, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Requirements,
    Design,
    Implementation,
    Testing,
    Deployment,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Requirements,
        Stage::Design,
        Stage::Implementation,
        Stage::Testing,
        Stage::Deployment,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requirements => write!(f, "requirements"),
            Self::Design => write!(f, "design"),
            Self::Implementation => write!(f, "implementation"),
            Self::Testing => write!(f, "testing"),
            Self::Deployment => write!(f, "deployment"),
        }
    }
}

/// Stage durations and trigger words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub requirements_hours: u32,
    pub design_hours: u32,
    pub implementation_hours: u32,
    pub testing_hours: u32,
    pub deployment_hours: u32,
    /// Words that mark a task as producing something that needs testing
    pub build_verbs: Vec<String>,
    /// Words that add a deployment stage
    pub deploy_words: Vec<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            requirements_hours: 2,
            design_hours: 4,
            implementation_hours: 6,
            testing_hours: 3,
            deployment_hours: 4,
            build_verbs: ["build", "implement", "create", "develop"]
                .map(String::from)
                .to_vec(),
            deploy_words: ["deploy", "deployment", "production", "release"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl PlanConfig {
    pub fn hours_for(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Requirements => self.requirements_hours,
            Stage::Design => self.design_hours,
            Stage::Implementation => self.implementation_hours,
            Stage::Testing => self.testing_hours,
            Stage::Deployment => self.deployment_hours,
        }
    }
}

/// An agent taking part in a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAgent {
    pub name: String,
    pub category: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    /// 1-based position in the plan
    pub number: usize,
    pub stage: Stage,
    pub agent: String,
    pub action: String,
    pub deliverable: String,
    pub hours: u32,
}

/// Work passing from one agent to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Handoff {
    pub from_step: usize,
    pub to_step: usize,
    pub from_agent: String,
    pub to_agent: String,
    pub deliverable: String,
    pub success_criteria: Vec<String>,
}

/// Steps of one stage that can run side by side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelGroup {
    pub stage: Stage,
    pub agents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinationPlan {
    pub task: String,
    pub is_multi_agent: bool,
    pub agents: Vec<PlanAgent>,
    pub steps: Vec<PlanStep>,
    pub handoffs: Vec<Handoff>,
    /// Step number → step numbers it waits on
    pub dependencies: BTreeMap<usize, Vec<usize>>,
    pub parallel_groups: Vec<ParallelGroup>,
    pub total_hours: u32,
    /// Hours when parallel steps overlap
    pub critical_path_hours: u32,
}

impl CoordinationPlan {
    pub fn steps_in(&self, stage: Stage) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(move |s| s.stage == stage)
    }
}

/// Builds coordination plans from routing results.
pub struct CoordinationPlanner<'a> {
    router: &'a AgentRouter,
    config: PlanConfig,
}

impl<'a> CoordinationPlanner<'a> {
    pub fn new(router: &'a AgentRouter, config: PlanConfig) -> Self {
        Self { router, config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn plan(&self, task: &str) -> CoordinationPlan {
        let decision = self.router.route(task);
        let registry = self.router.registry();

        let names = if decision.is_multi_agent {
            decision.required_agents.clone()
        } else {
            vec![decision.selected_agent.clone()]
        };
        let agents: Vec<&AgentDefinition> = names
            .iter()
            .filter_map(|name| registry.get_agent_by_name(name))
            .collect();
        let agents = if agents.is_empty() {
            vec![registry.default_agent()]
        } else {
            agents
        };

        let normalized = normalize(task);
        let stages = self.assign_stages(
            &agents,
            mentions(&normalized, &self.config.build_verbs),
            mentions(&normalized, &self.config.deploy_words),
        );

        let mut steps = Vec::new();
        for (stage, owners) in &stages {
            for agent in owners {
                steps.push(PlanStep {
                    number: steps.len() + 1,
                    stage: *stage,
                    agent: agent.name.clone(),
                    action: action_for(*stage, agent),
                    deliverable: deliverable_for(*stage, agent),
                    hours: self.config.hours_for(*stage),
                });
            }
        }

        let dependencies = dependencies(&steps);
        let handoffs = handoffs(&steps);
        let parallel_groups: Vec<ParallelGroup> = stages
            .iter()
            .filter(|(_, owners)| owners.len() >= 2)
            .map(|(stage, owners)| ParallelGroup {
                stage: *stage,
                agents: owners.iter().map(|a| a.name.clone()).collect(),
            })
            .collect();

        let total_hours: u32 = steps.iter().map(|s| s.hours).sum();
        let critical_path_hours: u32 = stages
            .iter()
            .map(|(stage, _)| self.config.hours_for(*stage))
            .sum();

        debug!(
            "CoordinationPlanner: {} agents, {} steps, {} handoffs for task ({} chars)",
            agents.len(),
            steps.len(),
            handoffs.len(),
            task.chars().count()
        );

        CoordinationPlan {
            task: task.trim().to_string(),
            is_multi_agent: decision.is_multi_agent,
            agents: agents
                .iter()
                .map(|a| PlanAgent {
                    name: a.name.clone(),
                    category: a.category.clone(),
                    phase: a.phase,
                })
                .collect(),
            steps,
            handoffs,
            dependencies,
            parallel_groups,
            total_hours,
            critical_path_hours,
        }
    }

    /// Owners per non-empty stage, in stage order.
    fn assign_stages<'r>(
        &self,
        agents: &[&'r AgentDefinition],
        builds: bool,
        deploys: bool,
    ) -> Vec<(Stage, Vec<&'r AgentDefinition>)> {
        let primary = agents[0];
        let in_phase = |phase: Phase| -> Vec<&'r AgentDefinition> {
            agents.iter().copied().filter(|a| a.phase == phase).collect()
        };

        let requirements = in_phase(Phase::Planning).into_iter().take(1).collect::<Vec<_>>();
        let requirements = if requirements.is_empty() { vec![primary] } else { requirements };

        let design = in_phase(Phase::Design);

        let implementation = in_phase(Phase::Implementation);
        let implementation = if implementation.is_empty() { vec![primary] } else { implementation };
        let lead = implementation[0];

        let testers = in_phase(Phase::Testing);
        let testing = if !testers.is_empty() {
            vec![testers[0]]
        } else if builds {
            vec![lead]
        } else {
            Vec::new()
        };

        let deployers = in_phase(Phase::Deployment);
        let deployment = if !deployers.is_empty() {
            vec![deployers[0]]
        } else if deploys {
            vec![lead]
        } else {
            Vec::new()
        };

        Stage::ALL
            .into_iter()
            .zip([requirements, design, implementation, testing, deployment])
            .filter(|(_, owners)| !owners.is_empty())
            .collect()
    }
}

fn mentions(normalized: &str, words: &[String]) -> bool {
    words.iter().any(|w| contains_phrase(normalized, &normalize(w)))
}

fn action_for(stage: Stage, agent: &AgentDefinition) -> String {
    match stage {
        Stage::Requirements => "Gather and document requirements".to_string(),
        Stage::Design => match agent.specialty() {
            "design" => "Design the user interface and interaction flows".to_string(),
            other => format!("Design the {} approach", other),
        },
        Stage::Implementation => format!("Implement the {} work", agent.specialty()),
        Stage::Testing => "Test the implementation and validate requirements".to_string(),
        Stage::Deployment => "Deploy to production and set up monitoring".to_string(),
    }
}

fn deliverable_for(stage: Stage, agent: &AgentDefinition) -> String {
    match stage {
        Stage::Requirements => "Requirements document with acceptance criteria".to_string(),
        Stage::Design => "Mockups, wireframes, and component specifications".to_string(),
        Stage::Implementation => format!("Working {} implementation with tests", agent.specialty()),
        Stage::Testing => "Test results and validation report".to_string(),
        Stage::Deployment => "Deployed release with monitoring and a CI/CD pipeline".to_string(),
    }
}

/// Every step waits on all steps of the previous stage.
fn dependencies(steps: &[PlanStep]) -> BTreeMap<usize, Vec<usize>> {
    let mut deps = BTreeMap::new();
    let mut previous: Vec<usize> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut stage: Option<Stage> = None;

    for step in steps {
        if stage != Some(step.stage) {
            if stage.is_some() {
                previous = std::mem::take(&mut current);
            }
            stage = Some(step.stage);
        }
        if !previous.is_empty() {
            deps.insert(step.number, previous.clone());
        }
        current.push(step.number);
    }
    deps
}

fn handoffs(steps: &[PlanStep]) -> Vec<Handoff> {
    steps
        .windows(2)
        .filter(|pair| pair[0].agent != pair[1].agent)
        .map(|pair| Handoff {
            from_step: pair[0].number,
            to_step: pair[1].number,
            from_agent: pair[0].agent.clone(),
            to_agent: pair[1].agent.clone(),
            deliverable: pair[0].deliverable.clone(),
            success_criteria: success_criteria(pair[0].stage),
        })
        .collect()
}

fn success_criteria(stage: Stage) -> Vec<String> {
    let specific: &[&str] = match stage {
        Stage::Requirements => &[
            "Requirements clearly defined and validated",
            "Acceptance criteria documented",
        ],
        Stage::Design => &["Design approved by stakeholders", "All components documented"],
        Stage::Implementation => &["All tests passing", "Code review completed"],
        Stage::Testing => &["No open critical defects", "Validation report shared"],
        Stage::Deployment => &["Monitoring and alerts active"],
    };
    std::iter::once("All deliverables completed and documented")
        .chain(specific.iter().copied())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentConfig;

    fn router() -> AgentRouter {
        AgentRouter::new(AgentConfig::embedded().unwrap())
    }

    fn stage_owners(plan: &CoordinationPlan, stage: Stage) -> Vec<&str> {
        plan.steps_in(stage).map(|s| s.agent.as_str()).collect()
    }

    #[test]
    fn test_full_stack_plan() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Build full-stack e-commerce platform with React and Node.js");

        assert!(plan.is_multi_agent);
        assert_eq!(plan.agents.len(), 2);
        assert_eq!(stage_owners(&plan, Stage::Requirements), vec!["Frontend Developer"]);
        assert!(stage_owners(&plan, Stage::Design).is_empty());
        assert_eq!(
            stage_owners(&plan, Stage::Implementation),
            vec!["Frontend Developer", "Backend Architect"]
        );
        assert_eq!(stage_owners(&plan, Stage::Testing), vec!["Frontend Developer"]);
        assert!(stage_owners(&plan, Stage::Deployment).is_empty());

        assert_eq!(plan.total_hours, 17);
        assert_eq!(plan.critical_path_hours, 11);
        assert_eq!(plan.parallel_groups.len(), 1);
        assert_eq!(plan.parallel_groups[0].stage, Stage::Implementation);
    }

    #[test]
    fn test_dependencies_follow_stages() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Build full-stack e-commerce platform with React and Node.js");

        // 1 requirements, 2-3 implementation, 4 testing
        assert!(!plan.dependencies.contains_key(&1));
        assert_eq!(plan.dependencies[&2], vec![1]);
        assert_eq!(plan.dependencies[&3], vec![1]);
        assert_eq!(plan.dependencies[&4], vec![2, 3]);
    }

    #[test]
    fn test_design_precedes_implementation() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Design and build user dashboard");

        assert!(plan.is_multi_agent);
        assert_eq!(stage_owners(&plan, Stage::Requirements), vec!["Frontend Developer"]);
        let design = plan.steps.iter().position(|s| s.stage == Stage::Design).unwrap();
        let implementation = plan.steps.iter().position(|s| s.stage == Stage::Implementation).unwrap();
        assert!(design < implementation);
        assert_eq!(plan.steps[design].agent, "UI Designer");
        assert_eq!(plan.steps[implementation].agent, "Frontend Developer");
        assert_eq!(stage_owners(&plan, Stage::Testing), vec!["Frontend Developer"]);

        let handoff = plan
            .handoffs
            .iter()
            .find(|h| h.from_agent == "UI Designer")
            .unwrap();
        assert_eq!(handoff.to_agent, "Frontend Developer");
        assert!(handoff.success_criteria.contains(&"Design approved by stakeholders".to_string()));
    }

    #[test]
    fn test_backend_design_task_has_no_design_stage() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Design the database schema and implement the endpoints");

        assert!(!plan.is_multi_agent);
        assert_eq!(plan.agents.len(), 1);
        assert_eq!(plan.agents[0].name, "Backend Architect");
        assert!(stage_owners(&plan, Stage::Design).is_empty());
        assert!(plan.steps.iter().all(|s| s.agent == "Backend Architect"));
        assert_eq!(plan.steps.len(), 3);
    }

    #[test]
    fn test_single_agent_plan_has_no_handoffs() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Optimize database queries");

        assert!(!plan.is_multi_agent);
        assert_eq!(plan.agents[0].name, "Backend Architect");
        // No build verb: requirements and implementation only
        assert_eq!(plan.steps.len(), 2);
        assert!(plan.handoffs.is_empty());
        assert!(plan.parallel_groups.is_empty());
        assert_eq!(plan.total_hours, 8);
    }

    #[test]
    fn test_deployment_stage() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());

        let plan = planner.plan("Build a React dashboard and release it");
        assert_eq!(stage_owners(&plan, Stage::Deployment), vec!["Frontend Developer"]);

        // DevOps involvement alone adds the stage
        let plan = planner.plan("Train a sentiment analysis model and set up docker with terraform");
        assert_eq!(stage_owners(&plan, Stage::Implementation), vec!["AI Engineer"]);
        assert_eq!(stage_owners(&plan, Stage::Deployment), vec!["DevOps Automator"]);
        assert_eq!(plan.steps.last().unwrap().stage, Stage::Deployment);
    }

    #[test]
    fn test_fallback_plan_uses_default_agent() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Help me with my project");
        assert_eq!(plan.agents.len(), 1);
        assert_eq!(plan.agents[0].name, "Senior Developer");
        assert!(plan.steps.iter().all(|s| s.agent == "Senior Developer"));
    }

    #[test]
    fn test_custom_hours() {
        let router = router();
        let config = PlanConfig {
            implementation_hours: 10,
            testing_hours: 1,
            ..PlanConfig::default()
        };
        let planner = CoordinationPlanner::new(&router, config);
        let plan = planner.plan("Build full-stack e-commerce platform with React and Node.js");
        assert_eq!(plan.total_hours, 2 + 10 + 10 + 1);
        assert_eq!(plan.critical_path_hours, 2 + 10 + 1);
    }

    #[test]
    fn test_step_numbers_are_sequential() {
        let router = router();
        let planner = CoordinationPlanner::new(&router, PlanConfig::default());
        let plan = planner.plan("Design and build a React dashboard with an API and deploy it");
        for (i, step) in plan.steps.iter().enumerate() {
            assert_eq!(step.number, i + 1);
        }
        let stages: Vec<Stage> = plan.steps.iter().map(|s| s.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
    }

    #[test]
    fn test_plan_config_deserialize_partial() {
        let config: PlanConfig = serde_json::from_str(r#"{"design_hours": 8}"#).unwrap();
        assert_eq!(config.design_hours, 8);
        assert_eq!(config.implementation_hours, 6);
        assert_eq!(config.build_verbs.len(), 4);
    }
}
