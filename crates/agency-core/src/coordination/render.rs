//! Markdown and Mermaid output for coordination plans

use super::{CoordinationPlan, Handoff};

impl CoordinationPlan {
    /// Human-readable markdown summary.
    pub fn summary(&self) -> String {
        let mut out = format!("## Coordination Plan: {}\n\n", self.task);

        out.push_str(&format!("**Agents Involved:** {}\n", self.agents.len()));
        for agent in &self.agents {
            out.push_str(&format!("- **{}** ({}, {})\n", agent.name, agent.category, agent.phase));
        }
        out.push('\n');

        out.push_str(&format!("**Execution Sequence:** {} steps\n", self.steps.len()));
        for step in &self.steps {
            out.push_str(&format!(
                "{}. [{}] {}: {} ({}h)\n",
                step.number, step.stage, step.agent, step.action, step.hours
            ));
        }
        out.push('\n');

        if !self.handoffs.is_empty() {
            out.push_str(&format!("**Handoff Points:** {}\n", self.handoffs.len()));
            for (i, handoff) in self.handoffs.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {} → {} (after step {})\n",
                    i + 1,
                    handoff.from_agent,
                    handoff.to_agent,
                    handoff.from_step
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "**Estimated Time:** {} hours total, {} hours on the critical path\n",
            self.total_hours, self.critical_path_hours
        ));

        if !self.parallel_groups.is_empty() {
            out.push_str(&format!(
                "\n**Parallel Work:** {} groups\n",
                self.parallel_groups.len()
            ));
            for (i, group) in self.parallel_groups.iter().enumerate() {
                out.push_str(&format!("{}. {}: {}\n", i + 1, group.stage, group.agents.join(", ")));
            }
        }

        out
    }

    /// Mermaid flowchart of steps and their dependencies.
    pub fn mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        for step in &self.steps {
            out.push_str(&format!(
                "    S{}[\"{}. {}: {}\"]\n",
                step.number,
                step.number,
                escape(&step.agent),
                escape(&step.action)
            ));
        }
        for (step, deps) in &self.dependencies {
            for dep in deps {
                out.push_str(&format!("    S{} --> S{}\n", dep, step));
            }
        }
        for handoff in &self.handoffs {
            out.push_str(&format!(
                "    %% Handoff: {} to {}\n",
                handoff.from_agent, handoff.to_agent
            ));
        }
        out
    }
}

impl Handoff {
    /// Message the sending agent posts when passing work on.
    pub fn message(&self) -> String {
        let mut out = format!("**Handoff: {} → {}**\n\n", self.from_agent, self.to_agent);
        out.push_str(&format!("**Deliverable:** {}\n\n", self.deliverable));
        out.push_str("**Success Criteria:**\n");
        for criterion in &self.success_criteria {
            out.push_str(&format!("- {}\n", criterion));
        }
        out
    }
}

fn escape(label: &str) -> String {
    label.replace('"', "#quot;")
}

#[cfg(test)]
mod tests {
    use crate::coordination::{CoordinationPlanner, PlanConfig};
    use crate::registry::AgentConfig;
    use crate::router::AgentRouter;

    fn plan(task: &str) -> crate::coordination::CoordinationPlan {
        let router = AgentRouter::new(AgentConfig::embedded().unwrap());
        CoordinationPlanner::new(&router, PlanConfig::default()).plan(task)
    }

    #[test]
    fn test_summary() {
        let summary = plan("Build full-stack e-commerce platform with React and Node.js").summary();
        assert!(summary.starts_with("## Coordination Plan: Build full-stack"));
        assert!(summary.contains("**Agents Involved:** 2"));
        assert!(summary.contains("- **Backend Architect** (engineering, implementation)"));
        assert!(summary.contains("**Execution Sequence:** 4 steps"));
        assert!(summary.contains("1. [requirements] Frontend Developer: Gather and document requirements (2h)"));
        assert!(summary.contains("Frontend Developer → Backend Architect"));
        assert!(summary.contains("17 hours total, 11 hours on the critical path"));
        assert!(summary.contains("implementation: Frontend Developer, Backend Architect"));
    }

    #[test]
    fn test_summary_single_agent_omits_handoffs() {
        let summary = plan("Optimize database queries").summary();
        assert!(!summary.contains("Handoff Points"));
        assert!(!summary.contains("Parallel Work"));
    }

    #[test]
    fn test_mermaid() {
        let diagram = plan("Build full-stack e-commerce platform with React and Node.js").mermaid();
        assert!(diagram.starts_with("graph TD\n"));
        assert!(diagram.contains("    S1[\"1. Frontend Developer: Gather and document requirements\"]"));
        assert!(diagram.contains("    S1 --> S2"));
        assert!(diagram.contains("    S1 --> S3"));
        assert!(diagram.contains("    S3 --> S4"));
        assert!(diagram.contains("%% Handoff: Frontend Developer to Backend Architect"));
    }

    #[test]
    fn test_handoff_message() {
        let plan = plan("Design and build user dashboard");
        let handoff = &plan.handoffs[1];
        let message = handoff.message();
        assert!(message.starts_with("**Handoff: UI Designer → Frontend Developer**"));
        assert!(message.contains("**Deliverable:** Mockups, wireframes, and component specifications"));
        assert!(message.contains("- All deliverables completed and documented"));
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(super::escape("say \"hi\""), "say #quot;hi#quot;");
    }
}
