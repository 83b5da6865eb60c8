use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use agency_core::{
    AgentConfig, AgentRouter, CoordinationPlanner, EMBEDDED_DEFINITIONS, EMBEDDED_REGISTRY,
    PersonaLoader, RoutingDecision,
};
use config::AgencyConfig;

#[derive(Parser)]
#[command(name = "agency")]
#[command(version)]
#[command(about = "Agency - route tasks to specialist agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to an agent registry YAML (overrides the config file)
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory, default config, and agent registry
    Init,

    /// Pick the best agent for a task
    Route {
        /// Task description
        #[arg(required = true)]
        task: Vec<String>,
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show per-agent scores and multi-agent detection for a task
    Analyze {
        #[arg(required = true)]
        task: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// Build a coordination plan for a task
    Plan {
        #[arg(required = true)]
        task: Vec<String>,
        /// Print a Mermaid diagram instead of the summary
        #[arg(long, conflicts_with = "json")]
        mermaid: bool,
        #[arg(long)]
        json: bool,
    },

    /// List registered agents
    Agents {
        /// Only agents in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Find agents whose patterns contain a keyword
    Search { keyword: String },

    /// Show an agent's parsed definition document
    Persona {
        agent: String,
        #[arg(long)]
        json: bool,
    },

    /// Check that every agent's definition document exists
    Validate,

    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AgencyConfig::load(&cli.config)?;

    // Set up logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Config => cmd_config(&cfg),
        Commands::Route { task, json } => {
            let router = build_router(&cfg, &cli.registry)?;
            cmd_route(&router, &task.join(" "), json)
        }
        Commands::Analyze { task, json } => {
            let router = build_router(&cfg, &cli.registry)?;
            cmd_analyze(&router, &task.join(" "), json)
        }
        Commands::Plan { task, mermaid, json } => {
            let router = build_router(&cfg, &cli.registry)?;
            cmd_plan(&router, &cfg, &task.join(" "), mermaid, json)
        }
        Commands::Agents { category } => {
            let registry = cfg.load_registry(&cli.registry)?;
            cmd_agents(&registry, category.as_deref())
        }
        Commands::Search { keyword } => {
            let registry = cfg.load_registry(&cli.registry)?;
            cmd_search(&registry, &keyword)
        }
        Commands::Persona { agent, json } => {
            let registry = cfg.load_registry(&cli.registry)?;
            cmd_persona(&registry, &agent, json)
        }
        Commands::Validate => {
            let registry = cfg.load_registry(&cli.registry)?;
            cmd_validate(&registry)
        }
    }
}

fn build_router(cfg: &AgencyConfig, registry_path: &Option<PathBuf>) -> Result<AgentRouter> {
    let registry = cfg.load_registry(registry_path)?;
    Ok(AgentRouter::with_config(registry, cfg.routing.clone()))
}

fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    write_if_missing(&config_path, include_str!("../../../config/default.toml"))?;
    write_if_missing(&config_dir.join("agents.yaml"), EMBEDDED_REGISTRY)?;
    for (relative, content) in EMBEDDED_DEFINITIONS {
        write_if_missing(&config_dir.join(relative), content)?;
    }

    println!("Agency initialized at {}", config_dir.display());
    println!("Edit {} to customize agents and patterns.", config_dir.join("agents.yaml").display());
    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        warn!("{} already exists, leaving it unchanged", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Created {}", path.display());
    Ok(())
}

fn cmd_config(cfg: &AgencyConfig) -> Result<()> {
    println!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}

fn cmd_route(router: &AgentRouter, task: &str, json: bool) -> Result<()> {
    let decision = router.route(task);
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    if decision.is_fallback {
        println!("{} (fallback: no specialist matched)", decision.selected_agent);
    } else {
        println!(
            "{} (confidence {:.2})",
            decision.selected_agent, decision.confidence
        );
    }
    print_scores(&decision);
    if decision.is_multi_agent {
        println!("\nMulti-agent task: {}", decision.required_agents.join(", "));
    }
    Ok(())
}

fn cmd_analyze(router: &AgentRouter, task: &str, json: bool) -> Result<()> {
    let analysis = router.analyze_task(task);
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("Multi-agent: {}", if analysis.is_multi_agent { "yes" } else { "no" });
    println!("Required agents: {}", analysis.required_agents.join(", "));
    if !analysis.triggered_combinations.is_empty() {
        println!("Combinations: {}", analysis.triggered_combinations.join(", "));
    }
    println!("Confidence: {:.2}", analysis.confidence);
    println!("\nScores:");
    for agent in router.agents().iter().filter(|a| !a.is_default()) {
        println!("  {:<28} {}", agent.name, analysis.score_for(&agent.name));
    }
    Ok(())
}

fn print_scores(decision: &RoutingDecision) {
    let ranked = decision.ranked();
    if ranked.is_empty() {
        return;
    }
    println!("\nMatches:");
    for (name, score) in ranked {
        println!("  {:<28} {}", name, score);
    }
}

fn cmd_plan(router: &AgentRouter, cfg: &AgencyConfig, task: &str, mermaid: bool, json: bool) -> Result<()> {
    let planner = CoordinationPlanner::new(router, cfg.planning.clone());
    let plan = planner.plan(task);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else if mermaid {
        print!("{}", plan.mermaid());
    } else {
        print!("{}", plan.summary());
        for handoff in &plan.handoffs {
            println!("\n{}", handoff.message().trim_end());
        }
    }
    Ok(())
}

fn cmd_agents(registry: &AgentConfig, category: Option<&str>) -> Result<()> {
    let agents = match category {
        Some(category) => registry.get_agents_by_category(category),
        None => registry.get_all_agents().iter().collect(),
    };
    if agents.is_empty() {
        bail!("No agents found in category '{}'", category.unwrap_or_default());
    }

    for agent in agents {
        let marker = if agent.is_default() { " (default)" } else { "" };
        println!("{:<28} {:<12} {}{}", agent.name, agent.category, agent.description, marker);
    }
    Ok(())
}

fn cmd_search(registry: &AgentConfig, keyword: &str) -> Result<()> {
    let matches = registry.search_agents(keyword);
    if matches.is_empty() {
        println!("No agents match '{}'", keyword);
        return Ok(());
    }
    for agent in matches {
        println!("{:<28} {}", agent.name, agent.patterns.join(", "));
    }
    Ok(())
}

fn cmd_persona(registry: &AgentConfig, name: &str, json: bool) -> Result<()> {
    if registry.get_agent_by_name(name).is_none() {
        bail!("Unknown agent '{}'. Run `agency agents` to list them.", name);
    }

    let mut loader = PersonaLoader::new(registry);
    let Some(persona) = loader
        .load(name)
        .with_context(|| format!("Failed to load definition for '{}'", name))?
    else {
        bail!("No definition document found for '{}'. Run `agency validate`.", name);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(persona)?);
        return Ok(());
    }

    println!("# {}\n", persona.name);
    if !persona.description.is_empty() {
        println!("{}\n", persona.description);
    }
    print_list("Core Mission", &persona.core_mission);
    print_list("Workflow", &persona.workflow);
    print_list("Critical Rules", &persona.critical_rules);
    print_list("Success Metrics", &persona.success_metrics);
    print_list("Tone", &persona.communication_style.tone);
    print_list("Example Phrasing", &persona.communication_style.examples);
    if !persona.deliverables.is_empty() {
        println!("## Deliverables");
        for deliverable in &persona.deliverables {
            println!("- {}", deliverable.title);
        }
    }
    Ok(())
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("## {}", title);
    for item in items {
        println!("- {}", item);
    }
    println!();
}

fn cmd_validate(registry: &AgentConfig) -> Result<()> {
    let warnings = registry.check_definitions();
    let orphans = registry.orphaned_definitions();

    for orphan in &orphans {
        println!("unreferenced definition: {}", orphan.display());
    }
    for warning in &warnings {
        println!("missing: {}", warning);
    }

    if !warnings.is_empty() {
        bail!(
            "{} of {} agents are missing definition documents",
            warnings.len(),
            registry.len()
        );
    }
    println!("All {} agent definitions found.", registry.len());
    Ok(())
}
