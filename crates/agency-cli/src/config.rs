use agency_core::{AgentConfig, PlanConfig, RouterConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgencyConfig {
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub routing: RouterConfig,
    #[serde(default)]
    pub planning: PlanConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Registry YAML; the embedded registry is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("AGENCY_HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agency")
}

impl AgencyConfig {
    /// Load settings from `custom_path`, or `~/.agency/config.toml`.
    ///
    /// A missing default file yields the built-in defaults; a missing custom
    /// file is an error.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path.clone(),
            None => {
                let path = config_dir().join("config.toml");
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `agency init` first.",
                path.display()
            )
        })?;
        Self::parse(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Registry to route against: `--registry` first, then `[registry] path`,
    /// then the embedded registry.
    pub fn load_registry(&self, override_path: &Option<PathBuf>) -> Result<AgentConfig> {
        let path = override_path
            .clone()
            .or_else(|| self.registry.path.as_deref().map(expand_home));

        match path {
            Some(path) => AgentConfig::load(&path).with_context(|| {
                format!("Failed to load agent registry {}", path.display())
            }),
            None => {
                info!("Using embedded agent registry");
                AgentConfig::embedded().context("Embedded agent registry is invalid")
            }
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| Path::new(path).to_path_buf()),
        None => PathBuf::from(path),
    }
}

/// Variables `${NAME}` may refer to in `config.toml`; others stay as written.
const ALLOWED_ENV_VARS: &[&str] = &["HOME", "USER", "AGENCY_HOME"];

fn expand_env_vars(s: &str) -> String {
    expand_vars(s, |name| std::env::var(name).ok())
}

/// Single left-to-right pass; substituted values are not expanded again.
fn expand_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if ALLOWED_ENV_VARS.contains(&name) {
            out.push_str(&lookup(name).unwrap_or_default());
        } else {
            warn!("Leaving ${{{}}} unexpanded: not an allowed config variable", name);
            out.push_str(&rest[start..start + 2 + end + 1]);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

    #[test]
    fn test_default_config_parses() {
        let config = AgencyConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.routing, RouterConfig::default());
        assert_eq!(config.planning, PlanConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.registry.path.unwrap().ends_with(".agency/agents.yaml"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AgencyConfig::parse("").unwrap();
        assert!(config.registry.path.is_none());
        assert_eq!(config.routing.min_confidence, 2);
        assert_eq!(config.routing.max_required_agents, 5);
        assert_eq!(config.planning.testing_hours, 3);
    }

    #[test]
    fn test_partial_sections() {
        let config = AgencyConfig::parse("[routing]\nmin_confidence = 3\n[planning]\ndesign_hours = 8\n").unwrap();
        assert_eq!(config.routing.min_confidence, 3);
        assert_eq!(config.routing.max_required_agents, 5);
        assert_eq!(config.planning.design_hours, 8);
        assert_eq!(config.planning.implementation_hours, 6);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AgencyConfig::parse("[routing\nmin_confidence = ").is_err());
    }

    fn lookup(name: &str) -> Option<String> {
        match name {
            "AGENCY_HOME" => Some("/opt/agency".to_string()),
            "USER" => Some("${HOME}".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_allowed_var() {
        assert_eq!(
            expand_vars("path = \"${AGENCY_HOME}/agents.yaml\"", lookup),
            "path = \"/opt/agency/agents.yaml\""
        );
        assert_eq!(expand_vars("${HOME}/x", lookup), "/x");
    }

    #[test]
    fn test_expanded_value_is_not_reexpanded() {
        assert_eq!(expand_vars("owner = \"${USER}\"", lookup), "owner = \"${HOME}\"");
    }

    #[test]
    fn test_expand_mixed_allowed_and_unlisted() {
        assert_eq!(
            expand_vars("${SECRET}:${AGENCY_HOME}:${AGENCY_HOME}", lookup),
            "${SECRET}:/opt/agency:/opt/agency"
        );
    }

    #[test]
    fn test_expand_skips_unlisted_var() {
        let input = "token = \"${SECRET_TOKEN}\"";
        assert_eq!(expand_env_vars(input), input);
    }

    #[test]
    fn test_expand_unterminated() {
        assert_eq!(expand_env_vars("path = \"${HOME"), "path = \"${HOME");
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/agents.yaml"), PathBuf::from("/etc/agents.yaml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/agents.yaml"), home.join("agents.yaml"));
        }
    }

    #[test]
    fn test_load_missing_custom_path_fails() {
        let result = AgencyConfig::load(&Some(PathBuf::from("/nonexistent/agency.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        let config = AgencyConfig::load(&Some(path)).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_registry_precedence() {
        let tmp = TempDir::new().unwrap();
        let registry_path = tmp.path().join("agents.yaml");
        std::fs::write(
            &registry_path,
            "agents:\n  - name: Only Agent\n    patterns: [rust]\n  - name: Fallback\n    default: true\n",
        )
        .unwrap();

        // Embedded when nothing is configured
        let config = AgencyConfig::default();
        assert!(config.load_registry(&None).unwrap().len() >= 10);

        // Config file path
        let config = AgencyConfig {
            registry: RegistrySettings {
                path: Some(registry_path.to_string_lossy().into_owned()),
            },
            ..AgencyConfig::default()
        };
        assert_eq!(config.load_registry(&None).unwrap().len(), 2);

        // Flag wins over the config file
        let err = config
            .load_registry(&Some(tmp.path().join("missing.yaml")))
            .unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }
}
