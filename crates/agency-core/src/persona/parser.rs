//! Definition document parser (frontmatter plus `##` sections)
//!
//! ```markdown
//! ---
//! name: Frontend Developer
//! description: Builds web interfaces
//! ---
//! ## 🎯 Your Core Mission
//! - Ship accessible UI
//!
//! ## Technical Deliverables
//! ### Component Spec
//! Props, states, and tests.
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{CommunicationStyle, Deliverable, Persona};
use crate::error::PersonaError;

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a definition document into a [`Persona`].
///
/// Frontmatter is optional, but if it is opened it must be closed and
/// valid YAML. Name and description stay empty when it is absent.
pub fn parse_persona(content: &str) -> Result<Persona, PersonaError> {
    let (frontmatter, body) = split_frontmatter(content)?;
    let sections = split_sections(body);

    let lookup = |keys: &[&str]| find_section(&sections, keys);

    Ok(Persona {
        name: frontmatter.name.unwrap_or_default().trim().to_string(),
        description: frontmatter.description.unwrap_or_default().trim().to_string(),
        core_mission: lookup(&["core mission", "mission"]).map(list_items).unwrap_or_default(),
        workflow: lookup(&["workflow process", "workflow"]).map(list_items).unwrap_or_default(),
        critical_rules: lookup(&["critical rules", "rules"]).map(list_items).unwrap_or_default(),
        success_metrics: lookup(&["success metrics", "metrics"]).map(list_items).unwrap_or_default(),
        deliverables: lookup(&["technical deliverables", "deliverables"])
            .map(deliverables)
            .unwrap_or_default(),
        communication_style: lookup(&["communication style", "communication"])
            .map(communication_style)
            .unwrap_or_default(),
        sections,
        path: None,
    })
}

fn split_frontmatter(content: &str) -> Result<(Frontmatter, &str), PersonaError> {
    let trimmed = content.trim_start();
    let Some(rest) = trimmed.strip_prefix("---") else {
        return Ok((Frontmatter::default(), content));
    };

    let end = rest.find("\n---").ok_or(PersonaError::UnclosedFrontmatter)?;
    let yaml = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('-');

    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yml::from_str(yaml)?
    };
    Ok((frontmatter, body))
}

/// Split on `## ` headers. Text before the first header is dropped and
/// `###` sub-headers stay inside their parent section.
fn split_sections(body: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in body.lines() {
        let header = line
            .strip_prefix("##")
            .filter(|rest| rest.starts_with(char::is_whitespace));
        match header {
            Some(title) => {
                if let Some((key, lines)) = current.take() {
                    sections.insert(key, lines.join("\n"));
                }
                current = Some((section_key(title), Vec::new()));
            }
            None => {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line);
                }
            }
        }
    }
    if let Some((key, lines)) = current {
        sections.insert(key, lines.join("\n"));
    }
    sections
}

/// First section whose key equals one of `keys`, else one that starts with
/// one of them as a whole word ("critical rules you must follow").
fn find_section<'a>(sections: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| sections.get(*k))
        .or_else(|| {
            keys.iter().find_map(|k| {
                sections
                    .iter()
                    .find(|(key, _)| key.strip_prefix(*k).is_some_and(|rest| rest.starts_with(' ')))
                    .map(|(_, body)| body)
            })
        })
        .map(String::as_str)
}

/// "🎯 Your Core Mission" → "core mission"
fn section_key(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    match cleaned.strip_prefix("your ") {
        Some(rest) => rest.to_string(),
        None => cleaned,
    }
}

/// Bullet (`-`, `*`) or numbered (`1.`, `2)`) item text, if the line is one.
fn list_item(line: &str) -> Option<&str> {
    let line = line.trim();
    let marker_end = line
        .find(|c: char| !(c == '-' || c == '*' || c.is_ascii_digit()))
        .unwrap_or(line.len());
    if marker_end == 0 {
        return None;
    }
    let rest = line[marker_end..].trim_start_matches(['.', ')']);
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let item = rest.trim();
    (!item.is_empty()).then_some(item)
}

fn list_items(section: &str) -> Vec<String> {
    section.lines().filter_map(list_item).map(str::to_string).collect()
}

/// `###` sub-headers become deliverables. Without any, each top-level list
/// item is one.
fn deliverables(section: &str) -> Vec<Deliverable> {
    let mut out = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    let mut in_code = false;
    let mut saw_subheader = false;

    for line in section.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_code = !in_code;
        }

        let title = if in_code {
            None
        } else if let Some(title) = trimmed.strip_prefix("### ") {
            saw_subheader = true;
            Some(title.trim().to_string())
        } else if !saw_subheader && !line.starts_with(char::is_whitespace) {
            list_item(trimmed).map(str::to_string)
        } else {
            None
        };

        match title {
            Some(title) => {
                if let Some((title, lines)) = current.take() {
                    out.push(Deliverable::new(title, &lines));
                }
                current = Some((title, Vec::new()));
            }
            None => {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line);
                }
            }
        }
    }
    if let Some((title, lines)) = current {
        out.push(Deliverable::new(title, &lines));
    }
    out
}

fn communication_style(section: &str) -> CommunicationStyle {
    CommunicationStyle {
        tone: tone(section),
        examples: examples(section),
    }
}

/// List items under a "Tone:" line, else the first three list items.
fn tone(section: &str) -> Vec<String> {
    let tone: Vec<String> = section
        .lines()
        .skip_while(|line| !line.replace('*', "").to_lowercase().contains("tone:"))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map_while(list_item)
        .map(str::to_string)
        .collect();
    if tone.is_empty() {
        list_items(section).into_iter().take(3).collect()
    } else {
        tone
    }
}

/// Quoted lines, else up to three lines after one mentioning "example".
fn examples(section: &str) -> Vec<String> {
    let quoted: Vec<String> = section.lines().filter_map(quotation).collect();
    if !quoted.is_empty() {
        return quoted;
    }
    section
        .lines()
        .skip_while(|line| !line.to_lowercase().contains("example"))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(3)
        .map(|line| list_item(line).unwrap_or(line).to_string())
        .collect()
}

/// `> text`, `"text"` or `- "text"`, without the quote marks.
fn quotation(line: &str) -> Option<String> {
    let line = list_item(line).unwrap_or(line.trim());
    let text = match line.strip_prefix('>') {
        Some(rest) => rest.trim().trim_matches('"'),
        None => line.strip_prefix('"')?.split('"').next().unwrap_or_default(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Deliverable {
    fn new(title: String, lines: &[&str]) -> Self {
        Self {
            title,
            content: lines.join("\n").trim().to_string(),
        }
    }
}
