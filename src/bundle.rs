//! Toolkit bundles: flatten a manifest of components into archive entries.
//!
//! The first entry is always `README.md`. Every enabled component then
//! contributes its files under `.claude/<type folder>/<slug>/`, each one
//! prefixed with a small front-matter block naming the component.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::zip::FileEntry;

pub const BUNDLE_ROOT: &str = ".claude";

/// Where the components come from; named in every file header and the README.
pub const HOMEPAGE: &str = "https://ggprompts.com/claude-code";

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("no enabled components in toolkit")]
    EmptySelection,

    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Skill,
    Command,
    Agent,
    Hook,
    Mcp,
    #[serde(other)]
    Other,
}

impl ComponentKind {
    /// Folder the component's files live under.
    pub fn folder(self) -> &'static str {
        match self {
            ComponentKind::Skill => "skills",
            ComponentKind::Command => "commands",
            ComponentKind::Agent => "agents",
            ComponentKind::Hook => "hooks",
            ComponentKind::Mcp => "mcps",
            ComponentKind::Other => "other",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Skill => "skill",
            ComponentKind::Command => "command",
            ComponentKind::Agent => "agent",
            ComponentKind::Hook => "hook",
            ComponentKind::Mcp => "mcp",
            ComponentKind::Other => "other",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// `null`, missing and `[]` all mean "no files": a default file is
    /// generated instead.
    #[serde(default)]
    pub files: Option<Vec<ComponentFile>>,
}

fn enabled_by_default() -> bool {
    true
}

impl Component {
    fn base_path(&self) -> String {
        format!("{}/{}/{}", BUNDLE_ROOT, self.kind.folder(), self.slug)
    }

    fn header(&self, generated_at: &DateTime<Utc>) -> String {
        format!(
            "---\n\
             # Managed by GGPrompts - {}\n\
             # Component: {}\n\
             # Type: {}\n\
             # Downloaded: {}\n\
             ---\n\n",
            HOMEPAGE,
            self.name,
            self.kind,
            generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Description for the README, `None` when missing or empty.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    fn default_file_name(&self) -> String {
        match self.kind {
            ComponentKind::Command => format!("{}.md", self.slug),
            _ => "SKILL.md".to_string(),
        }
    }

    fn entries(&self, generated_at: &DateTime<Utc>, out: &mut Vec<FileEntry>) {
        let base = self.base_path();
        let header = self.header(generated_at);

        let files = match self.files.as_deref() {
            Some(files) if !files.is_empty() => files,
            _ => {
                out.push(FileEntry::new(
                    format!("{}/{}", base, self.default_file_name()),
                    format!("{}# {}\n\nNo content available.", header, self.name),
                ));
                return;
            }
        };

        for file in files {
            let path = if file.path.starts_with('/') {
                format!("{}{}", base, file.path)
            } else {
                format!("{}/{}", base, file.path)
            };
            out.push(FileEntry::new(path, format!("{}{}", header, file.content)));
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub components: Vec<Component>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, BundleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, BundleError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BundleError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&json)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.enabled)
    }
}

/// Ordered archive contents for the enabled components.
pub fn build_entries(
    manifest: &Manifest,
    generated_at: &DateTime<Utc>,
) -> Result<Vec<FileEntry>, BundleError> {
    let selected: Vec<&Component> = manifest.enabled().collect();
    if selected.is_empty() {
        return Err(BundleError::EmptySelection);
    }

    let mut entries = vec![FileEntry::new("README.md", readme(&selected, generated_at))];
    for component in &selected {
        component.entries(generated_at, &mut entries);
    }

    tracing::debug!(
        components = selected.len(),
        entries = entries.len(),
        "flattened toolkit"
    );

    Ok(entries)
}

fn readme(components: &[&Component], generated_at: &DateTime<Utc>) -> String {
    let contents = components
        .iter()
        .map(|c| {
            format!(
                "- **{}** ({}): {}",
                c.name,
                c.kind,
                c.description().unwrap_or("No description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# My Claude Code Toolkit\n\n\
         Downloaded from GGPrompts.com on {}\n\n\
         ## Contents\n\n\
         {}\n\n\
         ## Installation\n\n\
         1. Copy the `{}` folder to your home directory or project root\n\
         2. Restart Claude Code to load the plugins\n\n\
         For more skills and commands, visit {}\n",
        generated_at.format("%Y-%m-%d"),
        contents,
        BUNDLE_ROOT,
        HOMEPAGE
    )
}

/// Download name for a bundle generated at `generated_at`.
pub fn archive_file_name(generated_at: &DateTime<Utc>) -> String {
    format!("claude-code-toolkit-{}.zip", generated_at.format("%Y-%m-%d"))
}
