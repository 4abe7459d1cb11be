//! Upstream entity payloads as returned by the fetch capability.
//!
//! Field names follow the upstream JSON so payloads deserialize directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GitHub repository as returned by the REST `repos/{owner}/{repo}` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRepository {
    pub full_name: String,
    pub name: String,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<RepositoryLicense>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryLicense {
    #[serde(default)]
    pub spdx_id: Option<String>,
    pub name: String,
}

/// Entry of the Obsidian `community-plugins.json` registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsidianPlugin {
    pub id: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub repo: String,
    /// Download stats joined in from the run context before tracking; not
    /// part of the upstream registry entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PluginStats>,
}

/// Entry of the Obsidian `community-css-themes.json` registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsidianTheme {
    pub name: String,
    pub author: String,
    pub repo: String,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub modes: Vec<String>,
}

/// Entry of `community-plugin-stats.json`, keyed by plugin id upstream
///
/// Upstream flattens per-version download counts next to the totals, so
/// every key other than `downloads` and `updated` is a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginStats {
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub updated: i64,
    #[serde(flatten)]
    pub versions: BTreeMap<String, u64>,
}

impl PluginStats {
    /// Highest version by semantic ordering of dot-separated numeric parts
    pub fn latest_version(&self) -> Option<&str> {
        self.versions
            .keys()
            .max_by(|a, b| version_key(a).cmp(&version_key(b)))
            .map(|s| s.as_str())
    }
}

fn version_key(v: &str) -> Vec<u64> {
    v.split('.')
        .map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}
