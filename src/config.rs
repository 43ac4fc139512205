//! Harvest configuration
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults (the Apache Jira and its SPARK, KAFKA, HADOOP projects)
//! 2. An optional YAML file, `harvest.yml` by default
//! 3. Environment variables (`JIRA_URL`, `JIRA_PROJECTS`), then CLI flags
//!
//! Example `harvest.yml`:
//! ```yaml
//! base_url: https://issues.apache.org/jira/rest/api/2
//! projects: [SPARK, KAFKA]
//! page_size: 50
//! output: corpus/jira.jsonl
//! state: corpus/state.json
//! ```

use crate::client::RetryPolicy;
use crate::etl::DriverSettings;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "harvest.yml";

/// Everything a harvest run needs, passed explicitly to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Jira REST API base
    pub base_url: String,
    /// Projects to harvest, in order
    pub projects: Vec<String>,
    /// Issues requested per search call
    pub page_size: u64,
    /// NDJSON corpus, appended to
    pub output: PathBuf,
    /// Checkpoint file
    pub state: PathBuf,
    /// Skip examples whose id is already in the output file
    pub dedupe: bool,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub backoff_base_ms: u64,
    pub max_backoff_secs: u64,
    pub failure_cooldown_secs: u64,
    pub max_page_failures: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://issues.apache.org/jira/rest/api/2".to_string(),
            projects: vec!["SPARK".into(), "KAFKA".into(), "HADOOP".into()],
            page_size: 100,
            output: PathBuf::from("jira_corpus.jsonl"),
            state: PathBuf::from("state.json"),
            dedupe: false,
            request_timeout_secs: 30,
            max_retries: 5,
            backoff_base_ms: 1000,
            max_backoff_secs: 60,
            failure_cooldown_secs: 30,
            max_page_failures: 5,
        }
    }
}

impl HarvestConfig {
    /// Read configuration from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;

        let config: Self = serde_yaml::from_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", path.as_ref().display())
        })?;

        Ok(config)
    }

    /// Load configuration from `path`, or from `harvest.yml` if present.
    ///
    /// An explicitly given file must exist. Without one, a missing
    /// `harvest.yml` just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                Self::read(path)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                log::debug!("Loading config from {}", DEFAULT_CONFIG_FILE);
                Self::read(DEFAULT_CONFIG_FILE)
            }
            None => {
                log::debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply overrides from the process environment
    ///
    /// - JIRA_URL: REST API base URL
    /// - JIRA_PROJECTS: comma-separated project keys
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("JIRA_URL").filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(projects) = lookup("JIRA_PROJECTS") {
            self.projects = parse_project_list(&projects);
        }
    }

    /// Check the settings before a run
    pub fn validate(&self) -> Result<()> {
        self.url()?;
        if self.page_size == 0 {
            eyre::bail!("page_size must be at least 1");
        }
        if self.max_page_failures == 0 {
            eyre::bail!("max_page_failures must be at least 1");
        }
        if let Some(dup) = self
            .projects
            .iter()
            .enumerate()
            .find(|(i, p)| self.projects[..*i].contains(p))
            .map(|(_, p)| p)
        {
            eyre::bail!("Project {} is listed more than once", dup);
        }
        Ok(())
    }

    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid Jira URL: {}", self.base_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            page_size: self.page_size,
            max_page_failures: self.max_page_failures,
            failure_cooldown: Duration::from_secs(self.failure_cooldown_secs),
        }
    }
}

/// Split a comma-separated project list, dropping blanks
pub fn parse_project_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
