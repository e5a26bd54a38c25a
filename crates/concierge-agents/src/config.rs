use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use rig::providers::openai;
use serde::Deserialize;

use crate::errors::RunError;
use crate::tools::{JsonRpcToolProvider, ProviderSet, ToolPermission, ToolPolicy, ToolProvider};

/// OpenAI-compatible inference endpoint used by every node.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelEndpoint {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
}

impl Default for ModelEndpoint {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            temperature: None,
        }
    }
}

/// JSON-RPC tool provider endpoints. An unset family leaves its tools
/// registered but failing with a "no provider configured" error result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolEndpoints {
    pub search_url: Option<String>,
    pub mail_url: Option<String>,
    pub calendar_url: Option<String>,
    pub api_key: Option<String>,
}

/// Top-level orchestrator configuration.
///
/// Resolution order: built-in defaults, then the TOML file (if any), then
/// `CONCIERGE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Hard cap on state-machine transitions per run, forced `→ Done` included.
    pub max_transitions: usize,
    /// Model calls allowed within a single node visit.
    pub max_node_steps: usize,
    /// Worker answers longer than this are considered substantive.
    pub min_worker_answer_chars: usize,
    /// IANA zone attached to bare local event times.
    pub default_time_zone: String,
    pub tool_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub model: ModelEndpoint,
    pub tools: ToolEndpoints,
    /// Overrides on top of the built-in permission table.
    pub permissions: HashMap<String, ToolPermission>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_transitions: 25,
            max_node_steps: 10,
            min_worker_answer_chars: 100,
            default_time_zone: "America/New_York".into(),
            tool_timeout_secs: 60,
            model_timeout_secs: 120,
            model: ModelEndpoint::default(),
            tools: ToolEndpoints::default(),
            permissions: HashMap::new(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
    }
}

impl OrchestratorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse orchestrator config")
    }

    /// Load from `path` (or defaults when `None`), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `CONCIERGE_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse("CONCIERGE_MAX_TRANSITIONS")? {
            self.max_transitions = v;
        }
        if let Some(v) = env_parse("CONCIERGE_MAX_NODE_STEPS")? {
            self.max_node_steps = v;
        }
        if let Some(v) = env_parse("CONCIERGE_MIN_ANSWER_CHARS")? {
            self.min_worker_answer_chars = v;
        }
        if let Some(v) = env_string("CONCIERGE_DEFAULT_TZ") {
            self.default_time_zone = v;
        }
        if let Some(v) = env_parse("CONCIERGE_TOOL_TIMEOUT_SECS")? {
            self.tool_timeout_secs = v;
        }
        if let Some(v) = env_parse("CONCIERGE_MODEL_TIMEOUT_SECS")? {
            self.model_timeout_secs = v;
        }
        if let Some(v) = env_string("CONCIERGE_MODEL_URL") {
            self.model.url = v;
        }
        if let Some(v) = env_string("CONCIERGE_MODEL") {
            self.model.model = v;
        }
        if let Some(v) = env_string("CONCIERGE_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = env_string("CONCIERGE_SEARCH_URL") {
            self.tools.search_url = Some(v);
        }
        if let Some(v) = env_string("CONCIERGE_MAIL_URL") {
            self.tools.mail_url = Some(v);
        }
        if let Some(v) = env_string("CONCIERGE_CALENDAR_URL") {
            self.tools.calendar_url = Some(v);
        }
        if let Some(v) = env_string("CONCIERGE_TOOLS_API_KEY") {
            self.tools.api_key = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.max_transitions < 2 {
            return Err(RunError::Configuration(format!(
                "max_transitions must be at least 2 (got {})",
                self.max_transitions
            )));
        }
        if self.max_node_steps == 0 {
            return Err(RunError::Configuration(
                "max_node_steps must be positive".into(),
            ));
        }
        if self.min_worker_answer_chars == 0 {
            return Err(RunError::Configuration(
                "min_worker_answer_chars must be positive".into(),
            ));
        }
        self.default_zone()?;
        Ok(())
    }

    pub fn default_zone(&self) -> Result<Tz, RunError> {
        self.default_time_zone.parse::<Tz>().map_err(|_| {
            RunError::Configuration(format!(
                "unknown time zone `{}`",
                self.default_time_zone
            ))
        })
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Built-in permission table with the configured overrides applied.
    pub fn policy(&self) -> ToolPolicy {
        ToolPolicy::default().merged(&self.permissions)
    }

    /// JSON-RPC providers for every configured tool family.
    pub fn providers(&self) -> Result<ProviderSet> {
        let build = |url: &Option<String>| -> Result<Option<Arc<dyn ToolProvider>>> {
            match url {
                None => Ok(None),
                Some(url) => {
                    let provider =
                        JsonRpcToolProvider::new(url, self.tools.api_key.clone(), self.tool_timeout())?;
                    Ok(Some(Arc::new(provider)))
                }
            }
        };
        Ok(ProviderSet {
            search: build(&self.tools.search_url)?,
            mail: build(&self.tools.mail_url)?,
            calendar: build(&self.tools.calendar_url)?,
        })
    }

    pub fn model_client(&self) -> Result<openai::CompletionsClient> {
        openai::CompletionsClient::builder()
            .api_key(self.model.api_key.as_deref().unwrap_or("not-needed"))
            .base_url(&self.model.url)
            .build()
            .with_context(|| format!("Failed to build model client for {}", self.model.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_transitions, 25);
        assert_eq!(config.max_node_steps, 10);
        assert_eq!(config.min_worker_answer_chars, 100);
        assert_eq!(config.default_zone().unwrap(), chrono_tz::America::New_York);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            max_transitions = 8
            default_time_zone = "Europe/Berlin"

            [tools]
            search_url = "http://search.local/rpc"

            [permissions]
            send_email = "blocked"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_transitions, 8);
        assert_eq!(config.max_node_steps, 10);
        assert_eq!(config.default_zone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.tools.search_url.as_deref(), Some("http://search.local/rpc"));
        assert!(config.tools.mail_url.is_none());
        assert_eq!(config.policy().permission_for("send_email"), ToolPermission::Blocked);
        assert_eq!(
            config.policy().permission_for("web_search"),
            ToolPermission::AlwaysAllow
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = OrchestratorConfig {
            max_transitions: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RunError::Configuration(_))));

        config.max_transitions = 25;
        config.default_time_zone = "Mars/Olympus_Mons".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));

        config.default_time_zone = "UTC".into();
        config.max_node_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_node_steps = 4\n[model]\nmodel = \"local-model\"").unwrap();
        let config = OrchestratorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_node_steps, 4);
        assert_eq!(config.model.model, "local-model");
        assert_eq!(config.model.url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_load_reports_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_transitions = \"many\"").unwrap();
        let err = OrchestratorConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid config file"));
    }

    #[test]
    fn test_providers_only_for_configured_families() {
        let config = OrchestratorConfig {
            tools: ToolEndpoints {
                mail_url: Some("http://mail.local/rpc".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let providers = config.providers().unwrap();
        assert!(providers.search.is_none());
        assert!(providers.mail.is_some());
        assert!(providers.calendar.is_none());
    }
}
