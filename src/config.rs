use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for pipeline-notify.
///
/// Every value can also be supplied on the command line or through the
/// environment; those take precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Slack webhook delivery
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// CodePipeline API access
    #[serde(default)]
    pub codepipeline: CodePipelineConfig,

    /// Event routing switches
    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookConfig {
    /// Slack incoming webhook URL (required at runtime)
    pub url: Option<String>,

    /// Request timeout for the webhook POST
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CodePipelineConfig {
    /// AWS region hosting the pipelines
    #[serde(default = "default_region")]
    pub region: String,

    /// Override for the API endpoint (defaults to the regional endpoint)
    pub endpoint: Option<String>,

    /// Request timeout for CodePipeline API calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RoutingConfig {
    /// Stage whose events also announce the revision being built
    #[serde(default = "default_build_stage")]
    pub build_stage: String,

    /// Send notifications for pipeline-level execution state changes
    #[serde(default)]
    pub pipeline_events: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CodePipelineConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            build_stage: default_build_stage(),
            pipeline_events: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_build_stage() -> String {
    "build".to_string()
}

const CANDIDATES: [&str; 4] = [
    "pipeline-notify.toml",
    "pipeline-notify.json",
    "pipeline-notify.yaml",
    "pipeline-notify.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipeline-notify.{toml,json,yaml,yml}
    /// 3. `<config dir>/pipeline-notify/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        for candidate in &CANDIDATES {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        Ok(Self::default())
    }

    /// Per-user configuration file location.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pipeline-notify").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Endpoint for CodePipeline API calls.
    pub fn codepipeline_endpoint(&self) -> String {
        self.codepipeline.endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://codepipeline.{}.amazonaws.com/",
                self.codepipeline.region
            )
        })
    }
}
