//! Configuration for the songplan service
//!
//! Built once at startup from defaults, an optional TOML file
//! (`~/.config/songplan/config.toml` or `--config`), and environment
//! variables, then handed to the pipeline and upstream client.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
/// Fallback lesson length when the model gives no usable number.
pub const DEFAULT_DURATION_MIN: u32 = 20;
/// Cap on upstream diagnostics forwarded to callers.
pub const DEFAULT_MAX_DETAIL_CHARS: usize = 4000;

/// How the compose request asks the model to shape its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Strict JSON Schema structured output.
    #[default]
    JsonSchema,
    /// Generic JSON mode, no schema.
    JsonObject,
    /// Free text; recovery does all the work.
    Text,
}

impl FromStr for OutputMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json_schema" => Ok(OutputMode::JsonSchema),
            "json_object" => Ok(OutputMode::JsonObject),
            "text" => Ok(OutputMode::Text),
            other => Err(anyhow!(
                "unknown output mode '{}' (expected json_schema, json_object or text)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{}' (expected pretty or json)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    /// Upper bound on one upstream call, including generation time.
    pub timeout_ms: u64,
    pub max_output_tokens: u32,
    /// `None` leaves the model's own default (some reasoning models reject it).
    pub temperature: Option<f32>,
    pub output_mode: OutputMode,
    pub max_detail_chars: usize,
    pub default_duration_min: u32,
    pub bind: String,
    pub log_format: LogFormat,
    /// Replaces the built-in compose user template when set.
    pub compose_prompt: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: 60_000,
            max_output_tokens: 4096,
            temperature: Some(0.7),
            output_mode: OutputMode::default(),
            max_detail_chars: DEFAULT_MAX_DETAIL_CHARS,
            default_duration_min: DEFAULT_DURATION_MIN,
            bind: DEFAULT_BIND.to_string(),
            log_format: LogFormat::default(),
            compose_prompt: None,
        }
    }
}

fn parse_env<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("invalid value for {}: {} ({})", key, raw, e))
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("songplan"))
    }

    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load `.env`, the TOML file (explicit path, else the default path when
    /// it exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay environment variables. `lookup` is injected so tests do not
    /// touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(v) = lookup("SONGPLAN_API_BASE") {
            self.api_base = v.trim().to_string();
        }
        if let Some(v) = lookup("SONGPLAN_MODEL") {
            self.model = v.trim().to_string();
        }
        if let Some(v) = lookup("SONGPLAN_TIMEOUT_MS") {
            self.timeout_ms = parse_env("SONGPLAN_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("SONGPLAN_MAX_OUTPUT_TOKENS") {
            self.max_output_tokens = parse_env("SONGPLAN_MAX_OUTPUT_TOKENS", &v)?;
        }
        if let Some(v) = lookup("SONGPLAN_TEMPERATURE") {
            self.temperature = match v.trim() {
                "" | "none" | "default" => None,
                raw => Some(parse_env("SONGPLAN_TEMPERATURE", raw)?),
            };
        }
        if let Some(v) = lookup("SONGPLAN_OUTPUT_MODE") {
            self.output_mode = parse_env("SONGPLAN_OUTPUT_MODE", &v)?;
        }
        if let Some(v) = lookup("SONGPLAN_MAX_DETAIL_CHARS") {
            self.max_detail_chars = parse_env("SONGPLAN_MAX_DETAIL_CHARS", &v)?;
        }
        if let Some(v) = lookup("SONGPLAN_DEFAULT_DURATION_MIN") {
            self.default_duration_min = parse_env("SONGPLAN_DEFAULT_DURATION_MIN", &v)?;
        }
        if let Some(v) = lookup("SONGPLAN_BIND") {
            self.bind = v.trim().to_string();
        }
        if let Some(v) = lookup("SONGPLAN_LOG_FORMAT") {
            self.log_format = parse_env("SONGPLAN_LOG_FORMAT", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base = url::Url::parse(&self.api_base)
            .with_context(|| format!("api_base is not a valid URL: {}", self.api_base))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("api_base must be http(s): {}", self.api_base));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        if self.timeout_ms == 0 {
            return Err(anyhow!("timeout_ms must be greater than zero"));
        }
        if self.max_output_tokens == 0 {
            return Err(anyhow!("max_output_tokens must be greater than zero"));
        }
        if self.max_detail_chars == 0 {
            return Err(anyhow!("max_detail_chars must be greater than zero"));
        }
        if !(1..=240).contains(&self.default_duration_min) {
            return Err(anyhow!(
                "default_duration_min must be between 1 and 240, got {}",
                self.default_duration_min
            ));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Full URL of the Responses endpoint.
    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.api_base.trim_end_matches('/'))
    }

    /// Settings safe to print or log: the key is reported only as present/missing.
    pub fn redacted_summary(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "api_key".to_string(),
                serde_json::Value::String(
                    if self.has_api_key() { "present" } else { "missing" }.to_string(),
                ),
            );
        }
        value
    }
}
