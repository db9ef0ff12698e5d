use crate::cycle::CycleConfig;
use crate::llm::client::{
    LlmConfig, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Main configuration for nudgectl
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub cycle: CycleSettings,
    #[serde(default)]
    pub viewer: ViewerSettings,
}

/// LLM backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Takes precedence over the environment variable when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmSettings {
    /// Resolve the API key from the config file or the process environment.
    pub fn to_llm_config(&self) -> LlmConfig {
        self.to_llm_config_with(|name| std::env::var(name).ok())
    }

    /// Same as [`LlmSettings::to_llm_config`] with an explicit variable lookup.
    pub fn to_llm_config_with(&self, lookup: impl Fn(&str) -> Option<String>) -> LlmConfig {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(&self.api_key_env).filter(|k| !k.trim().is_empty()));

        LlmConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key,
            api_key_env: self.api_key_env.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Capture cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CycleSettings {
    /// Seconds from the start of one capture to the start of the next
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: f64,
    /// How long each capture stays on screen
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,
}

fn default_interval_seconds() -> f64 {
    5.0
}

fn default_display_ms() -> u64 {
    1000
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            display_ms: default_display_ms(),
        }
    }
}

impl CycleSettings {
    pub fn to_cycle_config(&self) -> CycleConfig {
        CycleConfig::new(self.interval_seconds, self.display_ms)
    }
}

/// External image viewer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerSettings {
    #[serde(default = "default_viewer_enabled")]
    pub enabled: bool,
    /// Viewer program; detected from PATH when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Extra arguments placed before the image path
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_viewer_enabled() -> bool {
    true
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            enabled: default_viewer_enabled(),
            command: None,
            args: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/nudgectl/config.toml")
    }

    /// Load config from `path`, returning defaults if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => warn!("Failed to parse config {}: {}", path.display(), e),
                },
                Err(e) => warn!("Failed to read config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.llm.max_tokens, 150);
        assert_eq!(config.cycle.interval_seconds, 5.0);
        assert_eq!(config.cycle.display_ms, 1000);
        assert!(config.viewer.enabled);
        assert!(config.viewer.command.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o"

            [viewer]
            command = "feh"
            args = ["--auto-zoom"]
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "https://api.openai.com");
        assert_eq!(config.viewer.command.as_deref(), Some("feh"));
        assert_eq!(config.viewer.args, vec!["--auto-zoom".to_string()]);
        assert_eq!(config.cycle.display_ms, 1000);
    }

    #[test]
    fn file_key_wins_over_environment() {
        let settings = LlmSettings {
            api_key: Some("from-file".to_string()),
            ..LlmSettings::default()
        };
        let config = settings.to_llm_config_with(|_| Some("from-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn key_is_read_from_the_configured_variable() {
        let settings = LlmSettings {
            api_key_env: "MY_VISION_KEY".to_string(),
            ..LlmSettings::default()
        };
        let config = settings.to_llm_config_with(|name| {
            (name == "MY_VISION_KEY").then(|| "secret".to_string())
        });
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api_key_env, "MY_VISION_KEY");
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let settings = LlmSettings {
            api_key: Some("  ".to_string()),
            ..LlmSettings::default()
        };
        let config = settings.to_llm_config_with(|_| Some(String::new()));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.cycle.interval_seconds = 2.5;
        config.viewer.enabled = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.cycle.interval_seconds, 2.5);
        assert!(!loaded.viewer.enabled);
        assert!(loaded.llm.api_key.is_none());
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.cycle.display_ms, 1000);
    }
}
