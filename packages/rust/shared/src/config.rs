//! Application configuration for the review pipeline.
//!
//! User config lives at `~/.regreview/regreview.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ReviewError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "regreview.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".regreview";

// ---------------------------------------------------------------------------
// Config structs (matching regreview.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Registry search portal settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory where per-run artifacts and the final document are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File name of the static steps 1–2 overview.
    #[serde(default = "default_static_overview")]
    pub static_overview: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            static_overview: default_static_overview(),
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_static_overview() -> String {
    "step1_step2_static.json".into()
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Search endpoint of the public device registry.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Query parameter carrying the product name.
    #[serde(default = "default_search_param")]
    pub search_param: String,

    /// CSS selector for result rows on the search page.
    #[serde(default = "default_row_selector")]
    pub result_row_selector: String,

    /// CSS selector for the detail link inside a result row.
    #[serde(default = "default_link_selector")]
    pub result_link_selector: String,

    /// Timeout for opening a registry entry's detail page.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Timeout for the search results to come back.
    #[serde(default = "default_result_timeout")]
    pub result_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            search_param: default_search_param(),
            result_row_selector: default_row_selector(),
            result_link_selector: default_link_selector(),
            navigation_timeout_secs: default_navigation_timeout(),
            result_timeout_secs: default_result_timeout(),
        }
    }
}

impl RegistryConfig {
    /// Parse the configured search URL.
    pub fn parsed_search_url(&self) -> Result<Url> {
        Url::parse(&self.search_url).map_err(|e| {
            ReviewError::config(format!("invalid registry search_url '{}': {e}", self.search_url))
        })
    }
}

fn default_search_url() -> String {
    "https://emedi.mfds.go.kr/search/data/MNU20237".into()
}
fn default_search_param() -> String {
    "searchKeyword".into()
}
fn default_row_selector() -> String {
    "table tbody tr".into()
}
fn default_link_selector() -> String {
    "a".into()
}
fn default_navigation_timeout() -> u64 {
    60
}
fn default_result_timeout() -> u64 {
    10
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for field extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat-completions endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Evidence characters embedded in the prompt.
    #[serde(default = "default_max_evidence_chars")]
    pub max_evidence_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
            max_evidence_chars: default_max_evidence_chars(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_evidence_chars() -> usize {
    12_000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.regreview/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ReviewError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.regreview/regreview.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ReviewError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReviewError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReviewError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReviewError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the completion-service API key from its environment variable.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ReviewError::config(format!(
            "completion service API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("table tbody tr"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.llm.timeout_secs, 60);
        assert_eq!(parsed.llm.max_evidence_chars, 12_000);
        assert_eq!(parsed.registry.result_timeout_secs, 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/reviews"

[llm]
model = "gpt-4o"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/reviews");
        assert_eq!(config.defaults.static_overview, "step1_step2_static.json");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.registry.search_param, "searchKeyword");
    }

    #[test]
    fn search_url_validation() {
        let mut config = RegistryConfig::default();
        assert!(config.parsed_search_url().is_ok());

        config.search_url = "not a url".into();
        let err = config.parsed_search_url().unwrap_err();
        assert!(err.to_string().contains("invalid registry search_url"));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "REGREVIEW_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
