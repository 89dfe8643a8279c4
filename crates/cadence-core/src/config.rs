//! Configuration management for Cadence
//!
//! Settings for the API endpoint, retry policy, failure escalation, loop
//! scheduling, seed prompts and log locations. Every field has a default, so
//! a partial `.cadence/config.toml` is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CadenceError, Result};

/// Directory holding config and logs, relative to the working directory
pub const CONFIG_DIR: &str = ".cadence";

/// Top-level configuration
///
/// Loaded from `.cadence/config.toml` in the working directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Remote chat service
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry executor policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Consecutive-failure escalation
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Loop timing
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Seed prompts for message generation
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Log file locations
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable containing the API key used to log in
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Retry executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Growth factor applied per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that trigger the long pause
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    #[serde(default = "default_short_pause_secs")]
    pub short_pause_secs: u64,

    #[serde(default = "default_long_pause_secs")]
    pub long_pause_secs: u64,
}

/// Loop scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Lower bound of the randomized inter-cycle delay (inclusive)
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized inter-cycle delay (exclusive)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Re-poll interval while the quota is exhausted
    #[serde(default = "default_cooldown_poll_ms")]
    pub cooldown_poll_ms: u64,

    /// How often to ask the quota service whether a cooldown ended early
    #[serde(default = "default_cooldown_recheck_secs")]
    pub cooldown_recheck_secs: u64,

    /// Backoff after the first loop-level error
    #[serde(default = "default_loop_error_first_secs")]
    pub loop_error_first_secs: u64,

    /// Backoff after repeated loop-level errors
    #[serde(default = "default_loop_error_repeat_secs")]
    pub loop_error_repeat_secs: u64,

    /// Delay before retrying a start that failed transiently
    #[serde(default = "default_auto_restart_secs")]
    pub auto_restart_secs: u64,
}

/// Seed prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_messages")]
    pub messages: Vec<String>,
}

/// Log file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append-only activity log
    #[serde(default = "default_activity_log")]
    pub activity_log: PathBuf,

    /// tracing output while the dashboard owns the terminal
    #[serde(default = "default_trace_log")]
    pub trace_log: PathBuf,
}

// Default value providers
fn default_base_url() -> String {
    "https://api.chat.example.com".to_string()
}

fn default_api_key_env() -> String {
    "CADENCE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_threshold() -> u32 {
    3
}

fn default_short_pause_secs() -> u64 {
    10
}

fn default_long_pause_secs() -> u64 {
    180
}

fn default_min_delay_ms() -> u64 {
    3000
}

fn default_max_delay_ms() -> u64 {
    10000
}

fn default_cooldown_poll_ms() -> u64 {
    1000
}

fn default_cooldown_recheck_secs() -> u64 {
    30
}

fn default_loop_error_first_secs() -> u64 {
    5
}

fn default_loop_error_repeat_secs() -> u64 {
    15
}

fn default_auto_restart_secs() -> u64 {
    10
}

fn default_messages() -> Vec<String> {
    vec![
        "What are some good habits for writing maintainable code?".to_string(),
        "Explain the difference between a process and a thread.".to_string(),
        "Give me three ideas for a weekend hiking trip.".to_string(),
        "How does public key cryptography work, in simple terms?".to_string(),
        "Summarize the main causes of inflation.".to_string(),
        "What is a good way to start learning a new language?".to_string(),
    ]
}

fn default_activity_log() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("activity.log")
}

fn default_trace_log() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("cadence.log")
}

impl CadenceConfig {
    /// Load configuration from `.cadence/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join("config.toml");

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CadenceError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write default configuration to `.cadence/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| CadenceError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(CadenceError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(CadenceError::Config(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }
        if self.breaker.threshold == 0 {
            return Err(CadenceError::Config(
                "breaker.threshold must be at least 1".to_string(),
            ));
        }
        if self.schedule.min_delay_ms > self.schedule.max_delay_ms {
            return Err(CadenceError::Config(format!(
                "schedule.min_delay_ms ({}) exceeds schedule.max_delay_ms ({})",
                self.schedule.min_delay_ms, self.schedule.max_delay_ms
            )));
        }
        if self.prompts.messages.iter().all(|m| m.trim().is_empty()) {
            return Err(CadenceError::Config(
                "prompts.messages must contain at least one prompt".to_string(),
            ));
        }
        Ok(())
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl BreakerConfig {
    pub fn short_pause(&self) -> Duration {
        Duration::from_secs(self.short_pause_secs)
    }

    pub fn long_pause(&self) -> Duration {
        Duration::from_secs(self.long_pause_secs)
    }
}

impl ScheduleConfig {
    pub fn cooldown_poll(&self) -> Duration {
        Duration::from_millis(self.cooldown_poll_ms)
    }

    pub fn cooldown_recheck(&self) -> Duration {
        Duration::from_secs(self.cooldown_recheck_secs)
    }

    pub fn loop_error_first(&self) -> Duration {
        Duration::from_secs(self.loop_error_first_secs)
    }

    pub fn loop_error_repeat(&self) -> Duration {
        Duration::from_secs(self.loop_error_repeat_secs)
    }

    pub fn auto_restart(&self) -> Duration {
        Duration::from_secs(self.auto_restart_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            short_pause_secs: default_short_pause_secs(),
            long_pause_secs: default_long_pause_secs(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            cooldown_poll_ms: default_cooldown_poll_ms(),
            cooldown_recheck_secs: default_cooldown_recheck_secs(),
            loop_error_first_secs: default_loop_error_first_secs(),
            loop_error_repeat_secs: default_loop_error_repeat_secs(),
            auto_restart_secs: default_auto_restart_secs(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            messages: default_messages(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            activity_log: default_activity_log(),
            trace_log: default_trace_log(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = CadenceConfig::default();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(2000));
        assert_eq!(config.retry.multiplier, 1.5);
        assert_eq!(config.breaker.threshold, 3);
        assert_eq!(config.breaker.short_pause(), Duration::from_secs(10));
        assert_eq!(config.breaker.long_pause(), Duration::from_secs(180));
        assert_eq!(config.schedule.min_delay_ms, 3000);
        assert_eq!(config.schedule.max_delay_ms, 10000);
        assert_eq!(config.schedule.cooldown_poll(), Duration::from_secs(1));
        assert_eq!(config.schedule.loop_error_first(), Duration::from_secs(5));
        assert_eq!(config.schedule.loop_error_repeat(), Duration::from_secs(15));
        assert_eq!(config.schedule.auto_restart(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CadenceConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.api.api_key_env, "CADENCE_API_KEY");
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = CadenceConfig::write_default(dir.path()).unwrap();
        assert!(path.ends_with(".cadence/config.toml"));

        let loaded = CadenceConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.breaker.long_pause_secs, 180);
        assert_eq!(loaded.prompts.messages.len(), default_messages().len());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_DIR).join("config.toml"),
            "[api]\nbase_url = \"http://localhost:8080\"\n\n[breaker]\nthreshold = 5\n",
        )
        .unwrap();

        let config = CadenceConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.breaker.threshold, 5);
        assert_eq!(config.breaker.short_pause_secs, 10);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[retry\nmax_attempts = ").unwrap();

        let err = CadenceConfig::load(&path).unwrap_err();
        assert!(matches!(err, CadenceError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = CadenceConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = CadenceConfig::default();
        config.retry.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = CadenceConfig::default();
        config.breaker.threshold = 0;
        assert!(config.validate().is_err());

        let mut config = CadenceConfig::default();
        config.schedule.min_delay_ms = 20_000;
        assert!(config.validate().is_err());

        let mut config = CadenceConfig::default();
        config.prompts.messages = vec!["   ".to_string()];
        assert!(config.validate().is_err());
    }
}
