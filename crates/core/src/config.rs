use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LullError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LULL_PROFILE`. When set (e.g. `BATTERY`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, LullError> {
        let profile = env_or("LULL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, LullError> {
        let mut config = Self {
            profile: profile.to_uppercase(),
            ..Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string, then apply env overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, LullError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.profile = config.profile.to_uppercase();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LullError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    pub fn validate(&self) -> Result<(), LullError> {
        self.scheduler.validate()?;
        self.driver.validate()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   target_fps={}, tick_threshold={}, frame_budget={:?}",
            self.scheduler.target_fps,
            self.scheduler.tick_threshold,
            self.scheduler.frame_budget()
        );
        tracing::info!(
            "  driver:      frame_interval={}ms, idle_timeout={}ms",
            self.driver.frame_interval_ms,
            self.driver.idle_timeout_ms
        );
    }

    fn apply_env_overrides(&mut self) {
        let p = self.profile.as_str();
        if let Some(v) = profiled_env_parse(p, "LULL_TARGET_FPS") {
            self.scheduler.target_fps = v;
        }
        if let Some(v) = profiled_env_parse(p, "LULL_TICK_THRESHOLD") {
            self.scheduler.tick_threshold = v;
        }
        if let Some(v) = profiled_env_parse(p, "LULL_FRAME_INTERVAL_MS") {
            self.driver.frame_interval_ms = v;
        }
        if let Some(v) = profiled_env_parse(p, "LULL_IDLE_TIMEOUT_MS") {
            self.driver.idle_timeout_ms = v;
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Tunables of the frame-timing gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Frame rate the host must sustain before background work runs.
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,
    /// Consecutive on-time ticks required before a dispatch is attempted.
    #[serde(default = "default_tick_threshold")]
    pub tick_threshold: u32,
}

fn default_target_fps() -> f64 { 55.0 }
fn default_tick_threshold() -> u32 { 4 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            tick_threshold: default_tick_threshold(),
        }
    }
}

impl SchedulerConfig {
    /// Per-tick time budget: `1000 / target_fps` milliseconds.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }

    pub fn validate(&self) -> Result<(), LullError> {
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(LullError::InvalidConfig(format!(
                "target_fps must be a positive number, got {}",
                self.target_fps
            )));
        }
        if self.tick_threshold == 0 {
            return Err(LullError::InvalidConfig(
                "tick_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Driver ────────────────────────────────────────────────────

/// Settings for the bundled frame driver and idle monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Quiet period after the last user activity before the host counts as idle.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

fn default_frame_interval_ms() -> u64 { 16 }
fn default_idle_timeout_ms() -> u64 { 500 }

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl DriverConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), LullError> {
        if self.frame_interval_ms == 0 {
            return Err(LullError::InvalidConfig(
                "frame_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.target_fps, 55.0);
        assert_eq!(config.tick_threshold, 4);
        let budget = config.frame_budget().as_secs_f64() * 1000.0;
        assert!((budget - 18.18).abs() < 0.01, "expected ~18.18ms, got {}ms", budget);
    }

    #[test]
    fn rejects_bad_scheduler_values() {
        let mut config = SchedulerConfig::default();
        config.target_fps = 0.0;
        assert!(config.validate().is_err());

        config.target_fps = f64::NAN;
        assert!(config.validate().is_err());

        config.target_fps = 30.0;
        config.tick_threshold = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tick_threshold"));
    }

    #[test]
    fn parse_partial_toml() {
        let toml = r#"
[scheduler]
target_fps = 30.0
"#;
        let cfg = Config::from_toml(toml).unwrap();
        assert_eq!(cfg.scheduler.target_fps, 30.0);
        assert_eq!(cfg.scheduler.tick_threshold, 4);
        assert_eq!(cfg.driver.frame_interval_ms, 16);
        assert_eq!(cfg.profile_label(), "default");
    }

    #[test]
    fn invalid_toml_value_rejected() {
        let toml = r#"
[driver]
frame_interval_ms = 0
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(err, LullError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::from_toml("[scheduler\n").unwrap_err();
        assert!(matches!(err, LullError::ConfigParse(_)));
    }

    #[test]
    fn profiled_env_override() {
        // Unique profile prefix keeps this test isolated from the others.
        std::env::set_var("CFGTEST_LULL_TICK_THRESHOLD", "7");
        std::env::set_var("CFGTEST_LULL_IDLE_TIMEOUT_MS", "not-a-number");
        let cfg = Config::for_profile("cfgtest").unwrap();
        assert_eq!(cfg.profile, "CFGTEST");
        assert_eq!(cfg.scheduler.tick_threshold, 7);
        assert_eq!(cfg.driver.idle_timeout_ms, 500);
        std::env::remove_var("CFGTEST_LULL_TICK_THRESHOLD");
        std::env::remove_var("CFGTEST_LULL_IDLE_TIMEOUT_MS");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::from_file("/nonexistent/lull.toml").unwrap_err();
        assert!(matches!(err, LullError::ConfigIo(_)));
    }
}
