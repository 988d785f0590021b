//! Process configuration (§9 ambient stack): environment variables with
//! an optional YAML overlay, rather than the CSV-driven trading config
//! this module used to hold. Every field has a sane default so the
//! binary starts in demo mode with no configuration at all.

use serde::Deserialize;

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_log_file() -> String {
    "brokerd.log".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}
fn default_bus_capacity() -> usize {
    10_000
}
fn default_response_ttl_ms() -> u64 {
    5_000
}
fn default_retry_max_attempts() -> u32 {
    5
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_retry_max_delay_ms() -> u64 {
    30_000
}

/// Process-wide configuration (§9 "Configuration").
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    pub use_json: bool,
    pub enable_tracing: bool,

    /// Shared secret clients must present as `X-Auth-Key`. `None` leaves
    /// the facade unauthenticated — fine for local demo runs, never for
    /// a real deployment.
    pub auth_key: Option<String>,

    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    #[serde(default = "default_response_ttl_ms")]
    pub response_ttl_ms: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Run against the in-memory `FakeUpstream` instead of a real
    /// brokerage session. Defaults to `true` since this crate ships with
    /// no real brokerage SDK wired in (§1 component H is a collaborator
    /// seam, not a vendored client).
    pub demo_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            log_level: default_log_level(),
            rotation: default_rotation(),
            use_json: false,
            enable_tracing: true,
            auth_key: None,
            bus_capacity: default_bus_capacity(),
            response_ttl_ms: default_response_ttl_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            demo_mode: true,
        }
    }
}

impl AppConfig {
    /// Load from an optional YAML file (`BROKERD_CONFIG_FILE`), then
    /// apply individual environment variable overrides on top.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("BROKERD_CONFIG_FILE") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading config file {path}: {e}"))?;
                serde_yaml::from_str(&contents)
                    .map_err(|e| anyhow::anyhow!("parsing config file {path}: {e}"))?
            }
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate_credentials()?;
        Ok(config)
    }

    /// Missing credentials are fatal at startup (§6 "Exit codes / env":
    /// "the worker treats credential and endpoint configuration as
    /// environment; any absence is fatal at startup"). `demo_mode` is the
    /// one exception: it runs against the in-memory `FakeUpstream`, which
    /// needs no shared secret at all.
    fn validate_credentials(&self) -> anyhow::Result<()> {
        if !self.demo_mode && self.auth_key.is_none() {
            anyhow::bail!(
                "BROKERD_AUTH_KEY is required when BROKERD_DEMO_MODE is disabled \
                 (missing credentials are fatal at startup)"
            );
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BROKERD_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("BROKERD_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("BROKERD_AUTH_KEY") {
            self.auth_key = Some(v);
        }
        if let Ok(v) = std::env::var("BROKERD_USE_JSON_LOGS") {
            self.use_json = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("BROKERD_DEMO_MODE") {
            self.demo_mode = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("BROKERD_BUS_CAPACITY")
            && let Ok(n) = v.parse()
        {
            self.bus_capacity = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = AppConfig::default();
        assert!(config.demo_mode);
        assert!(config.auth_key.is_none());
        assert!(config.bus_capacity > 0);
    }

    #[test]
    fn demo_mode_does_not_require_an_auth_key() {
        let config = AppConfig::default();
        assert!(config.validate_credentials().is_ok());
    }

    #[test]
    fn live_mode_without_auth_key_is_fatal() {
        let mut config = AppConfig::default();
        config.demo_mode = false;
        assert!(config.validate_credentials().is_err());
    }

    #[test]
    fn live_mode_with_auth_key_is_accepted() {
        let mut config = AppConfig::default();
        config.demo_mode = false;
        config.auth_key = Some("secret".to_string());
        assert!(config.validate_credentials().is_ok());
    }
}
