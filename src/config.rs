// src/config.rs

use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

pub const PORT_TIMEOUT_ENV: &str = "EXPOSURE_PORT_TIMEOUT_SECS";
pub const TLS_TIMEOUT_ENV: &str = "EXPOSURE_TLS_TIMEOUT_SECS";
pub const DNS_TIMEOUT_ENV: &str = "EXPOSURE_DNS_TIMEOUT_SECS";
pub const HTTP_TIMEOUT_ENV: &str = "EXPOSURE_HTTP_TIMEOUT_SECS";
pub const MODULE_DEADLINE_ENV: &str = "EXPOSURE_MODULE_DEADLINE_SECS";

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Per-operation timeouts and identity of the probing modules.
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub port_timeout: Duration,
    pub tls_timeout: Duration,
    pub dns_timeout: Duration,
    pub http_timeout: Duration,
    /// Upper bound on a single module's run; modules run in parallel, so this
    /// also bounds the whole scan.
    pub module_deadline: Duration,
    pub user_agent: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            port_timeout: Duration::from_secs(2),
            tls_timeout: Duration::from_secs(5),
            dns_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            module_deadline: Duration::from_secs(60),
            user_agent: format!("ExposureRS/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ScannerConfig {
    /// Defaults overridden by the `EXPOSURE_*_SECS` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| match lookup(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => Duration::from_secs(value),
                _ => {
                    warn!(key, value = %raw, "Ignoring invalid timeout, using default.");
                    default
                }
            },
        };
        Self {
            port_timeout: secs(PORT_TIMEOUT_ENV, defaults.port_timeout),
            tls_timeout: secs(TLS_TIMEOUT_ENV, defaults.tls_timeout),
            dns_timeout: secs(DNS_TIMEOUT_ENV, defaults.dns_timeout),
            http_timeout: secs(HTTP_TIMEOUT_ENV, defaults.http_timeout),
            module_deadline: secs(MODULE_DEADLINE_ENV, defaults.module_deadline),
            user_agent: defaults.user_agent,
        }
    }
}

/// Settings of the REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}
