// src/core/error.rs

use thiserror::Error;

/// Reasons a scan target is rejected before any module runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target cannot be empty")]
    Empty,
    #[error("provide only a domain or IP address, not a full URL")]
    UrlNotAllowed,
    #[error("invalid domain name: {0}")]
    InvalidHostname(String),
}

/// Faults raised inside a probing module. These never leave the module runner:
/// it turns them into a failed `ModuleResult`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not resolve {host}: {reason}")]
    Resolution { host: String, reason: String },
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("DNS error: {0}")]
    Dns(#[from] hickory_resolver::error::ResolveError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

/// Request-level failures surfaced to the caller of a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),
    #[error("scan orchestration failed: {0}")]
    Orchestration(String),
}
