// src/core/scanner/dns.rs

// Thin helpers over the hickory resolver shared by the domain and email modules.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::debug;

/// Builds a Tokio resolver whose every query is bounded by `timeout`.
pub fn build_resolver(timeout: Duration) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
}

/// Human-readable reason for a failed lookup, as stored in module metadata.
pub fn describe_error(error: &ResolveError) -> String {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } if *response_code == ResponseCode::NXDomain => {
            "Domain does not exist (NXDOMAIN)".to_string()
        }
        ResolveErrorKind::NoRecordsFound { .. } => "No DNS answer".to_string(),
        ResolveErrorKind::Timeout => "DNS timeout".to_string(),
        _ => error.to_string(),
    }
}

/// All A records of `name`, as strings.
pub async fn a_records(resolver: &TokioAsyncResolver, name: &str) -> Result<Vec<String>, ResolveError> {
    let lookup = resolver.ipv4_lookup(name).await?;
    Ok(lookup.iter().map(|a| a.to_string()).collect())
}

/// The TXT strings published at `name`. Lookup failures read as "no records".
pub async fn txt_records(resolver: &TokioAsyncResolver, name: &str) -> Vec<String> {
    match resolver.txt_lookup(name).await {
        Ok(lookup) => lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect::<String>()
            })
            .collect(),
        Err(e) => {
            debug!(name, error = %e, "TXT lookup returned nothing.");
            Vec::new()
        }
    }
}

/// MX exchange hosts of `name`. Lookup failures read as "no records".
pub async fn mx_records(resolver: &TokioAsyncResolver, name: &str) -> Vec<String> {
    match resolver.mx_lookup(name).await {
        Ok(lookup) => lookup.iter().map(|mx| mx.exchange().to_string()).collect(),
        Err(e) => {
            debug!(name, error = %e, "MX lookup returned nothing.");
            Vec::new()
        }
    }
}

/// Records of an arbitrary type (CAA, DNSKEY), rendered with their presentation format.
/// Lookup failures read as "no records".
pub async fn records_of_type(resolver: &TokioAsyncResolver, name: &str, record_type: RecordType) -> Vec<String> {
    match resolver.lookup(name, record_type).await {
        Ok(lookup) => lookup.iter().map(|r| r.to_string()).collect(),
        Err(e) => {
            debug!(name, %record_type, error = %e, "Lookup returned nothing.");
            Vec::new()
        }
    }
}
