// src/core/scanner/domain_scanner.rs

use crate::core::error::ProbeError;
use crate::core::models::{Category, Finding, Metadata, Severity};
use crate::core::scanner::{dns, ModuleOutcome, ProbeModule};
use crate::core::target::Target;
use async_trait::async_trait;
use hickory_resolver::proto::rr::RecordType;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of distinct A records above which a note about CDN-like
/// infrastructure is emitted.
const MANY_A_RECORDS: usize = 10;

/// DNS health of a domain: resolution, CAA and DNSSEC.
pub struct DomainScanner {
    timeout: Duration,
}

/// Raw DNS observations for a domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainObservation {
    pub ip_addresses: Vec<String>,
    pub resolution_error: Option<String>,
    pub caa_records: Vec<String>,
    pub dnskey_present: bool,
}

impl DomainObservation {
    pub fn resolved(&self) -> bool {
        self.resolution_error.is_none()
    }
}

impl DomainScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProbeModule for DomainScanner {
    fn name(&self) -> &'static str {
        "Domain Intelligence"
    }

    fn category(&self) -> Category {
        Category::Domain
    }

    async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError> {
        let Some(domain) = target.domain() else {
            debug!(target = %target, "Target is an IP address, skipping domain intelligence.");
            return Ok(ModuleOutcome::skipped("Target is an IP address, not a domain"));
        };
        info!(domain, "Starting domain intelligence scan.");

        let resolver = dns::build_resolver(self.timeout);
        let (a_result, caa_records, dnskey_records) = tokio::join!(
            dns::a_records(&resolver, domain),
            dns::records_of_type(&resolver, domain, RecordType::CAA),
            dns::records_of_type(&resolver, domain, RecordType::DNSKEY),
        );

        let (ip_addresses, resolution_error) = match a_result {
            Ok(ips) => (distinct_addresses(ips), None),
            Err(e) => {
                warn!(domain, error = %e, "A record lookup failed.");
                (Vec::new(), Some(dns::describe_error(&e)))
            }
        };
        let observation = DomainObservation {
            ip_addresses,
            resolution_error,
            caa_records,
            dnskey_present: !dnskey_records.is_empty(),
        };

        let findings = analyze_domain(domain, &observation);
        let mut metadata = Metadata::new();
        metadata.insert("resolved".into(), Value::Bool(observation.resolved()));
        metadata.insert("ip_addresses".into(), json!(observation.ip_addresses));
        metadata.insert("multiple_ips".into(), Value::Bool(observation.ip_addresses.len() > 1));
        metadata.insert("error".into(), json!(observation.resolution_error));
        if observation.resolved() {
            metadata.insert("caa_present".into(), Value::Bool(!observation.caa_records.is_empty()));
            metadata.insert("caa_records".into(), json!(observation.caa_records));
            metadata.insert("dnssec_enabled".into(), Value::Bool(observation.dnskey_present));
        }

        info!(findings = findings.len(), "Domain intelligence scan finished.");
        Ok(ModuleOutcome::success(findings, metadata))
    }
}

/// Drops repeated addresses, keeping the resolver's order.
fn distinct_addresses(mut ips: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ips.retain(|ip| seen.insert(ip.clone()));
    ips
}

/// Applies the resolution, A-record count, CAA and DNSSEC rules. An
/// unresolvable domain yields only the resolution finding.
///
/// # Arguments
/// * `domain` - The domain being assessed.
/// * `observation` - The A, CAA and DNSKEY lookups for it.
///
/// # Returns
/// A vector of `Finding`, in rule order.
pub fn analyze_domain(domain: &str, observation: &DomainObservation) -> Vec<Finding> {
    if let Some(error) = &observation.resolution_error {
        debug!(domain, error = %error, "Domain does not resolve.");
        return vec![
            Finding::new(
                Category::Domain,
                Severity::Critical,
                "Domain does not resolve",
                format!("The domain {domain} cannot be resolved through DNS"),
                30,
            )
            .with_evidence(error.as_str())
            .with_impact("The service is unreachable")
            .with_recommendation("Check the DNS configuration of the domain"),
        ];
    }

    let mut findings = Vec::new();
    let ips = distinct_addresses(observation.ip_addresses.clone());
    if ips.len() > MANY_A_RECORDS {
        findings.push(
            Finding::new(
                Category::Domain,
                Severity::Low,
                "Many DNS A records",
                format!("The domain resolves to {} distinct IP addresses", ips.len()),
                2,
            )
            .with_evidence(format!("IP addresses: {}...", ips[..5].join(", ")))
            .with_impact("Possibly a CDN or complex infrastructure")
            .with_recommendation("Normal for CDNs; verify it is intentional"),
        );
    }

    if observation.caa_records.is_empty() {
        findings.push(
            Finding::new(
                Category::Domain,
                Severity::Low,
                "CAA record not configured",
                "The domain has no CAA records restricting certificate issuance",
                5,
            )
            .with_evidence("No CAA record found")
            .with_impact("Any certificate authority may issue TLS certificates for this domain")
            .with_recommendation("Publish CAA records to restrict the authorized CAs"),
        );
    }

    if !observation.dnskey_present {
        findings.push(
            Finding::new(
                Category::Domain,
                Severity::Moderate,
                "DNSSEC not enabled",
                "The domain has no DNSSEC configuration",
                10,
            )
            .with_evidence("No DNSKEY record found")
            .with_impact("Exposed to DNS cache poisoning and spoofing")
            .with_recommendation("Enable DNSSEC for the domain"),
        );
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(ip_count: usize, caa: bool, dnssec: bool) -> DomainObservation {
        DomainObservation {
            ip_addresses: (0..ip_count).map(|i| format!("203.0.113.{i}")).collect(),
            resolution_error: None,
            caa_records: if caa { vec!["0 issue \"letsencrypt.org\"".into()] } else { Vec::new() },
            dnskey_present: dnssec,
        }
    }

    #[test]
    fn well_configured_domain_is_clean() {
        assert!(analyze_domain("example.com", &resolved(2, true, true)).is_empty());
    }

    #[test]
    fn unresolvable_domain_is_a_single_critical_finding() {
        let observation = DomainObservation {
            resolution_error: Some("Domain does not exist (NXDOMAIN)".into()),
            ..DomainObservation::default()
        };
        let findings = analyze_domain("nope.example", &observation);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].score_impact, 30);
        assert_eq!(findings[0].evidence.as_deref(), Some("Domain does not exist (NXDOMAIN)"));
    }

    #[test]
    fn missing_caa_and_dnssec_are_reported() {
        let findings = analyze_domain("example.com", &resolved(1, false, false));
        let found: Vec<(Severity, u8)> = findings.iter().map(|f| (f.severity, f.score_impact)).collect();
        assert_eq!(found, vec![(Severity::Low, 5), (Severity::Moderate, 10)]);
    }

    #[test]
    fn more_than_ten_a_records_is_a_low_note() {
        let findings = analyze_domain("cdn.example.com", &resolved(11, true, true));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].score_impact, 2);
        assert!(findings[0].evidence.as_deref().unwrap().starts_with("IP addresses: 203.0.113.0, "));
        assert!(analyze_domain("example.com", &resolved(10, true, true)).is_empty());
    }

    #[test]
    fn repeated_a_records_count_once() {
        let mut observation = resolved(10, true, true);
        observation.ip_addresses.push("203.0.113.3".into());
        observation.ip_addresses.push("203.0.113.7".into());
        assert!(analyze_domain("example.com", &observation).is_empty());

        let ips = distinct_addresses(observation.ip_addresses);
        assert_eq!(ips.len(), 10);
        assert_eq!(ips[3], "203.0.113.3");
    }

    #[tokio::test]
    async fn ip_targets_are_skipped() {
        let scanner = DomainScanner::new(Duration::from_secs(1));
        let target: Target = "93.184.216.34".parse().unwrap();
        let outcome = scanner.scan(&target).await.unwrap();
        assert_eq!(outcome.status, crate::core::models::ModuleStatus::Skipped);
        assert!(outcome.findings.is_empty());
        assert_eq!(outcome.metadata["reason"], json!("Target is an IP address, not a domain"));
    }
}
