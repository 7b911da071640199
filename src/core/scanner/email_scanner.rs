// src/core/scanner/email_scanner.rs

use crate::core::error::ProbeError;
use crate::core::models::{Category, Finding, Metadata, Severity};
use crate::core::scanner::{dns, ModuleOutcome, ProbeModule};
use crate::core::target::Target;
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Common DKIM selectors probed when the real one is not known.
const COMMON_DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim"];

/// Anti-spoofing posture of a domain: SPF, DMARC and MX.
pub struct EmailSecurityScanner {
    timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpfData {
    pub record: String,
}

impl SpfData {
    /// `+all` and `?all` let any sender pass.
    pub fn too_permissive(&self) -> bool {
        self.record.contains("+all") || self.record.contains("?all")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmarcData {
    pub record: String,
    pub policy: Option<String>,
}

/// Raw DNS observations for a domain's mail setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailObservation {
    pub spf: Option<SpfData>,
    pub dmarc: Option<DmarcData>,
    pub mx_servers: Vec<String>,
    pub dkim_selectors: Vec<String>,
}

impl EmailSecurityScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProbeModule for EmailSecurityScanner {
    fn name(&self) -> &'static str {
        "Email Security"
    }

    fn category(&self) -> Category {
        Category::EmailSecurity
    }

    async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError> {
        let Some(domain) = target.domain() else {
            debug!(target = %target, "Target is an IP address, skipping email security.");
            return Ok(ModuleOutcome::skipped("Target is an IP address, email security does not apply"));
        };
        info!(domain, "Starting email security scan.");

        let resolver = dns::build_resolver(self.timeout);
        let (spf, dmarc, mx_servers, dkim_selectors) = tokio::join!(
            lookup_spf(&resolver, domain),
            lookup_dmarc(&resolver, domain),
            dns::mx_records(&resolver, domain),
            lookup_dkim(&resolver, domain),
        );
        let observation = EmailObservation { spf, dmarc, mx_servers, dkim_selectors };
        let findings = analyze_email(domain, &observation);

        let mut metadata = Metadata::new();
        metadata.insert(
            "spf".into(),
            json!({
                "present": observation.spf.is_some(),
                "record": observation.spf.as_ref().map(|s| s.record.as_str()),
                "too_permissive": observation.spf.as_ref().is_some_and(SpfData::too_permissive),
            }),
        );
        metadata.insert(
            "dmarc".into(),
            json!({
                "present": observation.dmarc.is_some(),
                "record": observation.dmarc.as_ref().map(|d| d.record.as_str()),
                "policy": observation.dmarc.as_ref().and_then(|d| d.policy.as_deref()),
            }),
        );
        metadata.insert(
            "mx".into(),
            json!({ "present": !observation.mx_servers.is_empty(), "servers": observation.mx_servers }),
        );
        metadata.insert("dkim_selectors".into(), json!(observation.dkim_selectors));

        info!(findings = findings.len(), "Email security scan finished.");
        Ok(ModuleOutcome::success(findings, metadata))
    }
}

/// Applies the SPF, DMARC and MX rules, plus the aggregate finding when both
/// SPF and DMARC are absent.
///
/// # Arguments
/// * `domain` - The domain whose mail records were looked up.
/// * `observation` - The SPF, DMARC and MX lookups for it.
///
/// # Returns
/// A vector of `Finding`. A missing MX record yields an informational one.
pub fn analyze_email(domain: &str, observation: &EmailObservation) -> Vec<Finding> {
    let mut findings = Vec::new();

    match &observation.spf {
        None => {
            debug!("SPF analysis: no record found.");
            findings.push(
                Finding::new(
                    Category::EmailSecurity,
                    Severity::High,
                    "SPF not configured",
                    "The domain has no SPF record",
                    15,
                )
                .with_evidence("No SPF TXT record found")
                .with_impact("Attackers can send spoofed email on behalf of the domain")
                .with_recommendation("Publish an SPF (TXT) record listing the authorized servers"),
            );
        }
        Some(spf) if spf.too_permissive() => {
            debug!(record = %spf.record, "SPF analysis: permissive 'all' mechanism.");
            findings.push(
                Finding::new(
                    Category::EmailSecurity,
                    Severity::Moderate,
                    "SPF too permissive",
                    "The SPF record lets too many senders pass",
                    8,
                )
                .with_evidence(format!("SPF: {}", spf.record))
                .with_impact("Weakened anti-spoofing protection")
                .with_recommendation("Restrict the SPF record to the servers actually needed"),
            );
        }
        Some(_) => {}
    }

    match &observation.dmarc {
        None => {
            debug!("DMARC analysis: no record found.");
            findings.push(
                Finding::new(
                    Category::EmailSecurity,
                    Severity::High,
                    "DMARC not configured",
                    "The domain has no DMARC policy",
                    18,
                )
                .with_evidence(format!("No DMARC record found at _dmarc.{domain}"))
                .with_impact("No policy tells receivers how to handle unauthenticated email")
                .with_recommendation("Publish a DMARC record with a quarantine or reject policy"),
            );
        }
        Some(dmarc) => {
            let policy = dmarc.policy.as_deref().unwrap_or("none");
            if policy.eq_ignore_ascii_case("none") {
                debug!("DMARC analysis: monitor-only policy.");
                findings.push(
                    Finding::new(
                        Category::EmailSecurity,
                        Severity::Moderate,
                        "DMARC in monitor-only mode (p=none)",
                        "DMARC is configured with policy 'none', which only monitors",
                        10,
                    )
                    .with_evidence(format!("DMARC policy: {policy}"))
                    .with_impact("Spoofed email is not blocked")
                    .with_recommendation("Move to a 'quarantine' or 'reject' policy"),
                );
            }
        }
    }

    if observation.mx_servers.is_empty() {
        findings.push(
            Finding::new(
                Category::EmailSecurity,
                Severity::Low,
                "No MX records",
                "The domain has no MX records",
                0,
            )
            .with_evidence("No MX record found")
            .with_impact("The domain cannot receive email")
            .with_recommendation("Normal if the domain does not handle email"),
        );
    }

    if observation.spf.is_none() && observation.dmarc.is_none() {
        findings.push(
            Finding::new(
                Category::EmailSecurity,
                Severity::Critical,
                "Email protection completely absent",
                "No anti-spoofing protection is configured (neither SPF nor DMARC)",
                25,
            )
            .with_evidence("SPF and DMARC both absent")
            .with_impact("The domain is highly exposed to phishing and spoofing")
            .with_recommendation("PRIORITY: configure SPF and DMARC immediately"),
        );
    }

    findings
}

/// Looks up the SPF record: the first TXT record starting with `v=spf1`.
async fn lookup_spf(resolver: &TokioAsyncResolver, domain: &str) -> Option<SpfData> {
    debug!(domain, "Looking up SPF record.");
    let record = dns::txt_records(resolver, domain)
        .await
        .into_iter()
        .map(|txt| txt.trim_matches('"').to_string())
        .find(|txt| txt.starts_with("v=spf1"))?;
    debug!(record = %record, "SPF record found.");
    Some(SpfData { record })
}

/// Looks up the DMARC record published at `_dmarc.<domain>`.
async fn lookup_dmarc(resolver: &TokioAsyncResolver, domain: &str) -> Option<DmarcData> {
    let dmarc_target = format!("_dmarc.{domain}");
    debug!(target = %dmarc_target, "Looking up DMARC record.");
    let record = dns::txt_records(resolver, &dmarc_target)
        .await
        .into_iter()
        .map(|txt| txt.trim_matches('"').to_string())
        .find(|txt| txt.starts_with("v=DMARC1"))?;
    debug!(record = %record, "DMARC record found.");
    let policy = dmarc_policy(&record);
    Some(DmarcData { record, policy })
}

/// Extracts the `p=` tag of a DMARC record.
pub fn dmarc_policy(record: &str) -> Option<String> {
    record
        .split(';')
        .filter_map(|tag| tag.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("p"))
        .map(|(_, value)| value.trim().to_ascii_lowercase())
}

/// Probes the common DKIM selectors and returns those publishing a `v=DKIM1` key.
async fn lookup_dkim(resolver: &TokioAsyncResolver, domain: &str) -> Vec<String> {
    debug!(domain, "Looking up DKIM records for common selectors.");
    let mut found = Vec::new();
    for selector in COMMON_DKIM_SELECTORS {
        let dkim_target = format!("{selector}._domainkey.{domain}");
        let records = dns::txt_records(resolver, &dkim_target).await;
        if records.iter().any(|r| r.trim_matches('"').starts_with("v=DKIM1")) {
            debug!(selector, "Found valid DKIM record.");
            found.push(selector.to_string());
        }
    }
    if !found.is_empty() {
        info!(count = found.len(), "Found DKIM records.");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk_scorer::RiskScorer;

    fn observation(spf: Option<&str>, dmarc: Option<&str>, mx: bool) -> EmailObservation {
        EmailObservation {
            spf: spf.map(|r| SpfData { record: r.into() }),
            dmarc: dmarc.map(|r| DmarcData { record: r.into(), policy: dmarc_policy(r) }),
            mx_servers: if mx { vec!["mx1.example.com.".into()] } else { Vec::new() },
            dkim_selectors: Vec::new(),
        }
    }

    #[test]
    fn fully_unprotected_domain_gets_the_aggregate_finding() {
        let findings = analyze_email("example.com", &observation(None, None, false));
        assert!(findings.len() >= 3);
        let titles: Vec<&str> = findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["SPF not configured", "DMARC not configured", "No MX records", "Email protection completely absent"]
        );
        assert_eq!(findings.iter().filter(|f| f.severity == Severity::Critical).count(), 1);
        assert_eq!(findings[1].evidence.as_deref(), Some("No DMARC record found at _dmarc.example.com"));

        let score = RiskScorer::default().calculate_score(&findings);
        assert!(score.category_scores[&Category::EmailSecurity] > 0);
    }

    #[test]
    fn strict_configuration_is_clean() {
        let findings = analyze_email(
            "example.com",
            &observation(Some("v=spf1 include:_spf.google.com -all"), Some("v=DMARC1; p=reject; rua=mailto:d@example.com"), true),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn permissive_spf_and_monitor_only_dmarc_are_moderate() {
        let findings = analyze_email("example.com", &observation(Some("v=spf1 +all"), Some("v=DMARC1; p=none"), true));
        let found: Vec<(&str, u8)> = findings.iter().map(|f| (f.title.as_str(), f.score_impact)).collect();
        assert_eq!(found, vec![("SPF too permissive", 8), ("DMARC in monitor-only mode (p=none)", 10)]);
        assert!(findings.iter().all(|f| f.severity == Severity::Moderate));
    }

    #[test]
    fn missing_mx_is_informational() {
        let findings = analyze_email("example.com", &observation(Some("v=spf1 -all"), Some("v=DMARC1; p=quarantine"), false));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].score_impact, 0);
    }

    #[test]
    fn parses_the_dmarc_policy_tag_only() {
        assert_eq!(dmarc_policy("v=DMARC1; sp=none; p=Reject"), Some("reject".into()));
        assert_eq!(dmarc_policy("v=DMARC1; rua=mailto:x@example.com"), None);
    }

    #[tokio::test]
    async fn ip_targets_are_skipped() {
        let scanner = EmailSecurityScanner::new(Duration::from_secs(1));
        let target: Target = "93.184.216.34".parse().unwrap();
        let outcome = scanner.scan(&target).await.unwrap();
        assert_eq!(outcome.status, crate::core::models::ModuleStatus::Skipped);
        assert!(outcome.findings.is_empty());
        assert!(outcome.metadata.contains_key("reason"));
    }
}
