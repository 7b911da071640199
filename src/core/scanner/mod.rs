// src/core/scanner/mod.rs

// Public interface of the `scanner` module: the probe contract, the five
// probing modules and the orchestrator that drives them.
pub mod dns;
pub mod domain_scanner;
pub mod email_scanner;
pub mod headers_scanner;
pub mod network_scanner;
pub mod tls_scanner;

use crate::config::ScannerConfig;
use crate::core::error::{ProbeError, ScanError};
use crate::core::models::{
    round_secs, Category, ExecutionSummary, ExecutiveSummary, Finding, Metadata, ModuleResult, ModuleStatus,
    RiskScore, ScanReport, SeverityCounts, TechnicalDetails,
};
use crate::core::risk_scorer::{RiskScorer, ScoringConfig};
use crate::core::runner::ModuleRunner;
use crate::core::target::Target;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{info, instrument};

use self::domain_scanner::DomainScanner;
use self::email_scanner::EmailSecurityScanner;
use self::headers_scanner::HeadersScanner;
use self::network_scanner::NetworkScanner;
use self::tls_scanner::TlsScanner;

/// Number of entries in the executive top-risk and recommendation lists.
const EXECUTIVE_LIST_LIMIT: usize = 3;
const NO_RISKS_PLACEHOLDER: &str = "✓ No critical risks identified";
const NO_RECOMMENDATIONS_PLACEHOLDER: &str = "✓ Keep current security best practices in place";

/// What a probing module reports back to the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutcome {
    pub status: ModuleStatus,
    pub findings: Vec<Finding>,
    pub metadata: Metadata,
}

impl Default for ModuleOutcome {
    fn default() -> Self {
        Self { status: ModuleStatus::Success, findings: Vec::new(), metadata: Metadata::new() }
    }
}

impl ModuleOutcome {
    pub fn success(findings: Vec<Finding>, metadata: Metadata) -> Self {
        Self { status: ModuleStatus::Success, findings, metadata }
    }

    /// The module does not apply to this target; carries no findings.
    pub fn skipped(reason: &str) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("reason".into(), Value::String(reason.to_string()));
        Self { status: ModuleStatus::Skipped, findings: Vec::new(), metadata }
    }

    /// The module could not complete; carries exactly one finding describing why.
    pub fn failed(finding: Finding, metadata: Metadata) -> Self {
        Self { status: ModuleStatus::Failed, findings: vec![finding], metadata }
    }
}

/// A probe covering one security dimension of a target.
#[async_trait]
pub trait ProbeModule: Send + Sync {
    /// Display name, also used as `ModuleResult::module_name`.
    fn name(&self) -> &'static str;

    /// Category of the findings this module emits.
    fn category(&self) -> Category;

    async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError>;
}

/// Drives every probing module against a target and assembles the report.
pub struct Scanner {
    modules: Vec<Arc<dyn ProbeModule>>,
    runner: ModuleRunner,
    scorer: RiskScorer,
}

impl Scanner {
    /// The standard scanner: Network, TLS, Headers, Domain, Email, in that order.
    pub fn new(config: &ScannerConfig) -> Self {
        let modules: Vec<Arc<dyn ProbeModule>> = vec![
            Arc::new(NetworkScanner::new(config.port_timeout, config.dns_timeout)),
            Arc::new(TlsScanner::new(config.tls_timeout)),
            Arc::new(HeadersScanner::new(config.http_timeout, config.user_agent.clone())),
            Arc::new(DomainScanner::new(config.dns_timeout)),
            Arc::new(EmailSecurityScanner::new(config.dns_timeout)),
        ];
        Self::with_modules(
            modules,
            ModuleRunner::new(config.module_deadline),
            RiskScorer::new(ScoringConfig::default()),
        )
    }

    pub fn with_modules(modules: Vec<Arc<dyn ProbeModule>>, runner: ModuleRunner, scorer: RiskScorer) -> Self {
        Self { modules, runner, scorer }
    }

    /// Validates `raw_target` and runs a full scan against it.
    pub async fn scan(&self, raw_target: &str) -> Result<ScanReport, ScanError> {
        let target: Target = raw_target.parse()?;
        self.scan_target(&target).await
    }

    #[instrument(skip(self), fields(target = %target))]
    pub async fn scan_target(&self, target: &Target) -> Result<ScanReport, ScanError> {
        let scan_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let timestamp = Utc::now();
        let started = Instant::now();
        info!(scan_id = %scan_id, modules = self.modules.len(), "Starting scan.");

        let modules_results = self.run_modules(target).await?;
        let all_findings: Vec<Finding> = modules_results
            .iter()
            .flat_map(|m| m.findings.iter().cloned())
            .collect();

        let risk_score = self.scorer.calculate_score(&all_findings);
        let executive_view = self.executive_view(target, &risk_score, &all_findings, timestamp);
        let technical_view = technical_view(modules_results, &all_findings);
        let scan_duration = round_secs(started.elapsed().as_secs_f64());

        info!(
            scan_id = %scan_id,
            total_score = risk_score.total_score,
            risk_level = %risk_score.risk_level,
            findings = all_findings.len(),
            scan_duration,
            "Scan finished."
        );

        Ok(ScanReport {
            target: target.to_string(),
            scan_id,
            timestamp,
            risk_score,
            executive_view,
            technical_view,
            scan_duration,
        })
    }

    // Modules run concurrently; each result lands in the slot of its module so
    // the report keeps the fixed module order.
    async fn run_modules(&self, target: &Target) -> Result<Vec<ModuleResult>, ScanError> {
        let mut tasks = JoinSet::new();
        for (index, module) in self.modules.iter().enumerate() {
            let module = Arc::clone(module);
            let runner = self.runner;
            let target = target.clone();
            tasks.spawn(async move { (index, runner.run(module, &target).await) });
        }

        let mut slots: Vec<Option<ModuleResult>> = vec![None; self.modules.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| ScanError::Orchestration(e.to_string()))?;
            slots[index] = Some(result);
        }

        slots
            .into_iter()
            .zip(&self.modules)
            .map(|(slot, module)| {
                slot.ok_or_else(|| ScanError::Orchestration(format!("no result recorded for {}", module.name())))
            })
            .collect()
    }

    fn executive_view(
        &self,
        target: &Target,
        risk_score: &RiskScore,
        findings: &[Finding],
        timestamp: DateTime<Utc>,
    ) -> ExecutiveSummary {
        let mut top_risks = self.scorer.get_top_risks(findings, EXECUTIVE_LIST_LIMIT);
        if top_risks.is_empty() {
            top_risks.push(NO_RISKS_PLACEHOLDER.to_string());
        }
        let mut recommendations = self.scorer.get_recommendations(findings, EXECUTIVE_LIST_LIMIT);
        if recommendations.is_empty() {
            recommendations.push(NO_RECOMMENDATIONS_PLACEHOLDER.to_string());
        }

        ExecutiveSummary {
            exposure_score: risk_score.total_score,
            risk_level: risk_score.risk_level,
            top_risks,
            recommendations,
            scan_timestamp: timestamp,
            target: target.to_string(),
        }
    }
}

fn technical_view(modules_results: Vec<ModuleResult>, findings: &[Finding]) -> TechnicalDetails {
    TechnicalDetails {
        total_findings: findings.len(),
        findings_by_severity: SeverityCounts::from_findings(findings),
        execution_summary: ExecutionSummary::from_results(&modules_results),
        modules_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TargetError;
    use crate::core::models::{RiskLevel, Severity};
    use std::time::Duration;

    struct StubModule {
        name: &'static str,
        category: Category,
        delay: Duration,
        result: fn(&Target) -> Result<ModuleOutcome, ProbeError>,
    }

    #[async_trait]
    impl ProbeModule for StubModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn category(&self) -> Category {
            self.category
        }

        async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError> {
            tokio::time::sleep(self.delay).await;
            (self.result)(target)
        }
    }

    fn stub(
        name: &'static str,
        category: Category,
        delay_ms: u64,
        result: fn(&Target) -> Result<ModuleOutcome, ProbeError>,
    ) -> Arc<dyn ProbeModule> {
        Arc::new(StubModule { name, category, delay: Duration::from_millis(delay_ms), result })
    }

    fn scanner(modules: Vec<Arc<dyn ProbeModule>>) -> Scanner {
        Scanner::with_modules(modules, ModuleRunner::new(Duration::from_secs(5)), RiskScorer::default())
    }

    fn clean(_: &Target) -> Result<ModuleOutcome, ProbeError> {
        Ok(ModuleOutcome::default())
    }

    fn redis_exposed(_: &Target) -> Result<ModuleOutcome, ProbeError> {
        let finding = Finding::new(Category::Network, Severity::High, "Redis database publicly exposed", "d", 20)
            .with_recommendation("Close port 6379");
        Ok(ModuleOutcome::success(vec![finding], Metadata::new()))
    }

    fn unreachable(_: &Target) -> Result<ModuleOutcome, ProbeError> {
        Err(ProbeError::Timeout { operation: "TLS handshake", secs: 5 })
    }

    fn ip_only(target: &Target) -> Result<ModuleOutcome, ProbeError> {
        if target.domain().is_none() {
            Ok(ModuleOutcome::skipped("target is an IP address"))
        } else {
            Ok(ModuleOutcome::default())
        }
    }

    fn email_gaps(_: &Target) -> Result<ModuleOutcome, ProbeError> {
        let findings = vec![
            Finding::new(Category::EmailSecurity, Severity::High, "SPF not configured", "d", 15)
                .with_recommendation("Publish an SPF record"),
            Finding::new(Category::EmailSecurity, Severity::Critical, "Email protection completely absent", "d", 25)
                .with_recommendation("Configure SPF and DMARC"),
        ];
        Ok(ModuleOutcome::success(findings, Metadata::new()))
    }

    fn standard_stubs() -> Vec<Arc<dyn ProbeModule>> {
        vec![
            // Slowest first, so completion order differs from module order.
            stub("Network Exposure", Category::Network, 60, redis_exposed),
            stub("TLS Security", Category::Tls, 30, unreachable),
            stub("HTTP Security Headers", Category::HttpHeaders, 0, clean),
            stub("Domain Intelligence", Category::Domain, 10, ip_only),
            stub("Email Security", Category::EmailSecurity, 5, email_gaps),
        ]
    }

    #[tokio::test]
    async fn report_keeps_module_order_and_isolates_failures() {
        let report = scanner(standard_stubs()).scan("example.com").await.unwrap();

        let names: Vec<&str> = report
            .technical_view
            .modules_results
            .iter()
            .map(|m| m.module_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Network Exposure", "TLS Security", "HTTP Security Headers", "Domain Intelligence", "Email Security"]
        );

        let tls = &report.technical_view.modules_results[1];
        assert_eq!(tls.status, ModuleStatus::Failed);
        assert_eq!(tls.findings.len(), 1);
        assert_eq!(report.technical_view.modules_results[4].findings.len(), 2);

        let summary = &report.technical_view.execution_summary;
        assert_eq!(summary.total_modules, 5);
        assert_eq!(summary.successful, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.total_execution_time >= 0.09);

        assert_eq!(report.technical_view.total_findings, 4);
        assert_eq!(report.technical_view.findings_by_severity.critical, 1);
        assert_eq!(report.technical_view.findings_by_severity.high, 3);
        assert_eq!(report.scan_id.len(), 8);
    }

    #[tokio::test]
    async fn executive_view_ranks_risks_and_recommendations() {
        let report = scanner(standard_stubs()).scan("example.com").await.unwrap();
        let exec = &report.executive_view;
        assert_eq!(exec.target, "example.com");
        assert_eq!(exec.exposure_score, report.risk_score.total_score);
        assert_eq!(exec.top_risks[0], "[Email Security] Email protection completely absent");
        assert_eq!(exec.top_risks.len(), 3);
        assert_eq!(
            exec.recommendations,
            vec!["Configure SPF and DMARC", "Close port 6379", "Publish an SPF record"]
        );
        assert!(report.risk_score.category_scores[&Category::EmailSecurity] > 0);
        assert_eq!(report.risk_score.category_scores[&Category::Tls], 0);
    }

    #[tokio::test]
    async fn clean_scan_uses_positive_placeholders() {
        let modules = vec![
            stub("Network Exposure", Category::Network, 0, clean),
            stub("TLS Security", Category::Tls, 0, clean),
        ];
        let report = scanner(modules).scan("93.184.216.34").await.unwrap();
        assert_eq!(report.risk_score.total_score, 0);
        assert_eq!(report.risk_score.risk_level, RiskLevel::Low);
        assert_eq!(report.executive_view.top_risks, vec![NO_RISKS_PLACEHOLDER.to_string()]);
        assert_eq!(report.executive_view.recommendations, vec![NO_RECOMMENDATIONS_PLACEHOLDER.to_string()]);
    }

    #[tokio::test]
    async fn ip_target_skips_domain_only_modules() {
        let report = scanner(standard_stubs()).scan("93.184.216.34").await.unwrap();
        let domain = &report.technical_view.modules_results[3];
        assert_eq!(domain.status, ModuleStatus::Skipped);
        assert!(domain.findings.is_empty());
        assert_eq!(report.technical_view.execution_summary.skipped, 1);
    }

    #[tokio::test]
    async fn invalid_target_is_rejected_before_any_module_runs() {
        let err = scanner(standard_stubs()).scan("https://example.com").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidTarget(TargetError::UrlNotAllowed)));
    }

    #[tokio::test]
    async fn standard_scanner_registers_five_modules_in_order() {
        let scanner = Scanner::new(&ScannerConfig::default());
        assert_eq!(
            scanner.modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            vec!["Network Exposure", "TLS Security", "HTTP Security Headers", "Domain Intelligence", "Email Security"]
        );
    }

    #[tokio::test]
    async fn real_domain_modules_skip_ip_targets() {
        let scanner = Scanner::new(&ScannerConfig::default());
        let target: Target = "93.184.216.34".parse().unwrap();
        let runner = ModuleRunner::new(Duration::from_secs(5));
        for module in scanner.modules.iter().skip(3) {
            let result = runner.run(Arc::clone(module), &target).await;
            assert_eq!(result.status, ModuleStatus::Skipped, "{}", result.module_name);
            assert!(result.findings.is_empty());
            assert!(result.metadata.contains_key("reason"));
        }
    }
}
