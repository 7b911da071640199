// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString};

// --- Reusable Types ---

// Opaque key -> value diagnostic context attached to a module result.
pub type Metadata = serde_json::Map<String, Value>;

// --- Core Data Models ---

// The severity of a finding. Declaration order is the ranking order,
// so `Ord` gives low < moderate < high < critical.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank used when ordering findings for the executive view.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Moderate => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

// The fixed set of dimensions a finding can belong to.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
pub enum Category {
    #[serde(rename = "Network")]
    #[strum(serialize = "Network")]
    Network,
    #[serde(rename = "TLS")]
    #[strum(serialize = "TLS")]
    Tls,
    #[serde(rename = "HTTP Headers")]
    #[strum(serialize = "HTTP Headers")]
    HttpHeaders,
    #[serde(rename = "Domain")]
    #[strum(serialize = "Domain")]
    Domain,
    #[serde(rename = "Email Security")]
    #[strum(serialize = "Email Security")]
    EmailSecurity,
}

// One observed issue or fact. `score_impact` is unsigned and capped at 100 by
// the constructor; zero marks a purely informational finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub evidence: Option<String>,
    pub impact: Option<String>,
    pub recommendation: Option<String>,
    pub score_impact: u8,
}

impl Finding {
    pub fn new(
        category: Category,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        score_impact: u8,
    ) -> Self {
        Self {
            category,
            severity,
            title: title.into(),
            description: description.into(),
            evidence: None,
            impact: None,
            recommendation: None,
            score_impact: score_impact.min(100),
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

// --- Module Results ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModuleStatus {
    Success,
    Failed,
    Skipped,
}

// The outcome of one probing module, created once per module per scan by the
// module runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleResult {
    pub module_name: String,
    pub status: ModuleStatus,
    pub findings: Vec<Finding>,
    pub metadata: Metadata,
    pub execution_time: f64,
}

// --- Risk Score ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskScore {
    pub total_score: u8,
    pub risk_level: RiskLevel,
    pub category_scores: BTreeMap<Category, u8>,
}

// --- Report Views ---

// Condensed, management-oriented view of a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    pub exposure_score: u8,
    pub risk_level: RiskLevel,
    pub top_risks: Vec<String>,
    pub recommendations: Vec<String>,
    pub scan_timestamp: DateTime<Utc>,
    pub target: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Moderate => counts.moderate += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionSummary {
    pub total_modules: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_execution_time: f64,
}

impl ExecutionSummary {
    pub fn from_results(results: &[ModuleResult]) -> Self {
        let count = |status: ModuleStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            total_modules: results.len(),
            successful: count(ModuleStatus::Success),
            failed: count(ModuleStatus::Failed),
            skipped: count(ModuleStatus::Skipped),
            total_execution_time: round_secs(results.iter().map(|r| r.execution_time).sum()),
        }
    }
}

// Full, analyst-oriented view of a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalDetails {
    pub modules_results: Vec<ModuleResult>,
    pub total_findings: usize,
    pub findings_by_severity: SeverityCounts,
    pub execution_summary: ExecutionSummary,
}

// --- Main Report ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    pub target: String,
    pub scan_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: RiskScore,
    pub executive_view: ExecutiveSummary,
    pub technical_view: TechnicalDetails,
    pub scan_duration: f64,
}

impl ScanReport {
    /// Iterates over every finding of every module, in module order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.technical_view
            .modules_results
            .iter()
            .flat_map(|m| m.findings.iter())
    }
}

/// Rounds a duration in seconds to hundredths.
pub fn round_secs(secs: f64) -> f64 {
    (secs.max(0.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn sample_report() -> ScanReport {
        let timestamp = DateTime::parse_from_rfc3339("2026-03-01T10:15:30Z")
            .unwrap()
            .with_timezone(&Utc);
        let finding = Finding::new(
            Category::EmailSecurity,
            Severity::Critical,
            "Email protection completely absent",
            "Neither SPF nor DMARC is configured",
            25,
        )
        .with_recommendation("Configure SPF and DMARC");
        let mut metadata = Metadata::new();
        metadata.insert("spf".into(), json!({"present": false}));
        let result = ModuleResult {
            module_name: "Email Security".into(),
            status: ModuleStatus::Success,
            findings: vec![finding.clone()],
            metadata,
            execution_time: 0.37,
        };
        let mut category_scores = BTreeMap::new();
        category_scores.insert(Category::EmailSecurity, 20);
        category_scores.insert(Category::HttpHeaders, 0);
        ScanReport {
            target: "example.com".into(),
            scan_id: "1a2b3c4d".into(),
            timestamp,
            risk_score: RiskScore {
                total_score: 4,
                risk_level: RiskLevel::Low,
                category_scores,
            },
            executive_view: ExecutiveSummary {
                exposure_score: 4,
                risk_level: RiskLevel::Low,
                top_risks: vec!["[Email Security] Email protection completely absent".into()],
                recommendations: vec!["Configure SPF and DMARC".into()],
                scan_timestamp: timestamp,
                target: "example.com".into(),
            },
            technical_view: TechnicalDetails {
                total_findings: 1,
                findings_by_severity: SeverityCounts::from_findings([&finding]),
                execution_summary: ExecutionSummary::from_results(std::slice::from_ref(&result)),
                modules_results: vec![result],
            },
            scan_duration: 1.23,
        }
    }

    #[test]
    fn severity_orders_from_low_to_critical() {
        assert!(Severity::Low < Severity::Moderate);
        assert!(Severity::Moderate < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Critical.rank(), 4);
        assert_eq!(Severity::Low.rank(), 1);
    }

    #[test]
    fn enums_use_their_string_tokens() {
        assert_eq!(serde_json::to_value(Category::HttpHeaders).unwrap(), json!("HTTP Headers"));
        assert_eq!(serde_json::to_value(Category::Tls).unwrap(), json!("TLS"));
        assert_eq!(serde_json::to_value(Severity::Moderate).unwrap(), json!("moderate"));
        assert_eq!(serde_json::to_value(ModuleStatus::Skipped).unwrap(), json!("skipped"));
        assert_eq!(serde_json::to_value(RiskLevel::Critical).unwrap(), json!("critical"));
        assert_eq!(Category::EmailSecurity.to_string(), "Email Security");
        assert_eq!(Category::from_str("Domain").unwrap(), Category::Domain);
        assert_eq!(Severity::from_str("high").unwrap(), Severity::High);
    }

    #[test]
    fn score_impact_is_capped_at_one_hundred() {
        let finding = Finding::new(Category::Network, Severity::High, "t", "d", 250);
        assert_eq!(finding.score_impact, 100);
    }

    #[test]
    fn report_survives_a_json_round_trip() {
        let report = sample_report();
        let encoded = serde_json::to_string(&report).unwrap();
        let decoded: ScanReport = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, report);
        assert_eq!(decoded.scan_duration, 1.23);
        assert_eq!(decoded.technical_view.modules_results[0].execution_time, 0.37);

        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["risk_score"]["risk_level"], json!("low"));
        assert_eq!(value["risk_score"]["category_scores"]["Email Security"], json!(20));
        assert_eq!(value["technical_view"]["modules_results"][0]["status"], json!("success"));
        assert_eq!(value["technical_view"]["findings_by_severity"]["critical"], json!(1));
    }

    #[test]
    fn execution_summary_counts_statuses_and_time() {
        let make = |status, time| ModuleResult {
            module_name: "m".into(),
            status,
            findings: Vec::new(),
            metadata: Metadata::new(),
            execution_time: time,
        };
        let results = vec![
            make(ModuleStatus::Success, 1.25),
            make(ModuleStatus::Failed, 0.5),
            make(ModuleStatus::Skipped, 0.0),
            make(ModuleStatus::Success, 0.26),
        ];
        let summary = ExecutionSummary::from_results(&results);
        assert_eq!(summary.total_modules, 4);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total_execution_time, 2.01);
    }
}
