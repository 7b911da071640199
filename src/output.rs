// src/output.rs

// Terminal renderings of a finished scan report.

use crate::core::models::ScanReport;
use clap::ValueEnum;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Table,
    /// The full report as pretty-printed JSON.
    Json,
}

pub fn render(report: &ScanReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Table => Ok(format_table(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report),
    }
}

pub fn format_table(report: &ScanReport) -> String {
    let mut out = String::new();
    let exec = &report.executive_view;

    // Writing into a String cannot fail.
    let _ = writeln!(out, "=== Exposure RS Scanner ===");
    let _ = writeln!(out, "Target        : {}", report.target);
    let _ = writeln!(out, "Scan ID       : {}", report.scan_id);
    let _ = writeln!(out, "Timestamp     : {}", report.timestamp.to_rfc3339());
    let _ = writeln!(
        out,
        "Exposure Score: {} ({})",
        report.risk_score.total_score, report.risk_score.risk_level
    );
    let _ = writeln!(out, "Duration      : {:.2}s", report.scan_duration);

    let _ = writeln!(out, "Top Risks     :");
    write_bullets(&mut out, &exec.top_risks);
    let _ = writeln!(out, "Recommendations:");
    write_bullets(&mut out, &exec.recommendations);

    let _ = writeln!(out, "Modules:");
    for module in &report.technical_view.modules_results {
        let _ = writeln!(
            out,
            "  * {} (status={}, findings={}, {:.2}s)",
            module.module_name,
            module.status,
            module.findings.len(),
            module.execution_time
        );
        for finding in &module.findings {
            let _ = writeln!(out, "      - [{}] {}", finding.severity, finding.title);
        }
    }

    out.trim_end().to_string()
}

fn write_bullets(out: &mut String, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "  - N/A");
    }
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        Category, ExecutionSummary, ExecutiveSummary, Finding, Metadata, ModuleResult, ModuleStatus, RiskLevel,
        RiskScore, Severity, SeverityCounts, TechnicalDetails,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn report() -> ScanReport {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 30).unwrap();
        let finding = Finding::new(Category::Network, Severity::High, "Redis database publicly exposed", "d", 20);
        let modules_results = vec![
            ModuleResult {
                module_name: "Network Exposure".into(),
                status: ModuleStatus::Success,
                findings: vec![finding.clone()],
                metadata: Metadata::new(),
                execution_time: 2.04,
            },
            ModuleResult {
                module_name: "Domain Intelligence".into(),
                status: ModuleStatus::Skipped,
                findings: Vec::new(),
                metadata: Metadata::new(),
                execution_time: 0.0,
            },
        ];
        ScanReport {
            target: "93.184.216.34".into(),
            scan_id: "deadbeef".into(),
            timestamp,
            risk_score: RiskScore { total_score: 4, risk_level: RiskLevel::Low, category_scores: BTreeMap::new() },
            executive_view: ExecutiveSummary {
                exposure_score: 4,
                risk_level: RiskLevel::Low,
                top_risks: vec!["[Network] Redis database publicly exposed".into()],
                recommendations: Vec::new(),
                scan_timestamp: timestamp,
                target: "93.184.216.34".into(),
            },
            technical_view: TechnicalDetails {
                total_findings: 1,
                findings_by_severity: SeverityCounts::from_findings([&finding]),
                execution_summary: ExecutionSummary::from_results(&modules_results),
                modules_results,
            },
            scan_duration: 2.1,
        }
    }

    #[test]
    fn table_lists_summary_and_modules() {
        let table = format_table(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "=== Exposure RS Scanner ===");
        assert!(lines.contains(&"Exposure Score: 4 (low)"));
        assert!(lines.contains(&"  - [Network] Redis database publicly exposed"));
        assert!(lines.contains(&"  - N/A"));
        assert!(lines.contains(&"  * Network Exposure (status=success, findings=1, 2.04s)"));
        assert!(lines.contains(&"      - [high] Redis database publicly exposed"));
        assert!(lines.contains(&"  * Domain Intelligence (status=skipped, findings=0, 0.00s)"));
    }

    #[test]
    fn json_output_is_the_full_report() {
        let rendered = render(&report(), OutputFormat::Json).unwrap();
        let decoded: ScanReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(decoded, report());
    }
}
