// src/core/risk_scorer.rs

use crate::core::models::{Category, Finding, RiskLevel, RiskScore};
use std::collections::BTreeMap;
use tracing::debug;

/// Lower bounds (inclusive) of the moderate, high and critical risk bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskThresholds {
    pub moderate: u8,
    pub high: u8,
    pub critical: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { moderate: 26, high: 51, critical: 76 }
    }
}

/// Category weights and risk thresholds. Immutable once handed to a scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub weights: BTreeMap<Category, f64>,
    pub thresholds: RiskThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = BTreeMap::from([
            (Category::Network, 0.25),
            (Category::Tls, 0.25),
            (Category::HttpHeaders, 0.20),
            (Category::Domain, 0.10),
            (Category::EmailSecurity, 0.20),
        ]);
        Self { weights, thresholds: RiskThresholds::default() }
    }
}

/// Turns the union of all findings into category scores, a weighted total and
/// a risk level, and ranks findings for the executive view.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn calculate_score(&self, findings: &[Finding]) -> RiskScore {
        let mut category_scores = BTreeMap::new();
        let mut weighted_total = 0.0;

        for (&category, &weight) in &self.config.weights {
            let in_category: Vec<&Finding> = findings.iter().filter(|f| f.category == category).collect();
            let score = category_score(&in_category);
            weighted_total += f64::from(score) * weight;
            category_scores.insert(category, score);
        }

        let total_score = weighted_total.clamp(0.0, 100.0).round() as u8;
        let risk_level = self.risk_level(total_score);
        debug!(total_score, %risk_level, "Risk score calculated.");

        RiskScore { total_score, risk_level, category_scores }
    }

    pub fn risk_level(&self, total_score: u8) -> RiskLevel {
        let t = &self.config.thresholds;
        if total_score >= t.critical {
            RiskLevel::Critical
        } else if total_score >= t.high {
            RiskLevel::High
        } else if total_score >= t.moderate {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// The `limit` most severe findings rendered as `"[category] title"`.
    pub fn get_top_risks(&self, findings: &[Finding], limit: usize) -> Vec<String> {
        rank_findings(findings)
            .into_iter()
            .take(limit)
            .map(|f| format!("[{}] {}", f.category, f.title))
            .collect()
    }

    /// Up to `limit` distinct, non-empty recommendations, most severe first.
    pub fn get_recommendations(&self, findings: &[Finding], limit: usize) -> Vec<String> {
        let mut recommendations: Vec<String> = Vec::new();
        for finding in rank_findings(findings) {
            if recommendations.len() >= limit {
                break;
            }
            let Some(text) = finding.recommendation.as_deref() else { continue };
            if text.trim().is_empty() || recommendations.iter().any(|r| r == text) {
                continue;
            }
            recommendations.push(text.to_string());
        }
        recommendations
    }
}

/// `min(100, impact * (1 + ln(count) / 5) * 0.8)`, truncated. `count` covers
/// every finding of the category; a category whose impacts sum to zero scores 0.
fn category_score(findings: &[&Finding]) -> u8 {
    let total_impact: f64 = findings.iter().map(|f| f64::from(f.score_impact)).sum();
    if total_impact == 0.0 {
        return 0;
    }
    let count_factor = 1.0 + (findings.len() as f64).ln() / 5.0;
    (total_impact * count_factor * 0.8).min(100.0) as u8
}

// Stable: equal-rank findings keep their emission order.
fn rank_findings(findings: &[Finding]) -> Vec<&Finding> {
    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then(b.score_impact.cmp(&a.score_impact))
    });
    sorted
}
