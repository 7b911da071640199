// src/ui/widgets/summary.rs

use super::severity_color;
use crate::app::{App, AppState};
use crate::core::models::{ModuleStatus, RiskLevel, Severity};
use crate::core::risk_scorer::RiskScorer;
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

/// Renders the exposure score, category scores, severity counts and module
/// statuses. Empty until a scan has finished.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Score & risk level
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(6), // Category scores
            Constraint::Length(1), // Spacer
            Constraint::Length(5), // Severity counts
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Module statuses
        ])
        .split(area);

    if !matches!(app.state, AppState::Finished) {
        return;
    }
    let Some(report) = &app.scan_report else { return };

    // --- Score & Risk Level ---
    let level = app.summary.risk_level.unwrap_or(RiskLevel::Low);
    let level_style = Style::default().fg(risk_color(level));
    let score_line = Line::from(format!("{}/100 ({})", app.summary.score, level.to_string().to_uppercase())).style(level_style);
    let score_text = Text::from(vec![Line::from("Exposure Score".bold()), score_line]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);

    // --- Gauge (animated) ---
    let displayed_level = RiskScorer::default().risk_level(app.displayed_score);
    let score_gauge = Gauge::default()
        .percent(u16::from(app.displayed_score.min(100)))
        .label(format!("{}", app.displayed_score))
        .style(Style::default().fg(risk_color(displayed_level)));
    frame.render_widget(score_gauge, summary_chunks[1]);

    // --- Category Scores ---
    let category_lines: Vec<Line> = report
        .risk_score
        .category_scores
        .iter()
        .map(|(category, score)| {
            Line::from(vec![
                Span::raw(format!("{:<15}", category.to_string())),
                Span::styled(format!("{score:>3}"), Style::default().fg(if *score > 0 { Color::Yellow } else { Color::Green })),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(category_lines).block(Block::default().title("CATEGORY SCORES".bold())),
        summary_chunks[3],
    );

    // --- Severity Counts ---
    let counts = [
        (Severity::Critical, app.summary.critical_issues),
        (Severity::High, app.summary.high_issues),
        (Severity::Moderate, app.summary.moderate_issues),
        (Severity::Low, app.summary.low_issues),
    ];
    let count_lines: Vec<Line> = counts
        .into_iter()
        .map(|(severity, count)| {
            Line::from(vec![
                Span::raw(format!("{:<10}", format!("{severity}:"))),
                Span::styled(count.to_string(), Style::default().fg(severity_color(severity))),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(count_lines).block(Block::default().title("ISSUES FOUND".bold())),
        summary_chunks[5],
    );

    // --- Module Statuses ---
    let module_lines: Vec<Line> = app
        .module_statuses()
        .into_iter()
        .map(|(name, status)| {
            let (icon, style) = match status {
                ModuleStatus::Success => ("✓", Style::default().fg(Color::Green)),
                ModuleStatus::Failed => ("✗", Style::default().fg(Color::Red)),
                ModuleStatus::Skipped => ("–", Style::default().fg(Color::DarkGray)),
            };
            Line::from(vec![Span::styled(format!("{icon} "), style), Span::raw(name)])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(module_lines).block(Block::default().title("MODULES".bold())),
        summary_chunks[7],
    );
}

fn risk_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::Low => Color::Green,
        RiskLevel::Moderate => Color::Yellow,
        RiskLevel::High => Color::LightRed,
        RiskLevel::Critical => Color::Red,
    }
}
