// src/ui/widgets/analysis_view.rs

use super::severity_color;
use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::models::Finding;
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (navigate with ↑ ↓)");

    if !matches!(app.state, AppState::Finished) {
        let content = match app.state {
            AppState::Idle => Paragraph::new("Scan results will appear here...").alignment(Alignment::Center),
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame];
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{spinner_char} "), Style::default().fg(Color::Cyan)),
                    Span::raw("Running network, TLS, headers, domain and email probes..."),
                ]))
                .alignment(Alignment::Center)
            }
            AppState::Finished => Paragraph::new(""),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = app
        .all_findings
        .iter()
        .map(|f| {
            let line = Line::from(vec![
                Span::styled(format!("{:<9}", f.severity.to_string().to_uppercase()), Style::default().fg(severity_color(f.severity)).bold()),
                Span::styled(format!("[{}] ", f.category), Style::default().fg(Color::DarkGray)),
                Span::raw(f.title.as_str()),
            ]);
            ListItem::new(line)
        })
        .collect();

    let findings_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(findings_list, chunks[0], &mut app.analysis_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    match app.selected_finding() {
        Some(finding) => {
            let p = Paragraph::new(detail_lines(finding))
                .wrap(Wrap { trim: true })
                .block(detail_block);
            frame.render_widget(p, chunks[1]);
        }
        None => render_placeholder_details(frame, app, detail_block, chunks[1]),
    }
}

fn detail_lines(finding: &Finding) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(finding.title.as_str(), Style::default().fg(severity_color(finding.severity)).bold()),
            Span::styled(format!("  (score impact {})", finding.score_impact), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from("WHAT IT IS:".yellow().bold()),
        Line::from(finding.description.as_str()),
    ];
    let sections = [
        ("EVIDENCE:", &finding.evidence),
        ("IMPACT:", &finding.impact),
        ("HOW TO FIX:", &finding.recommendation),
    ];
    for (heading, text) in sections {
        if let Some(text) = text {
            lines.push(Line::from(""));
            lines.push(Line::from(heading.yellow().bold()));
            lines.push(Line::from(text.as_str()));
        }
    }
    lines
}

fn render_placeholder_details(frame: &mut Frame, app: &App, block: Block, area: Rect) {
    let placeholder_text = if app.summary.total_issues() == 0 {
        Text::from(vec![
            Line::from(""),
            Line::from("✓ NO EXPOSURE DETECTED".bold().fg(Color::Green)),
            Line::from(""),
            Line::from("None of the probes reported a finding for this target."),
        ])
    } else {
        Text::from("Select an item above to see details.")
    };

    let p = Paragraph::new(placeholder_text).alignment(Alignment::Center).block(block);
    frame.render_widget(p, area);
}
