// src/ui/widgets/footer.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &'static str) -> Span<'static> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the key bindings available in the current state.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = if app.show_disclaimer {
        Line::from(vec![Span::raw("Press "), key("Enter"), Span::raw(" to acknowledge the disclaimer.")])
    } else {
        match app.state {
            AppState::Idle => Line::from(vec![
                Span::raw("Press "),
                key("Enter"),
                Span::raw(" to scan, "),
                key("Esc"),
                Span::raw(" to quit."),
            ]),
            AppState::Finished => Line::from(vec![
                key("↑↓"),
                Span::raw(" select, "),
                key("[N]"),
                Span::raw("ew Scan, "),
                key("[L]"),
                Span::raw("ogs, "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
            AppState::Scanning => Line::from(vec![
                Span::raw("Scanning... "),
                key("[L]"),
                Span::raw("ogs, "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
        }
    };

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
