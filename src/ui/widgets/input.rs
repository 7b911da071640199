// src/ui/widgets/input.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Renders the target input bar. A rejected target replaces the title with
/// the validation error.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_block = match &app.error_message {
        Some(message) => Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(Line::from(message.as_str()).red()),
        None => Block::default().borders(Borders::ALL).title("Target (domain or IP address)"),
    };
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    // The cursor is only shown while typing.
    if matches!(app.state, AppState::Idle) && !app.show_disclaimer {
        let width = app.input.chars().count() as u16;
        frame.set_cursor_position((area.x + width + 1, area.y + 1));
    }
}
