// src/ui/widgets/mod.rs

pub mod analysis_view; // Findings list with the detail pane.
pub mod disclaimer_popup; // Authorization disclaimer shown at startup.
pub mod footer; // Key bindings for the current state.
pub mod input; // Target input bar.
pub mod log_view; // Tail of the log file.
pub mod summary; // Exposure score, severity counts and module statuses.

use crate::core::models::Severity;
use ratatui::style::Color;

/// Colour used for a severity across every widget.
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::LightRed,
        Severity::Moderate => Color::Yellow,
        Severity::Low => Color::Cyan,
    }
}
