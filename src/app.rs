// src/app.rs

use crate::core::models::{Finding, ModuleStatus, RiskLevel, ScanReport};
use ratatui::widgets::{ListState, ScrollbarState};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

pub const SPINNER_CHARS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Number of trailing log lines kept for the log panel.
const LOG_TAIL_LINES: usize = 200;

pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanSummary {
    pub score: u8,
    pub risk_level: Option<RiskLevel>,
    pub critical_issues: usize,
    pub high_issues: usize,
    pub moderate_issues: usize,
    pub low_issues: usize,
}

impl ScanSummary {
    pub fn total_issues(&self) -> usize {
        self.critical_issues + self.high_issues + self.moderate_issues + self.low_issues
    }
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    pub error_message: Option<String>,
    pub scan_report: Option<ScanReport>,
    /// Every finding of the report, most severe first.
    pub all_findings: Vec<Finding>,
    pub analysis_list_state: ListState,
    pub summary: ScanSummary,
    /// Score shown by the gauge; climbs towards `summary.score` on each tick.
    pub displayed_score: u8,
    pub spinner_frame: usize,
    pub show_logs: bool,
    pub log_path: PathBuf,
    pub log_content: Vec<String>,
    /// Bytes of the log file already loaded into `log_content`.
    log_offset: u64,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
}

impl App {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input: String::new(),
            error_message: None,
            scan_report: None,
            all_findings: Vec::new(),
            analysis_list_state: ListState::default(),
            summary: ScanSummary::default(),
            displayed_score: 0,
            spinner_frame: 0,
            show_logs: false,
            log_path,
            log_content: Vec::new(),
            log_offset: 0,
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
        }
    }

    pub fn on_tick(&mut self) {
        if matches!(self.state, AppState::Scanning) {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
        if self.displayed_score < self.summary.score {
            self.displayed_score += 1;
        }
        if self.show_logs {
            self.refresh_logs();
        }
    }

    pub fn start_scan(&mut self) {
        self.error_message = None;
        self.spinner_frame = 0;
        self.state = AppState::Scanning;
    }

    pub fn set_report(&mut self, report: ScanReport) {
        let mut findings: Vec<Finding> = report.findings().cloned().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(b.score_impact.cmp(&a.score_impact)));
        self.all_findings = findings;
        self.analysis_list_state = ListState::default();
        if !self.all_findings.is_empty() {
            self.analysis_list_state.select(Some(0));
        }
        self.scan_report = Some(report);
        self.displayed_score = 0;
        self.update_summary();
        self.state = AppState::Finished;
    }

    /// The scan was refused before it started, e.g. for a malformed target.
    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
        self.state = AppState::Idle;
    }

    pub fn update_summary(&mut self) {
        if let Some(report) = &self.scan_report {
            let counts = &report.technical_view.findings_by_severity;
            self.summary = ScanSummary {
                score: report.risk_score.total_score,
                risk_level: Some(report.risk_score.risk_level),
                critical_issues: counts.critical,
                high_issues: counts.high,
                moderate_issues: counts.moderate,
                low_issues: counts.low,
            };
        }
    }

    /// Module names with their status, in report order.
    pub fn module_statuses(&self) -> Vec<(&str, ModuleStatus)> {
        self.scan_report
            .as_ref()
            .map(|r| {
                r.technical_view
                    .modules_results
                    .iter()
                    .map(|m| (m.module_name.as_str(), m.status))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn selected_finding(&self) -> Option<&Finding> {
        self.analysis_list_state.selected().and_then(|i| self.all_findings.get(i))
    }

    pub fn select_next(&mut self) {
        if self.all_findings.is_empty() {
            return;
        }
        let next = match self.analysis_list_state.selected() {
            Some(i) if i + 1 < self.all_findings.len() => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.analysis_list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.all_findings.is_empty() {
            return;
        }
        let previous = match self.analysis_list_state.selected() {
            Some(0) | None => self.all_findings.len() - 1,
            Some(i) => i - 1,
        };
        self.analysis_list_state.select(Some(previous));
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
        if self.show_logs {
            self.refresh_logs();
        }
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    /// Appends the lines written since the last refresh.
    fn refresh_logs(&mut self) {
        // The log file may not exist yet; the panel then stays empty.
        let Ok(mut file) = File::open(&self.log_path) else {
            return;
        };
        let Ok(len) = file.metadata().map(|m| m.len()) else {
            return;
        };
        if len < self.log_offset {
            // Truncated or replaced.
            self.log_offset = 0;
            self.log_content.clear();
        }
        if len == self.log_offset {
            return;
        }

        let mut fresh = Vec::new();
        if file.seek(SeekFrom::Start(self.log_offset)).is_err() || file.read_to_end(&mut fresh).is_err() {
            return;
        }
        // A line still being written is picked up on a later tick.
        let Some(end) = fresh.iter().rposition(|&b| b == b'\n') else {
            return;
        };
        self.log_offset += end as u64 + 1;
        self.log_content
            .extend(String::from_utf8_lossy(&fresh[..end]).lines().map(str::to_string));
        let excess = self.log_content.len().saturating_sub(LOG_TAIL_LINES);
        self.log_content.drain(..excess);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.error_message = None;
        self.scan_report = None;
        self.all_findings = Vec::new();
        self.analysis_list_state = ListState::default();
        self.summary = ScanSummary::default();
        self.displayed_score = 0;
        self.spinner_frame = 0;
    }
}
