// src/main.rs

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::{stdin, stdout, BufRead, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

mod app;
mod config;
mod core;
mod logging;
mod output;
mod server;
mod ui;

use crate::app::{App, AppState};
use crate::config::{ScannerConfig, ServerSettings, DEFAULT_BIND};
use crate::core::error::ScanError;
use crate::core::models::ScanReport;
use crate::core::scanner::Scanner;
use crate::logging::LogSink;
use crate::output::OutputFormat;

type ScanResult = Result<ScanReport, ScanError>;

/// Attack surface discovery and misconfiguration assessment.
#[derive(Parser, Debug)]
#[command(name = "exposure-rs", version, about)]
struct Cli {
    /// Defaults to the interactive terminal UI.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal UI.
    Tui,
    /// Scan one target and print the report.
    Scan {
        /// Domain or IP address. Prompted for when omitted.
        #[arg(short, long)]
        target: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Skip the authorization confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Serve the REST API.
    Serve {
        #[arg(long, env = "EXPOSURE_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_tui().await,
        Command::Scan { target, format, yes } => run_scan(target, format, yes).await,
        Command::Serve { bind } => {
            logging::initialize_logging(LogSink::Stderr)?;
            server::serve(ServerSettings { bind }, &ScannerConfig::from_env()).await
        }
    }
}

// --- One-shot scan ---

async fn run_scan(target: Option<String>, format: OutputFormat, yes: bool) -> Result<()> {
    logging::initialize_logging(LogSink::Stderr)?;

    let target = match target {
        Some(t) => t,
        None => prompt("Target (domain or IP address): ")?,
    };
    if !yes {
        let answer = prompt(&format!("Scan {target}? Only scan assets you are authorized to test. [y/N] "))?;
        if !matches!(answer.to_lowercase().as_str(), "y" | "yes") {
            eprintln!("Scan cancelled.");
            return Ok(());
        }
    }

    let scanner = Scanner::new(&ScannerConfig::from_env());
    match scanner.scan(&target).await {
        Ok(report) => {
            let rendered = output::render(&report, format).wrap_err("failed to render the report")?;
            println!("{rendered}");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Scan failed.");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    eprint!("{message}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// --- Terminal UI ---

async fn run_tui() -> Result<()> {
    logging::initialize_logging(LogSink::File)?;
    info!("Starting terminal UI.");

    let scanner = Arc::new(Scanner::new(&ScannerConfig::from_env()));
    let mut app = App::new(logging::log_file_path());
    let (tx, mut rx) = mpsc::channel::<ScanResult>(1);

    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let outcome = event_loop(&mut terminal, &mut app, &scanner, &tx, &mut rx).await;

    // The terminal is restored even when the loop failed.
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    scanner: &Arc<Scanner>,
    tx: &mpsc::Sender<ScanResult>,
    rx: &mut mpsc::Receiver<ScanResult>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(app, scanner, tx)?;
        }

        if let Ok(result) = rx.try_recv() {
            match result {
                Ok(report) => app.set_report(report),
                Err(e) => app.set_error(e.to_string()),
            }
        }
        app.on_tick();
    }
    Ok(())
}

fn handle_events(app: &mut App, scanner: &Arc<Scanner>, tx: &mpsc::Sender<ScanResult>) -> Result<()> {
    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    if app.show_disclaimer {
        match key.code {
            KeyCode::Enter => app.show_disclaimer = false,
            KeyCode::Esc => app.quit(),
            _ => {}
        }
        return Ok(());
    }

    if app.show_logs {
        match key.code {
            KeyCode::Left => {
                app.scroll_logs_left();
                return Ok(());
            }
            KeyCode::Right => {
                app.scroll_logs_right();
                return Ok(());
            }
            _ => {}
        }
    }

    match app.state {
        AppState::Idle => handle_idle_input(app, key.code, scanner, tx),
        AppState::Finished => handle_finished_input(app, key.code),
        AppState::Scanning => match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => app.quit(),
            KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_logs(),
            _ => {}
        },
    }
    Ok(())
}

/// Typing goes into the target field, so only Esc quits here.
fn handle_idle_input(app: &mut App, key_code: KeyCode, scanner: &Arc<Scanner>, tx: &mpsc::Sender<ScanResult>) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => {
            app.error_message = None;
            app.input.push(c);
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                return;
            }
            app.start_scan();
            let scanner = Arc::clone(scanner);
            let tx = tx.clone();
            let input = app.input.clone();
            info!(target = %input, "Scan started from the terminal UI.");
            tokio::spawn(async move {
                let result = scanner.scan(&input).await;
                let _ = tx.send(result).await;
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.reset(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_logs(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        _ => {}
    }
}
