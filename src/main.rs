//! Ramtop - A terminal dashboard for browsing and tracking RAM prices.

mod api;
mod app;
mod chart;
mod cli;
mod config;
mod error;
mod export;
mod listing;
mod models;
mod ui;

use anyhow::{Context, Result, anyhow};
use api::PriceTrackerClient;
use app::{App, InputMode, LOAD_FALLBACK_ERROR};
use chart::CHART_FALLBACK_ERROR;
use cli::Args;
use config::Config;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use listing::{ListView, SortConfig};
use models::SortKey;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    if args.print_config {
        print!("{}", config::sample_config());
        return Ok(());
    }

    if args.init_config {
        let path = Config::default_config_path()
            .ok_or_else(|| anyhow!("Could not determine the configuration directory"))?;
        Config::write_sample(&path)?;
        println!("Wrote sample configuration to {}", path.display());
        return Ok(());
    }

    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::load(path)?
    } else {
        Config::load_or_default()
    };
    args.apply_to(&mut config);

    init_logging(&config, args.batch || args.history.is_some())?;

    if args.batch || args.history.is_some() {
        run_batch(&args, &config).await
    } else {
        let mut app = App::new(&args, &config)?;
        run_interactive(&mut app).await
    }
}

/// Install the tracing subscriber.
///
/// Batch runs log to stderr. Interactive runs log only when a log file is
/// configured, since the terminal belongs to the UI.
fn init_logging(config: &Config, batch: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env("RAMTOP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.file {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if batch => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }

    Ok(())
}

/// Run in batch mode: print the listings (or one listing's history) and exit.
async fn run_batch(args: &Args, config: &Config) -> Result<()> {
    let client = PriceTrackerClient::new(&config.api.base_url, config.api.timeout)
        .context("Failed to create API client")?;
    let currency = &config.display.currency;

    let output = match args.history {
        Some(id) if args.raw => {
            let points = client
                .fetch_price_history(id)
                .await
                .map_err(|e| anyhow!(e.user_message(CHART_FALLBACK_ERROR)))?;
            export::export_history(&points, args.export, currency)?
        }
        Some(id) => {
            let series = client
                .fetch_series(id)
                .await
                .map_err(|e| anyhow!(e.user_message(CHART_FALLBACK_ERROR)))?;
            if series.is_empty() {
                info!(id, "no price history");
            }
            export::export_series(&series, args.export, currency)?
        }
        None => {
            let items = client
                .list_items()
                .await
                .map_err(|e| anyhow!(e.user_message(LOAD_FALLBACK_ERROR)))?;

            let mut view = ListView::new(0);
            view.sort = SortConfig {
                key: config.display.sort_key(),
                direction: config.display.sort_direction(),
            };
            if let Some(ref filter) = args.filter {
                view.set_filter(filter.clone());
            }

            let derived = view.derive(&items);
            info!(total = items.len(), shown = derived.len(), "batch listing");
            export::export_listings(&derived, args.export, currency)?
        }
    };

    println!("{}", output.trim_end());
    Ok(())
}

/// Run in interactive mode with TUI.
async fn run_interactive(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Initial fetch
    app.start_load();

    // Main loop
    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        // Draw UI
        terminal.draw(|f| ui::render(f, app))?;

        // Handle events with timeout
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code, key.modifiers);
                }
            }
        }

        // Check if we should quit
        if app.should_quit() {
            break;
        }

        app.drain_events();
        app.on_tick();

        // Let spawned requests make progress between frames
        tokio::task::yield_now().await;
    }

    Ok(())
}

/// Sort key bound to a digit key, `1` being the first.
fn sort_key_for(c: char) -> Option<SortKey> {
    let index = c.to_digit(10)? as usize;
    index
        .checked_sub(1)
        .and_then(|i| SortKey::ALL.get(i))
        .copied()
}

/// Handle keyboard input.
fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    // Close help overlay on any key
    if app.show_help {
        app.show_help = false;
        return;
    }

    // The chart modal captures input until closed
    if app.is_chart_visible() {
        match code {
            KeyCode::Esc
            | KeyCode::Enter
            | KeyCode::Backspace
            | KeyCode::Char('q')
            | KeyCode::Char('x') => app.close_chart(),
            _ => {}
        }
        return;
    }

    match app.mode {
        InputMode::Search => match code {
            KeyCode::Enter => app.mode = InputMode::Browse,
            KeyCode::Esc => {
                app.list.set_filter(String::new());
                app.mode = InputMode::Browse;
            }
            KeyCode::Backspace => app.list.pop_filter_char(),
            KeyCode::Char(c) => app.list.push_filter_char(c),
            _ => {}
        },
        InputMode::SortMenu => match code {
            KeyCode::Char(c) => {
                if let Some(key) = sort_key_for(c) {
                    app.activate_sort(key);
                } else if c == 'q' || c == 's' {
                    app.mode = InputMode::Browse;
                }
            }
            KeyCode::Esc => app.mode = InputMode::Browse,
            _ => {}
        },
        InputMode::Browse => handle_browse_key(app, code),
    }
}

fn handle_browse_key(app: &mut App, code: KeyCode) {
    match code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_up(),
        KeyCode::Down | KeyCode::Char('j') => app.select_down(),
        KeyCode::Home | KeyCode::Char('g') => app.select_top(),
        KeyCode::End | KeyCode::Char('G') => app.select_bottom(),

        // Pages
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => app.next_page(),
        KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') => app.prev_page(),
        KeyCode::Char('[') => app.first_page(),
        KeyCode::Char(']') => app.last_page(),

        // Search and sorting
        KeyCode::Char('/') => app.mode = InputMode::Search,
        KeyCode::Char('s') => app.mode = InputMode::SortMenu,
        KeyCode::Char('o') => app.list.cycle_sort(),
        KeyCode::Char(c @ '1'..='8') => {
            if let Some(key) = sort_key_for(c) {
                app.activate_sort(key);
            }
        }

        // Actions
        KeyCode::Enter => app.open_highlighted(),
        KeyCode::Char('t') => {
            app.track_highlighted();
        }
        KeyCode::Char('R') => app.reload(),
        KeyCode::Char('h') | KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}
