//! Terminal user interface with ratatui.

use crate::app::{App, InputMode, LoadState, Notice, NoticeLevel};
use crate::chart::{ChartModel, ChartState, format_tick};
use crate::export::{format_price, truncate_string};
use crate::listing::TrackControl;
use crate::models::{RamListing, SortKey};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table,
        TableState, Wrap,
    },
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Page links kept at each end of the pagination bar.
const PAGE_MARGIN: usize = 2;
/// Page links shown around the current page.
const PAGE_RANGE: usize = 5;

/// Colors for the UI.
pub struct UiColors {
    pub accent: Color,
    pub success: Color,
    pub error: Color,
    pub dim: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub border: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            success: Color::Green,
            error: Color::Red,
            dim: Color::DarkGray,
            header_bg: Color::DarkGray,
            selected_bg: Color::Rgb(40, 40, 60),
            border: Color::DarkGray,
        }
    }
}

/// Render the main UI.
pub fn render(frame: &mut Frame, app: &App) {
    let colors = UiColors::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Length(3), // Search bar
            Constraint::Min(6),    // Listings
            Constraint::Length(1), // Pagination
            Constraint::Length(1), // Key hints
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0], &colors);
    render_search(frame, app, chunks[1], &colors);

    match &app.load {
        LoadState::Loading => render_loading(frame, app, chunks[2], "Loading data..."),
        LoadState::Failed(message) => render_load_error(frame, message, chunks[2], &colors),
        LoadState::Ready => {
            render_listings(frame, app, chunks[2], &colors);
            render_pagination(frame, app, chunks[3], &colors);
        }
    }

    render_footer(frame, app, chunks[4], &colors);

    if app.mode == InputMode::SortMenu {
        render_sort_menu(frame, app, &colors);
    }

    if let Some(ref item) = app.selected {
        render_chart_modal(frame, app, item, &colors);
    }

    if app.show_help {
        render_help_overlay(frame, &colors);
    }

    if let Some(ref notice) = app.notice {
        render_notice(frame, notice, &colors);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let status = match app.load {
        LoadState::Ready => format!(
            "- {} listings, {} tracked  Loaded: {}",
            app.items.len(),
            app.items.iter().filter(|i| i.is_tracked).count(),
            app.time_since_load()
        ),
        LoadState::Loading => "- loading".to_string(),
        LoadState::Failed(_) => "- offline".to_string(),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "RAM PRICE TRACKER ",
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(status),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

fn render_search(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let editing = app.mode == InputMode::Search;
    let text = if app.list.filter.is_empty() && !editing {
        Span::styled("Filter by name...", Style::default().fg(colors.dim))
    } else {
        Span::raw(app.list.filter.clone())
    };

    let mut spans = vec![Span::styled("Search ", Style::default().fg(colors.accent)), text];
    if editing {
        spans.push(Span::styled("█", Style::default().fg(colors.accent)));
    }

    let sort = &app.list.sort;
    let title = format!(
        " Sort by: {} {} ",
        sort.key.label(),
        sort.direction.arrow()
    );

    let border = if editing { colors.accent } else { colors.border };
    let search = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );

    frame.render_widget(search, area);
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect, label: &str) {
    let spinner = SPINNER[app.tick % SPINNER.len()];
    let loading = Paragraph::new(vec![
        Line::from(""),
        Line::from(spinner).centered(),
        Line::from(label).centered(),
    ]);
    frame.render_widget(loading, area);
}

fn render_load_error(frame: &mut Frame, message: &str, area: Rect, colors: &UiColors) {
    let error = Paragraph::new(vec![
        Line::from(Span::styled(
            "Error",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .centered(),
        Line::from(message.to_string()).centered(),
        Line::from(""),
        Line::from("Press R to retry").centered(),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.error)),
    )
    .style(Style::default().fg(colors.error))
    .wrap(Wrap { trim: true });

    frame.render_widget(error, area);
}

/// Render the current page of listings as two-line cards.
fn render_listings(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let page = app.page_items();

    if page.is_empty() {
        let message = if app.items.is_empty() {
            "No listings available"
        } else {
            "No listings match the filter"
        };
        let empty = Paragraph::new(Line::from(message).centered())
            .style(Style::default().fg(colors.dim));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(
        ["LISTING", "PRICE", "STATUS", "UPDATED", ""]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::White))),
    )
    .style(Style::default().bg(colors.header_bg))
    .height(1);

    let name_width = area.width.saturating_sub(52) as usize;
    let rows = page
        .iter()
        .map(|item| listing_row(item, &app.currency, name_width.max(12), colors));

    let widths = [
        Constraint::Min(12),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().bg(colors.selected_bg).add_modifier(Modifier::BOLD));

    let mut state = TableState::default();
    state.select(Some(app.list.cursor.min(page.len() - 1)));

    frame.render_stateful_widget(table, area, &mut state);
}

fn listing_row<'a>(item: &RamListing, currency: &str, name_width: usize, colors: &UiColors) -> Row<'a> {
    let name = Text::from(vec![
        Line::from(truncate_string(&item.display_name(), name_width)),
        Line::from(Span::styled(
            truncate_string(&item.spec_line(), name_width),
            Style::default().fg(colors.dim),
        )),
    ]);

    let price_style = if item.latest_price.is_some() {
        Style::default()
    } else {
        Style::default().fg(colors.dim)
    };

    let control = TrackControl::for_item(item);
    let track_style = match control {
        TrackControl::Enabled => Style::default().fg(colors.accent),
        TrackControl::Disabled => Style::default().fg(colors.dim),
    };

    Row::new(vec![
        Cell::from(name),
        Cell::from(format_price(item.latest_price, currency)).style(price_style),
        Cell::from(item.latest_status.clone().unwrap_or_else(|| "-".to_string())),
        Cell::from(item.scraped_at_local().unwrap_or_else(|| "-".to_string()))
            .style(Style::default().fg(colors.dim)),
        Cell::from(format!("[{}]", control.label())).style(track_style),
    ])
    .height(2)
}

/// One slot of the pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Break,
}

/// Page links to show: both ends plus a window around `current`, with
/// breaks where pages are skipped. Pages are zero-based.
pub fn page_links(current: usize, count: usize) -> Vec<PageLink> {
    if count <= PAGE_RANGE + 2 * PAGE_MARGIN {
        return (0..count).map(PageLink::Page).collect();
    }

    let half = PAGE_RANGE / 2;
    let mut window_start = current.saturating_sub(half);
    let mut window_end = window_start + PAGE_RANGE;
    if window_end > count {
        window_end = count;
        window_start = count - PAGE_RANGE;
    }

    let mut links = Vec::new();
    let mut last: Option<usize> = None;
    for page in 0..count {
        let in_margin = page < PAGE_MARGIN || page >= count - PAGE_MARGIN;
        let in_window = page >= window_start && page < window_end;
        if !(in_margin || in_window) {
            continue;
        }
        if let Some(prev) = last {
            if page > prev + 1 {
                links.push(PageLink::Break);
            }
        }
        links.push(PageLink::Page(page));
        last = Some(page);
    }
    links
}

fn render_pagination(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let total = app.match_count();
    if !app.list.is_paginated() {
        let line = Line::from(Span::styled(
            format!("{} listings", total),
            Style::default().fg(colors.dim),
        ))
        .centered();
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let count = app.list.page_count_for(total);
    let current = app.list.effective_page(total);

    let mut spans = vec![Span::styled("◀ Previous ", Style::default().fg(colors.accent))];
    for link in page_links(current, count) {
        match link {
            PageLink::Page(p) if p == current => spans.push(Span::styled(
                format!(" {} ", p + 1),
                Style::default()
                    .fg(Color::Black)
                    .bg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            PageLink::Page(p) => spans.push(Span::raw(format!(" {} ", p + 1))),
            PageLink::Break => spans.push(Span::styled(" ... ", Style::default().fg(colors.dim))),
        }
    }
    spans.push(Span::styled(" Next ▶", Style::default().fg(colors.accent)));
    spans.push(Span::styled(
        format!("   {} matches", total),
        Style::default().fg(colors.dim),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans).centered()), area);
}

/// Render the footer with keybindings for the current mode.
fn render_footer(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let keys: &[(&str, &str)] = if app.selected.is_some() {
        &[("Esc/q", "close")]
    } else {
        match app.mode {
            InputMode::Search => &[("Enter", "done"), ("Esc", "clear"), ("type", "filter")],
            InputMode::SortMenu => &[("1-8", "sort key"), ("Esc", "cancel")],
            InputMode::Browse => &[
                (" q", "quit"),
                ("/", "search"),
                ("s", "sort"),
                ("Enter", "chart"),
                ("t", "track"),
                ("←/→", "page"),
                ("R", "reload"),
                ("?", "help"),
            ],
        }
    };

    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(":{} ", action)));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg));
    frame.render_widget(footer, area);
}

fn render_sort_menu(frame: &mut Frame, app: &App, colors: &UiColors) {
    let area = centered_rect(30, 50, frame.area());

    let lines: Vec<Line> = SortKey::ALL
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let active = *key == app.list.sort.key;
            let marker = if active {
                format!(" {}", app.list.sort.direction.arrow())
            } else {
                String::new()
            };
            let style = if active {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!(" {}  {}{}", i + 1, key.label(), marker), style))
        })
        .collect();

    let menu = Paragraph::new(lines).block(
        Block::default()
            .title(" Sort by ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.accent)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(menu, area);
}

/// Render the price-history modal for the selected listing.
fn render_chart_modal(frame: &mut Frame, app: &App, item: &RamListing, colors: &UiColors) {
    let area = centered_rect(85, 75, frame.area());

    let block = Block::default()
        .title(format!(" {} ", item.name_raw))
        .title_bottom(Line::from(" Esc: close ").right_aligned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.accent));
    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    match app.chart_state() {
        ChartState::Idle | ChartState::Loading => render_loading(frame, app, inner, "Loading chart..."),
        ChartState::Failed(message) => {
            let error = Paragraph::new(message.as_str())
                .style(Style::default().fg(colors.error))
                .wrap(Wrap { trim: true });
            frame.render_widget(error, inner);
        }
        ChartState::Loaded(model) if model.is_empty() => {
            let empty = Paragraph::new(Line::from("No price history").centered())
                .style(Style::default().fg(colors.dim));
            frame.render_widget(empty, inner);
        }
        ChartState::Loaded(model) => render_price_chart(frame, model, inner, colors),
    }
}

fn render_price_chart(frame: &mut Frame, model: &ChartModel, area: Rect, colors: &UiColors) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(5)])
        .split(area);

    let (lo, hi) = model.bounds().unwrap_or((0.0, 0.0));
    let summary = Line::from(vec![
        Span::raw(" Latest: "),
        Span::styled(
            model
                .latest()
                .map(|p| format_tick(&model.currency, p))
                .unwrap_or_else(|| "N/A".to_string()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  Low: {}", format_tick(&model.currency, lo)),
            Style::default().fg(colors.success),
        ),
        Span::styled(
            format!("  High: {}", format_tick(&model.currency, hi)),
            Style::default().fg(colors.error),
        ),
        Span::styled(
            format!("  {} points", model.labels.len()),
            Style::default().fg(colors.dim),
        ),
    ]);
    frame.render_widget(Paragraph::new(summary), chunks[0]);

    let points: Vec<Vec<(f64, f64)>> = model.series.iter().map(|s| s.points()).collect();
    let datasets: Vec<Dataset> = model
        .series
        .iter()
        .zip(&points)
        .map(|(series, data)| {
            Dataset::default()
                .name(series.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(colors.accent))
                .data(data)
        })
        .collect();

    let (y_lo, y_hi) = model.padded_bounds();
    let x_max = model.labels.len().saturating_sub(1).max(1) as f64;
    let x_ticks = (chunks[1].width / 20).clamp(2, 6) as usize;
    let y_ticks = (chunks[1].height / 4).clamp(2, 6) as usize;

    let chart = Chart::new(datasets)
        .block(Block::default().title(Line::from(model.title.clone()).centered()))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(model.x_ticks(x_ticks)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y_lo, y_hi])
                .labels(model.y_ticks(y_lo, y_hi, y_ticks)),
        );

    frame.render_widget(chart, chunks[1]);
}

/// Render help overlay.
fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 70, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "RAMTOP HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  ↑/k       Move up"),
        Line::from("  ↓/j       Move down"),
        Line::from("  g/Home    First row"),
        Line::from("  G/End     Last row"),
        Line::from("  ←/→ n/p   Previous/next page"),
        Line::from("  [ / ]     First/last page"),
        Line::from(""),
        Line::from("Listings:"),
        Line::from("  /         Search by name"),
        Line::from("  s         Sort menu"),
        Line::from("  o         Next sort field"),
        Line::from("  1-8       Sort by field (again to reverse)"),
        Line::from("  Enter     Price history chart"),
        Line::from("  t         Track listing"),
        Line::from("  R         Reload listings"),
        Line::from(""),
        Line::from("  Esc       Close chart / quit"),
        Line::from("  h/?       Toggle help"),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

/// Render a notice in the bottom-right corner.
fn render_notice(frame: &mut Frame, notice: &Notice, colors: &UiColors) {
    let area = frame.area();
    let width = (notice.message.chars().count() as u16 + 4).min(area.width);
    let height = 3u16.min(area.height);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y + area.height.saturating_sub(height + 2),
        width,
        height,
    };

    let style = match notice.level {
        NoticeLevel::Success => Style::default().fg(colors.success),
        NoticeLevel::Error => Style::default().fg(colors.error),
    };

    let toast = Paragraph::new(notice.message.as_str())
        .style(style)
        .block(Block::default().borders(Borders::ALL).border_style(style));

    frame.render_widget(Clear, rect);
    frame.render_widget(toast, rect);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::config::Config;
    use crate::models::ChartSeries;
    use crate::models::tests::listing;
    use clap::Parser;
    use ratatui::{Terminal, backend::TestBackend};

    fn test_app() -> App {
        let args = Args::parse_from(["ramtop"]);
        App::new(&args, &Config::default()).unwrap()
    }

    /// Draw one frame and return the screen as text, one line per row.
    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut screen = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                screen.push_str(buffer[(x, y)].symbol());
            }
            screen.push('\n');
        }
        screen
    }

    #[test]
    fn test_render_track_control_and_missing_price() {
        let mut app = test_app();
        let mut tracked = listing(1, "Tracked Kit", Some(2990.0));
        tracked.is_tracked = true;
        app.items = vec![tracked, listing(2, "Unpriced Kit", None)];
        app.load = LoadState::Ready;

        let screen = draw(&app, 120, 30);
        let tracked_row = screen.lines().find(|l| l.contains("Tracked Kit")).unwrap();
        assert!(tracked_row.contains("2,990 NT$"));
        assert!(tracked_row.contains("[Tracked]"));

        let unpriced_row = screen.lines().find(|l| l.contains("Unpriced Kit")).unwrap();
        assert!(unpriced_row.contains("N/A"));
        assert!(unpriced_row.contains("[Track]"));
    }

    #[test]
    fn test_render_failed_load_hides_list() {
        let mut app = test_app();
        app.items = vec![listing(1, "Stale Kit", Some(100.0))];
        app.load = LoadState::Failed("Failed to fetch RAM options".to_string());

        let screen = draw(&app, 120, 30);
        assert!(screen.contains("Failed to fetch RAM options"));
        assert!(screen.contains("Press R to retry"));
        assert!(!screen.contains("Stale Kit"));
        assert!(!screen.contains("LISTING"));
    }

    #[test]
    fn test_render_loading_spinner() {
        let app = test_app();
        assert_eq!(app.load, LoadState::Loading);

        let screen = draw(&app, 80, 24);
        assert!(screen.contains(SPINNER[0]));
        assert!(screen.contains("Loading data..."));
        assert!(!screen.contains("LISTING"));
    }

    #[test]
    fn test_render_chart_ticks_carry_currency() {
        let mut app = test_app();
        app.load = LoadState::Ready;
        let item = listing(1, "Chart Kit", Some(110.0));
        let series = ChartSeries {
            dates: vec!["2024-01-01".to_string(), "2024-02-01".to_string()],
            prices: vec![100.0, 110.0],
        };
        app.chart.state = ChartState::Loaded(ChartModel::from_series(&item.name_raw, series, "NT$"));
        app.selected = Some(item);

        let screen = draw(&app, 120, 40);
        assert!(screen.contains("Price History (NT$)"));
        assert!(screen.contains("High: NT$ 110"));
        // Latest, Low and High in the summary; the rest are y-axis ticks
        assert!(screen.matches("NT$ ").count() >= 5);
        assert!(screen.contains("2024-01-01"));
    }

    #[test]
    fn test_render_chart_failure_and_empty() {
        let mut app = test_app();
        app.load = LoadState::Ready;
        app.selected = Some(listing(1, "Chart Kit", None));

        app.chart.state = ChartState::Failed("Failed to fetch chart data".to_string());
        assert!(draw(&app, 100, 30).contains("Failed to fetch chart data"));

        app.chart.state = ChartState::Loaded(ChartModel::from_series(
            "Chart Kit",
            ChartSeries::default(),
            "NT$",
        ));
        assert!(draw(&app, 100, 30).contains("No price history"));
    }

    fn pages(links: &[PageLink]) -> String {
        links
            .iter()
            .map(|l| match l {
                PageLink::Page(p) => (p + 1).to_string(),
                PageLink::Break => "..".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_page_links_few_pages() {
        assert_eq!(pages(&page_links(0, 0)), "");
        assert_eq!(pages(&page_links(0, 3)), "1 2 3");
        assert_eq!(pages(&page_links(4, 9)), "1 2 3 4 5 6 7 8 9");
    }

    #[test]
    fn test_page_links_window_in_middle() {
        assert_eq!(pages(&page_links(9, 20)), "1 2 .. 8 9 10 11 12 .. 19 20");
    }

    #[test]
    fn test_page_links_window_at_edges() {
        assert_eq!(pages(&page_links(0, 20)), "1 2 3 4 5 .. 19 20");
        assert_eq!(pages(&page_links(19, 20)), "1 2 .. 16 17 18 19 20");
    }

    #[test]
    fn test_centered_rect_inside_parent() {
        let parent = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(50, 50, parent);
        assert!(inner.x >= parent.x && inner.right() <= parent.right());
        assert!(inner.y >= parent.y && inner.bottom() <= parent.bottom());
    }
}
