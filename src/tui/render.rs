//! UI rendering functions for the TUI.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
};

use super::state::App;
use super::types::{Focus, PendingConfirm, Screen};
use crate::view::{CandidateView, snapshot};

/// Draw the UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Command bar
            Constraint::Min(0),    // Content (sidebar + main)
            Constraint::Length(3), // Footer
        ])
        .split(size);

    draw_header(frame, app, chunks[0]);
    draw_command_bar(frame, app, chunks[1]);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(chunks[2]);

    draw_sidebar(frame, app, content_chunks[0]);

    match app.screen {
        Screen::Home => draw_output(frame, app, content_chunks[1], "Result"),
        Screen::Candidates => {
            let main = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(content_chunks[1]);
            draw_candidates(frame, app, main[0]);
            draw_output(frame, app, main[1], "Result");
        }
    }

    draw_footer(frame, app, chunks[3]);

    if let Some(confirm) = &app.confirm {
        draw_confirm_popup(frame, confirm);
    }

    if let Some(error) = &app.error_message {
        draw_error_popup(frame, error);
    }

    if app.show_help {
        draw_help_modal(frame, app);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        "dvr-console",
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];

    if app.is_busy() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("[working: {}]", app.in_flight),
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.bulk_running() {
        spans.push(Span::styled("  [bulk]", Style::default().fg(Color::Red)));
    }
    if let Some(progress) = &app.progress {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            progress.as_str(),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_command_bar(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.input_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let text = if app.command_input.is_empty() && !app.input_focused {
        "Press '/' to type a command..."
    } else {
        &app.command_input
    };

    let bar = Paragraph::new(text)
        .style(if app.input_focused {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Command")
                .border_style(border_style),
        );

    frame.render_widget(bar, area);

    if app.input_focused {
        frame.set_cursor_position((cursor_x(area, &app.command_input), area.y.saturating_add(1)));
    }
}

/// Column of the input cursor, kept inside the bar's borders.
fn cursor_x(area: Rect, input: &str) -> u16 {
    let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    area.x
        .saturating_add(typed.min(area.width.saturating_sub(2)))
        .saturating_add(1)
}

fn draw_sidebar(frame: &mut Frame, app: &mut App, area: Rect) {
    let border_style = if app.focus == Focus::Sidebar && !app.input_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Recent")
        .border_style(border_style);

    if app.recent_commands.is_empty() {
        let empty = Paragraph::new("No commands yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .recent_commands
        .iter()
        .map(|c| ListItem::new(truncate(c, 24)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.recent_list_state);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

fn mark(selected: bool) -> &'static str {
    if selected { "[x]" } else { "[ ]" }
}

fn draw_candidates(frame: &mut Frame, app: &mut App, area: Rect) {
    let view = snapshot(&app.store, Utc::now());
    let selected = app.store.selected_count();
    let highlight = Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let (title, header, widths, rows): (String, Row, Vec<Constraint>, Vec<Row>) = match &view {
        CandidateView::Empty => {
            let empty = Paragraph::new("Nothing to choose from")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title("Candidates"));
            frame.render_widget(empty, area);
            return;
        }
        CandidateView::Episodes(rows) => (
            format!("Episodes ({} of {} selected)", selected, rows.len()),
            Row::new(vec!["", "#", "Title", "Quality", "Size", "Seeders"]),
            vec![
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Length(8),
            ],
            rows.iter()
                .map(|r| {
                    Row::new(vec![
                        Cell::from(mark(r.selected)),
                        Cell::from((r.index + 1).to_string()),
                        Cell::from(r.title.clone()),
                        Cell::from(r.quality.clone()),
                        Cell::from(r.size.clone()),
                        Cell::from(r.seeders.clone()),
                    ])
                })
                .collect(),
        ),
        CandidateView::Torrents(rows) => (
            format!("Torrents ({} of {} selected)", selected, rows.len()),
            Row::new(vec!["", "Opt", "Title", "S", "L", "Size", "Age", "Uploader", "Hash"]),
            vec![
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(9),
                Constraint::Length(5),
                Constraint::Length(12),
                Constraint::Length(14),
            ],
            rows.iter()
                .map(|r| {
                    Row::new(vec![
                        Cell::from(mark(r.selected)),
                        Cell::from(r.option.to_string()),
                        Cell::from(r.title.clone()),
                        Cell::from(r.seeders.clone()),
                        Cell::from(r.leechers.clone()),
                        Cell::from(r.size.clone()),
                        Cell::from(r.age.clone()),
                        Cell::from(r.uploader.clone()),
                        Cell::from(r.infohash.clone()),
                    ])
                })
                .collect(),
        ),
        CandidateView::Recordings(rows) => (
            format!("Recording options ({})", rows.len()),
            Row::new(vec!["Opt", "Title", "Date", "Time", "Channel", "Duration"]),
            vec![
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(12),
                Constraint::Length(9),
                Constraint::Length(14),
                Constraint::Length(9),
            ],
            rows.iter()
                .map(|r| {
                    Row::new(vec![
                        Cell::from(r.option.to_string()),
                        Cell::from(r.title.clone()),
                        Cell::from(r.date.clone()),
                        Cell::from(r.time.clone()),
                        Cell::from(r.channel.clone()),
                        Cell::from(r.duration.clone()),
                    ])
                })
                .collect(),
        ),
    };

    let border_style = if app.focus == Focus::Main && !app.input_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let table = Table::new(rows, widths)
        .header(header.style(header_style))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border_style),
        )
        .row_highlight_style(highlight)
        .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn draw_output(frame: &mut Frame, app: &App, area: Rect, title: &str) {
    let lines: Vec<Line> = if app.output.is_empty() && app.screen == Screen::Home {
        vec![
            Line::from("Type a command and press Enter, for example:"),
            Line::from(""),
            Line::from("  download season 2 of the expanse"),
            Line::from("  search for big buck bunny"),
            Line::from("  record the news tonight"),
        ]
    } else {
        app.output
            .iter()
            .map(|l| {
                let style = if l.starts_with('✓') {
                    Style::default().fg(Color::Green)
                } else if l.starts_with('✗') || l.starts_with("Error") {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                Line::styled(l.as_str(), style)
            })
            .collect()
    };

    let output = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    frame.render_widget(output, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = if let Some(status) = &app.status_message {
        status.clone()
    } else if app.input_focused {
        "[Enter] send  [Esc] clear  [Tab] leave input".to_string()
    } else {
        match app.screen {
            Screen::Home => [
                "[/] command",
                "[Tab] switch",
                "[w] wake",
                "[s] stop",
                "[c] categorize",
                "[?] help",
                "[q] quit",
            ]
            .join("  "),
            Screen::Candidates => [
                "[↑↓] navigate",
                "[Space] toggle",
                "[a/n] all/none",
                "[Enter] pick",
                "[b] bulk",
                "[r] recurring",
                "[?] help",
                "[q] quit",
            ]
            .join("  "),
        }
    };

    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

fn draw_error_popup(frame: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let popup = Paragraph::new(error)
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Error")
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(popup, area);
}

fn draw_confirm_popup(frame: &mut Frame, confirm: &PendingConfirm) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let message = match confirm {
        PendingConfirm::BulkDownload(episodes) => format!(
            "Download {} episode{}?\n\n[Y/Enter] Yes  [N/Esc] No",
            episodes.len(),
            if episodes.len() == 1 { "" } else { "s" }
        ),
        PendingConfirm::BulkAddTorrents(options) => format!(
            "Start torrent option{} {}?\n\n[Y/Enter] Yes  [N/Esc] No",
            if options.len() == 1 { "" } else { "s" },
            options
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    let popup = Paragraph::new(message)
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Download")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(popup, area);
}

fn draw_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let help_text = Paragraph::new(help_content(app))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_text, area);
}

fn keys(names: &[String]) -> String {
    names.join("/")
}

fn help_content(app: &App) -> String {
    let kb = &app.keybindings;
    format!(
        "\
Global
──────
  {command:<14} type a command
  {focus:<14} switch panel
  {wake:<14} wake-on-LAN
  {stop:<14} stop recording
  {categorize:<14} auto-categorize torrents
  {help:<14} toggle help
  {quit:<14} quit

Candidate lists
───────────────
  {up:<14} up
  {down:<14} down
  {toggle:<14} toggle item
  {all:<14} select all
  {none:<14} deselect all
  {select:<14} download torrent / record slot / toggle episode
  {recurring:<14} record slot every week
  {bulk:<14} bulk download selected
  {back:<14} back

Press {help} to close",
        command = keys(&kb.command),
        focus = keys(&kb.toggle_focus),
        wake = keys(&kb.wake),
        stop = keys(&kb.stop_recording),
        categorize = keys(&kb.categorize),
        help = keys(&kb.help),
        quit = keys(&kb.quit),
        up = keys(&kb.up),
        down = keys(&kb.down),
        toggle = keys(&kb.toggle),
        all = keys(&kb.select_all),
        none = keys(&kb.deselect_all),
        select = keys(&kb.select),
        recurring = keys(&kb.record_recurring),
        bulk = keys(&kb.bulk),
        back = keys(&kb.back),
    )
}

/// Helper function to create a centered rect.
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
