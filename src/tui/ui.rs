use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};

use crate::output::{format_age, RATE_LIMIT_MESSAGE};
use crate::tui::app::{App, Card, CardState, InputMode};
use crate::tui::theme;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Handle very small terminal sizes gracefully
    if area.height < 8 || area.width < 40 {
        let msg = Paragraph::new("Terminal too small").alignment(Alignment::Center);
        frame.render_widget(msg, area);
        return;
    }

    // Title(1) + Repositories + PR list + Status(1)
    let (table, prs) = if app.prs_expanded {
        (Constraint::Length(6), Constraint::Fill(1))
    } else {
        (Constraint::Fill(1), Constraint::Length(10))
    };
    let chunks = Layout::vertical([Constraint::Length(1), table, prs, Constraint::Length(1)])
    .split(area);

    render_title(frame, chunks[0], app);
    render_table(frame, chunks[1], app);
    render_pr_list(frame, chunks[2], app);
    render_status_bar(frame, chunks[3], app);

    match app.input_mode {
        InputMode::AddInput => render_add_popup(frame, app),
        InputMode::ConfirmRemove => render_remove_popup(frame, app),
        InputMode::Help => render_help_popup(frame),
        InputMode::Normal => {}
    }
}

fn render_title(frame: &mut Frame, area: Rect, app: &App) {
    let left = "Unmerged since release";
    let mut spans = vec![Span::styled(left, Style::default().fg(theme::TITLE_COLOR).bold())];

    if app.is_loading {
        let spinner_chars = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        let right = format!("{} Refreshing...", spinner_chars[app.spinner_frame % 10]);
        let padding_len = (area.width as usize).saturating_sub(left.len() + right.chars().count());
        spans.push(Span::raw(" ".repeat(padding_len)));
        spans.push(Span::styled(right, Style::default().fg(Color::Cyan)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Release column text for a card
fn release_cell(card: &Card) -> (String, Style) {
    match &card.state {
        CardState::Loading => ("Loading release info...".to_string(), Style::default().fg(theme::MUTED)),
        CardState::Ready(snapshot) => (snapshot.release_label(), Style::default()),
        CardState::Failed(e) if e.is_rate_limited() => {
            (RATE_LIMIT_MESSAGE.to_string(), Style::default().fg(theme::FLASH_ERROR))
        }
        CardState::Failed(e) => (format!("Error: {}", e), Style::default().fg(theme::FLASH_ERROR)),
    }
}

/// Count column text for a card
fn count_cell(card: &Card) -> (String, Style) {
    match &card.state {
        CardState::Ready(snapshot) if snapshot.release.is_some() => (
            snapshot.count_label(),
            Style::default().fg(theme::count_color(snapshot.total_eligible_count)).bold(),
        ),
        CardState::Ready(snapshot) => (snapshot.count_label(), Style::default().fg(theme::MUTED)),
        _ => ("-".to_string(), Style::default().fg(theme::MUTED)),
    }
}

fn render_table(frame: &mut Frame, area: Rect, app: &mut App) {
    if app.cards.is_empty() {
        let empty_msg = Paragraph::new("No repositories watched. Press 'a' to add one.")
            .alignment(Alignment::Center)
            .block(Block::default());
        frame.render_widget(empty_msg, area);
        return;
    }

    let now = chrono::Utc::now();
    let rows: Vec<Row> = app
        .cards
        .iter()
        .enumerate()
        .map(|(idx, card)| {
            let (count, count_style) = count_cell(card);
            let (release, release_style) = release_cell(card);
            let fetched = card
                .fetched_at
                .map(|at| format_age(now - at))
                .unwrap_or_default();

            let row_style = if idx % 2 == 1 {
                Style::default().bg(theme::ROW_ALT_BG)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(format!("{}.", idx + 1)).style(Style::default().fg(theme::INDEX_COLOR)),
                Cell::from(card.repo.to_string()),
                Cell::from(count).style(count_style),
                Cell::from(release).style(release_style),
                Cell::from(fetched).style(Style::default().fg(theme::MUTED)),
            ])
            .style(row_style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),  // Index: "99."
        Constraint::Length(32), // owner/name
        Constraint::Length(6),  // Count: "100+"
        Constraint::Fill(1),    // Release line or error
        Constraint::Length(9),  // Fetched age
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["#", "Repository", "PRs", "Release", "Fetched"])
                .style(theme::HEADER_STYLE)
                .bottom_margin(1),
        )
        .row_highlight_style(theme::ROW_SELECTED);

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_pr_list(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(theme::DIVIDER_COLOR))
        .title(" Unmerged Non-Bot Closed PRs ");

    let lines: Vec<Line> = match app.selected_card().and_then(|c| c.snapshot()) {
        Some(snapshot) if !snapshot.eligible_prs.is_empty() => snapshot
            .eligible_prs
            .iter()
            .map(|pr| {
                Line::from(vec![
                    Span::raw(pr.title.clone()),
                    Span::styled(format!(" #{}", pr.number), Style::default().fg(theme::MUTED)),
                    Span::raw("  by "),
                    Span::styled(pr.author_login.clone(), Style::default().fg(Color::Yellow)),
                ])
            })
            .collect(),
        Some(_) => vec![Line::from(Span::styled(
            "None since this release",
            Style::default().fg(theme::MUTED),
        ))],
        None => Vec::new(),
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let text = if let Some((ref msg, _)) = app.flash_message {
        let msg_color = if msg.starts_with("Failed") || msg.starts_with("Error") {
            theme::FLASH_ERROR
        } else if msg.starts_with("Added:") || msg.starts_with("Removed:") || msg.starts_with("Refreshed") {
            theme::FLASH_SUCCESS
        } else {
            Color::White
        };
        Line::from(Span::styled(msg.clone(), Style::default().fg(msg_color)))
    } else {
        let count = format!("{} repos", app.cards.len());

        let elapsed = app.last_refresh.elapsed();
        let refresh_time = if elapsed.as_secs() < 60 {
            format!("refreshed {}s ago", elapsed.as_secs())
        } else {
            format!("refreshed {}m ago", elapsed.as_secs() / 60)
        };

        let hints = [
            ("j/k", ":nav "),
            ("Enter", ":prs "),
            ("o", ":open "),
            ("a", ":add "),
            ("d", ":remove "),
            ("r", ":refresh "),
            ("?", ":help "),
            ("q", ":quit"),
        ];

        let mut spans = vec![
            Span::styled(count, Style::default().fg(theme::MUTED)),
            Span::raw(" "),
            Span::styled(refresh_time, Style::default().fg(theme::MUTED)),
            Span::raw("  "),
        ];
        for (i, (key, label)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(theme::STATUS_KEY_COLOR)));
            spans.push(Span::raw(*label));
        }
        Line::from(spans)
    };

    frame.render_widget(
        Paragraph::new(text).style(Style::default().bg(theme::STATUS_BAR_BG)),
        area,
    );
}

/// Create a centered rectangle with fixed width and height
fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect {
        x,
        y,
        width,
        height,
    }
}

fn render_add_popup(frame: &mut Frame, app: &App) {
    let popup_area = centered_rect_fixed(50, 4, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().title(" Add Repository ");
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let chunks = Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).split(inner);

    frame.render_widget(Paragraph::new(format!("{}|", app.add_input)), chunks[0]);
    frame.render_widget(
        Paragraph::new("owner/repo  Enter: add | Esc: cancel").style(Style::default().fg(theme::MUTED)),
        chunks[1],
    );
}

fn render_remove_popup(frame: &mut Frame, app: &App) {
    let popup_area = centered_rect_fixed(50, 3, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().title(" Remove Repository ");
    frame.render_widget(block.clone(), popup_area);

    let name = app
        .selected_card()
        .map(|c| c.repo.to_string())
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(format!("Stop watching {}? (y/n)", name)),
        block.inner(popup_area),
    );
}

fn render_help_popup(frame: &mut Frame) {
    let popup_area = centered_rect_fixed(50, 14, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().title(" Keyboard Shortcuts ");
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let key_style = Style::default().fg(Color::Cyan).bold();
    let entries = [
        ("j / Down      ", "Move down"),
        ("k / Up        ", "Move up"),
        ("Enter         ", "Expand/collapse PR list"),
        ("o             ", "Open closed PR search in browser"),
        ("a             ", "Add repository"),
        ("d             ", "Remove repository"),
        ("r             ", "Refresh all (bypasses cache)"),
        ("?             ", "Show/hide this help"),
        ("q / Ctrl-c    ", "Quit"),
    ];

    let mut help_lines: Vec<Line> = entries
        .iter()
        .map(|(key, desc)| Line::from(vec![Span::styled(*key, key_style), Span::raw(*desc)]))
        .collect();
    help_lines.push(Line::from(""));
    help_lines.push(Line::from(Span::styled(
        "Press any key to close",
        Style::default().fg(theme::MUTED),
    )));

    frame.render_widget(Paragraph::new(help_lines), inner);
}
