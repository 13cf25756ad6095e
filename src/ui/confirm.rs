//! Assignment confirmation

use super::components::{centered_panel, titled_block, wrap_text};
use crate::app::App;
use crate::engine::ListMode;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

/// Keys listed before the rest are summarized as a count
const PREVIEW_KEYS: usize = 8;

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let Some(confirmation) = app.engine.confirmation() else {
        return;
    };
    let panel = centered_panel(area, 72, 20);
    let batch = &confirmation.batch;

    let verb = match confirmation.mode {
        ListMode::Unassigned => "Assign",
        ListMode::Reassign => "Reassign",
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw(format!("{verb} ")),
            Span::styled(
                format!("{} case(s)", batch.len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" to "),
            Span::styled(
                confirmation.assignee_label.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" ({})", batch.assignee()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(""),
    ];

    let preview: Vec<&str> = batch
        .keys()
        .iter()
        .take(PREVIEW_KEYS)
        .map(|k| k.as_str())
        .collect();
    let mut preview_text = preview.join(", ");
    if batch.len() > PREVIEW_KEYS {
        preview_text.push_str(&format!(" and {} more", batch.len() - PREVIEW_KEYS));
    }
    for line in wrap_text(&preview_text, panel.width.saturating_sub(4) as usize) {
        lines.push(Line::from(Span::styled(line, Style::default().fg(Color::Gray))));
    }
    lines.push(Line::from(""));

    if confirmation.is_in_flight() {
        lines.push(Line::from(Span::styled(
            "Assigning…",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    } else if let Some(err) = &confirmation.error {
        lines.push(Line::from(Span::styled(
            format!("Assignment failed: {err}"),
            Style::default().fg(Color::Red),
        )));
        let hint = if err.is_retryable() {
            "The server may still have applied it. Enter retries the same batch."
        } else {
            "No case was assigned. Enter retries the same batch."
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
        if err.is_unauthorized() {
            lines.push(Line::from(Span::styled(
                "Press a to sign in again and come back here.",
                Style::default().fg(Color::Yellow),
            )));
        }
    } else {
        lines.push(Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" to assign, "),
            Span::styled("Esc", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" to pick another operator"),
        ]));
    }

    let border_color = if confirmation.error.is_some() {
        Color::Red
    } else {
        Color::Cyan
    };
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(titled_block(app.engine.step().title(), border_color));
    frame.render_widget(paragraph, panel);
}
