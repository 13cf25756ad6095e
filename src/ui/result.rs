//! Assignment result

use super::components::titled_block;
use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let Some(result) = app.engine.result() else {
        return;
    };
    let outcome = &result.outcome;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let (headline, color) = if outcome.failure_count() == 0 {
        ("All cases assigned", Color::Green)
    } else if outcome.is_partial() {
        ("Some cases could not be assigned", Color::Yellow)
    } else {
        ("No case was assigned", Color::Red)
    };

    let summary = Paragraph::new(vec![
        Line::from(Span::styled(
            headline,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                format!("{} succeeded", outcome.success_count()),
                Style::default().fg(Color::Green),
            ),
            Span::raw(", "),
            Span::styled(
                format!("{} failed", outcome.failure_count()),
                Style::default().fg(Color::Red),
            ),
            Span::raw(format!(
                " of {} sent to {}",
                result.requested, result.assignee_label
            )),
        ]),
    ])
    .block(titled_block(app.engine.step().title(), color));
    frame.render_widget(summary, chunks[0]);

    let items: Vec<ListItem> = if outcome.failures.is_empty() {
        outcome
            .successful_keys
            .iter()
            .map(|key| {
                ListItem::new(Line::from(vec![
                    Span::styled("✓ ", Style::default().fg(Color::Green)),
                    Span::raw(key.to_string()),
                ]))
            })
            .collect()
    } else {
        outcome
            .failures
            .iter()
            .map(|failure| {
                ListItem::new(Line::from(vec![
                    Span::styled("✗ ", Style::default().fg(Color::Red)),
                    Span::styled(failure.key.to_string(), Style::default().fg(Color::White)),
                    Span::styled(
                        format!("  {}", failure.reason),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };

    let list_title = if outcome.failures.is_empty() {
        "Assigned"
    } else {
        "Failures"
    };
    frame.render_widget(
        List::new(items).block(titled_block(list_title, Color::DarkGray)),
        chunks[1],
    );
}
