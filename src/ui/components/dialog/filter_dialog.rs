//! Column filter editor

use super::base::{key_hint, render_dialog, DialogConfig};
use crate::engine::FieldKind;
use crate::state::{FilterEditor, RANGE_SEPARATOR};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
    Frame,
};

fn input_hint(kind: FieldKind) -> String {
    match kind {
        FieldKind::Date => format!("Text match, or a range like 2024-01-01{RANGE_SEPARATOR}2024-01-31"),
        FieldKind::Number => "Matches the displayed number".to_string(),
        FieldKind::Text => "Case-insensitive substring match".to_string(),
    }
}

/// Render the filter input for the focused column
pub fn render_filter_dialog(frame: &mut Frame, editor: &FilterEditor) {
    let title = format!("Filter: {}", editor.field.label);
    let body = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::styled(
                editor.input.display_value(),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled("█", Style::default().fg(Color::Gray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            input_hint(editor.field.kind),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "An empty value clears the filter",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    render_dialog(
        frame,
        DialogConfig {
            title: &title,
            accent: Color::Cyan,
            body,
            hint: Some(key_hint(&["Enter"], "to apply")),
            max_width: 70,
        },
    );
}
