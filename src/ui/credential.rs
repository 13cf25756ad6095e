//! Credential entry view

use super::components::{centered_panel, titled_block};
use crate::app::App;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let panel = centered_panel(area, 64, 11);
    let input = &app.state.credential_input;

    let value = if input.is_empty() {
        Span::styled("paste your access token", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(input.display_value(), Style::default().fg(Color::Yellow))
    };

    let replacing = if app.engine.session().has_credential() {
        "A token is already stored. Esc keeps it."
    } else {
        "Tab continues without a token; requests will be anonymous."
    };

    let content = vec![
        Line::from(Span::styled(
            "The dispatch service needs an access token.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{}: ", input.label), Style::default().fg(Color::Cyan)),
            value,
            Span::styled("█", Style::default().fg(Color::Gray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "The token is saved locally for the next session.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(replacing, Style::default().fg(Color::DarkGray))),
    ];

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(titled_block("Sign in", Color::Cyan));
    frame.render_widget(paragraph, panel);
}
