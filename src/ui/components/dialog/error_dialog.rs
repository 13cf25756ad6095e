//! Error dialog component

use super::base::{key_hint, render_dialog, text_width, wrap_text, DialogConfig};
use ratatui::{style::Color, text::Line, Frame};

const MAX_WIDTH: u16 = 60;

/// Render an error dialog overlay centered on the screen
pub fn render_error_dialog(frame: &mut Frame, error_message: &str) {
    let body = wrap_text(error_message, text_width(MAX_WIDTH))
        .into_iter()
        .map(Line::from)
        .collect();

    render_dialog(
        frame,
        DialogConfig {
            title: "Error",
            accent: Color::Red,
            body,
            hint: Some(key_hint(&["Enter", "Esc"], "to dismiss")),
            max_width: MAX_WIDTH,
        },
    );
}
