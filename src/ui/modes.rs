//! Task menu

use super::components::{centered_panel, titled_block};
use crate::app::App;
use crate::engine::ListMode;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let panel = centered_panel(area, 56, ListMode::ALL.len() as u16 * 3 + 2);
    let selected = app.state.selected_mode();

    let items: Vec<ListItem> = ListMode::ALL
        .iter()
        .enumerate()
        .map(|(idx, mode)| {
            let is_selected = *mode == selected;
            let prefix = if is_selected { "▸ " } else { "  " };
            let title_style = if is_selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(prefix),
                    Span::styled(format!("{}. ", idx + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(mode.label(), title_style),
                ]),
                Line::from(Span::styled(
                    format!("     {}", mode.description()),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(""),
            ])
        })
        .collect();

    frame.render_widget(List::new(items).block(titled_block("Choose a task", Color::Cyan)), panel);
}
