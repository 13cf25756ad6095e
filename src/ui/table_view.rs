//! Case and operator tables
//!
//! Only the rows of the current render window are turned into widgets.

use super::components::{centered_panel, titled_block};
use crate::app::App;
use crate::engine::{
    FieldKind, FilterState, ListStep, LoadStatus, SelectionTable, RANGE_END_SUFFIX,
    RANGE_START_SUFFIX,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Gauge, Paragraph, Row as TableRow, Table, Wrap},
    Frame,
};

/// Draw the case list for the current mode
pub fn draw_cases(frame: &mut Frame, area: Rect, app: &App) {
    match app.engine.case_list() {
        Some(cases) => draw_list(frame, area, app, &cases.list, true),
        None => draw_empty(frame, area, app.engine.step().title()),
    }
}

/// Draw the operator directory
pub fn draw_assignees(frame: &mut Frame, area: Rect, app: &App) {
    match app.engine.assignee_list() {
        Some(list) => draw_list(frame, area, app, list, false),
        None => draw_empty(frame, area, app.engine.step().title()),
    }
}

fn draw_empty(frame: &mut Frame, area: Rect, title: &str) {
    let content = Paragraph::new("Nothing loaded. Press r to load.")
        .style(Style::default().fg(Color::DarkGray))
        .block(titled_block(title, Color::DarkGray));
    frame.render_widget(content, area);
}

fn draw_list(frame: &mut Frame, area: Rect, app: &App, list: &ListStep, selectable: bool) {
    let title = app.engine.step().title();

    let table = match (&list.status, &list.table) {
        (LoadStatus::Loading { loaded, total }, _) => {
            draw_progress(frame, area, title, *loaded, *total);
            return;
        }
        (LoadStatus::Failed(err), _) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    "Loading failed",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(err.to_string()),
                Line::from(""),
                Line::from(Span::styled(
                    "Press r to retry or Esc to go back.",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            if err.is_unauthorized() {
                lines.push(Line::from(Span::styled(
                    "The token was rejected: go back and press c to enter a new one.",
                    Style::default().fg(Color::Yellow),
                )));
            }
            let content = Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(titled_block(title, Color::Red));
            frame.render_widget(content, area);
            return;
        }
        (_, Some(table)) => table,
        (_, None) => {
            draw_empty(frame, area, title);
            return;
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    draw_info_line(frame, chunks[0], table, &list.status, selectable);
    draw_table(frame, chunks[1], app, table, title, selectable);
}

fn draw_progress(frame: &mut Frame, area: Rect, title: &str, loaded: usize, total: u64) {
    let panel = centered_panel(area, 60, 5);
    let (ratio, label) = if total > 0 {
        let ratio = (loaded as f64 / total as f64).clamp(0.0, 1.0);
        (ratio, format!("{loaded} / {total}"))
    } else {
        (0.0, "Fetching first page…".to_string())
    };
    let gauge = Gauge::default()
        .block(titled_block(
            &format!("Loading {} (x stops)", title.to_lowercase()),
            Color::Cyan,
        ))
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, panel);
}

fn draw_info_line(
    frame: &mut Frame,
    area: Rect,
    table: &SelectionTable,
    status: &LoadStatus,
    selectable: bool,
) {
    let mut spans = vec![Span::styled(
        format!(
            " {} of {} rows",
            table.visible_count(),
            table.row_count()
        ),
        Style::default().fg(Color::Cyan),
    )];

    if selectable {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} selected", table.selection_count()),
            Style::default().fg(Color::Green),
        ));
        let hidden = table.hidden_selection_count();
        if hidden > 0 {
            spans.push(Span::styled(
                format!(" ({hidden} hidden by filter)"),
                Style::default().fg(Color::Yellow),
            ));
        }
    }

    if !table.filter().is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} filter(s)", table.filter().len()),
            Style::default().fg(Color::Magenta),
        ));
    }

    if let Some(extra) = table.cursor_row().map(|row| row.extra().len()).filter(|n| *n > 0) {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{extra} undeclared field(s) on this row"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let LoadStatus::Cancelled = status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            "partial: loading was stopped, r reloads",
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn is_filtered(filter: &FilterState, name: &str) -> bool {
    filter.contains_key(name)
        || filter.contains_key(&format!("{name}{RANGE_START_SUFFIX}"))
        || filter.contains_key(&format!("{name}{RANGE_END_SUFFIX}"))
}

/// Header label: sort arrow and filter marker appended
fn header_label(table: &SelectionTable, name: &str, label: &str) -> String {
    let mut text = label.to_string();
    if let Some(sort) = table.sort().filter(|s| s.key == name) {
        text.push(' ');
        text.push_str(sort.direction.symbol());
    }
    if is_filtered(table.filter(), name) {
        text.push('*');
    }
    text
}

fn draw_table(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    table: &SelectionTable,
    title: &str,
    selectable: bool,
) {
    let schema = table.schema();
    let focused_column = app.state.column_index;

    let mut header_cells = Vec::with_capacity(schema.fields.len() + 1);
    if selectable {
        header_cells.push(Cell::from(""));
    }
    for (idx, field) in schema.fields.iter().enumerate() {
        let mut style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        if idx == focused_column {
            style = style.bg(Color::DarkGray).add_modifier(Modifier::UNDERLINED);
        }
        header_cells.push(Cell::from(header_label(table, &field.name, &field.label)).style(style));
    }

    let mut widths = Vec::with_capacity(schema.fields.len() + 1);
    if selectable {
        widths.push(Constraint::Length(3));
    }
    widths.extend(schema.fields.iter().map(|field| match field.kind {
        FieldKind::Number => Constraint::Length(12),
        FieldKind::Date => Constraint::Length(12),
        FieldKind::Text => Constraint::Fill(1),
    }));

    // The window carries overscan rows on both sides; only the rows from the
    // top index down fit on screen.
    let top = table.top_index();
    let page = table.viewport().rows_per_page();
    let rows: Vec<TableRow> = table
        .visible_window_rows()
        .into_iter()
        .filter(|(position, _)| *position >= top && *position < top + page)
        .map(|(position, row)| {
            let mut cells = Vec::with_capacity(schema.fields.len() + 1);
            if selectable {
                let mark = if table.is_selected(row.key()) { "[x]" } else { "[ ]" };
                cells.push(Cell::from(mark));
            }
            cells.extend(schema.fields.iter().map(|field| Cell::from(row.text(&field.name))));

            let style = if position == table.cursor() {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if selectable && table.is_selected(row.key()) {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            TableRow::new(cells).style(style)
        })
        .collect();

    let border_color = if table.visible_count() == 0 {
        Color::DarkGray
    } else {
        Color::Cyan
    };
    let widget = Table::new(rows, widths)
        .header(TableRow::new(header_cells))
        .block(titled_block(title, border_color));
    frame.render_widget(widget, area);

    if table.visible_count() == 0 {
        let message = if table.row_count() == 0 {
            "No rows."
        } else {
            "No rows match the filter. Press c to clear it."
        };
        let inner = Rect {
            x: area.x + 2,
            y: area.y + 2,
            width: area.width.saturating_sub(4),
            height: area.height.saturating_sub(3).min(1),
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(Color::DarkGray)),
            inner,
        );
    }
}
