//! Layout components (header, status bar)

use crate::app::App;
use crate::engine::WorkflowStep;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Rows around a table body: header line, info line, borders, column header
/// and status bar
const TABLE_CHROME: u16 = 6;

/// Height available for table rows on a terminal of `height` lines
pub fn table_body_height(height: u16) -> usize {
    height.saturating_sub(TABLE_CHROME).max(1) as usize
}

/// Create the main layout: header line on top, status bar at the bottom
pub fn create_layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    (chunks[0], chunks[1])
}

/// Progress through the wizard, current step highlighted
const STEPS: &[&str] = &["Sign in", "Task", "Cases", "Operator", "Confirm", "Result"];

fn step_index(step: WorkflowStep) -> usize {
    match step {
        WorkflowStep::AwaitingCredential => 0,
        WorkflowStep::ModeSelection => 1,
        WorkflowStep::CaseList(_) => 2,
        WorkflowStep::AssigneeSelection => 3,
        WorkflowStep::Confirming => 4,
        WorkflowStep::Result => 5,
    }
}

/// Draw the step breadcrumb
pub fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let current = step_index(app.engine.step());
    let mut spans = vec![Span::styled(
        " case-dispatch ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    for (idx, label) in STEPS.iter().enumerate() {
        spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
        let style = if idx == current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if idx < current {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*label, style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the status bar
pub fn draw_status_bar(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let status_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    let mut spans = vec![];

    // Credential status
    let auth_status = if app.engine.session().has_credential() {
        Span::styled(" ● ", Style::default().fg(Color::Green))
    } else {
        Span::styled(" ○ ", Style::default().fg(Color::Red))
    };
    spans.push(auth_status);

    let hints = if app.state.filter_editor.is_some() {
        "Enter:apply  Esc:cancel".to_string()
    } else {
        get_step_hints(app.engine.step())
    };
    spans.push(Span::styled(hints, Style::default().fg(Color::Gray)));

    if let Some(msg) = &app.copy_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(Color::Green)));
    }

    let quit_hint = " ^C:quit ";
    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, status_area);

    let quit_area = Rect {
        x: area.width.saturating_sub(quit_hint.len() as u16),
        y: area.height.saturating_sub(1),
        width: quit_hint.len() as u16,
        height: 1,
    };
    let quit_widget =
        Paragraph::new(quit_hint).style(Style::default().bg(Color::DarkGray).fg(Color::Gray));
    frame.render_widget(quit_widget, quit_area);
}

/// Get keyboard hints for the current step
fn get_step_hints(step: WorkflowStep) -> String {
    match step {
        WorkflowStep::AwaitingCredential => "Enter:save  Tab:skip  Esc:back".to_string(),
        WorkflowStep::ModeSelection => "j/k:nav  Enter/1/2:open  c:credential  q:quit".to_string(),
        WorkflowStep::CaseList(_) => {
            "j/k:nav  Space:select  a:all  x:none  h/l:column  s:sort  /:filter  c:clear  Enter:next  e:export  y:copy  r:reload  Esc:back"
                .to_string()
        }
        WorkflowStep::AssigneeSelection => {
            "j/k:nav  h/l:column  s:sort  /:filter  Enter:choose  r:reload  Esc:back".to_string()
        }
        WorkflowStep::Confirming => "Enter:assign  a:sign in again  Esc:back".to_string(),
        WorkflowStep::Result => "Enter:done  y:copy failures".to_string(),
    }
}
