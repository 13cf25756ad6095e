//! UI module for rendering the TUI

mod components;
mod confirm;
mod credential;
mod layout;
mod modes;
mod result;
mod table_view;

use crate::app::App;
use crate::engine::WorkflowStep;
use components::{render_error_dialog, render_filter_dialog};
use ratatui::Frame;

pub use layout::table_body_height;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let (header_area, main_area) = layout::create_layout(area);

    layout::draw_header(frame, header_area, app);

    // Draw main content based on current step
    match app.engine.step() {
        WorkflowStep::AwaitingCredential => credential::draw(frame, main_area, app),
        WorkflowStep::ModeSelection => modes::draw(frame, main_area, app),
        WorkflowStep::CaseList(_) => table_view::draw_cases(frame, main_area, app),
        WorkflowStep::AssigneeSelection => table_view::draw_assignees(frame, main_area, app),
        WorkflowStep::Confirming => confirm::draw(frame, main_area, app),
        WorkflowStep::Result => result::draw(frame, main_area, app),
    }

    // Draw status bar
    layout::draw_status_bar(frame, app);

    if let Some(editor) = &app.state.filter_editor {
        render_filter_dialog(frame, editor);
    }

    if let Some(message) = app.state.current_error() {
        render_error_dialog(frame, message);
    }
}
