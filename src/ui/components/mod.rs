//! Reusable UI components

mod dialog;
mod panel;

pub use dialog::{render_error_dialog, render_filter_dialog, wrap_text};
pub use panel::{centered_panel, titled_block};
