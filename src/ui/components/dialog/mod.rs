//! Dialog components for TUI

mod base;
mod error_dialog;
mod filter_dialog;

pub use base::wrap_text;
pub use error_dialog::render_error_dialog;
pub use filter_dialog::render_filter_dialog;
