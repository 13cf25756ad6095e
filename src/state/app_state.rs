//! Front-end state that lives beside the workflow engine

use std::collections::VecDeque;

use super::forms::FormField;
use crate::engine::{FieldKind, FieldSpec, FilterState, ListMode, RANGE_END_SUFFIX, RANGE_START_SUFFIX};

/// Separator between the bounds of a date range typed into the filter editor
pub const RANGE_SEPARATOR: &str = "..";

/// Open filter input for one column
#[derive(Debug, Clone)]
pub struct FilterEditor {
    pub field: FieldSpec,
    pub input: FormField,
}

impl FilterEditor {
    /// Open the editor pre-filled with the column's current filter
    pub fn open(field: &FieldSpec, filter: &FilterState) -> Self {
        let get = |key: &str| filter.get(key).map(String::as_str).unwrap_or("");
        let start = get(&format!("{}{RANGE_START_SUFFIX}", field.name));
        let end = get(&format!("{}{RANGE_END_SUFFIX}", field.name));

        let value = if field.kind == FieldKind::Date && !(start.is_empty() && end.is_empty()) {
            format!("{start}{RANGE_SEPARATOR}{end}")
        } else {
            get(&field.name).to_string()
        };

        Self {
            field: field.clone(),
            input: FormField::text_with_value(&field.name, &field.label, value),
        }
    }

    /// Filter entries to write, an empty value clearing its entry.
    ///
    /// Date columns accept `start..end` as an inclusive range; anything
    /// else is a substring match.
    pub fn entries(&self) -> Vec<(String, String)> {
        let name = &self.field.name;
        let text = self.input.as_text().trim();
        let start_key = format!("{name}{RANGE_START_SUFFIX}");
        let end_key = format!("{name}{RANGE_END_SUFFIX}");

        if self.field.kind != FieldKind::Date {
            return vec![(name.clone(), text.to_string())];
        }
        match text.split_once(RANGE_SEPARATOR) {
            Some((start, end)) => vec![
                (name.clone(), String::new()),
                (start_key, start.trim().to_string()),
                (end_key, end.trim().to_string()),
            ],
            None => vec![
                (name.clone(), text.to_string()),
                (start_key, String::new()),
                (end_key, String::new()),
            ],
        }
    }
}

/// Main application state
pub struct AppState {
    /// Errors waiting to be shown, oldest first
    pub error_queue: VecDeque<String>,
    pub credential_input: FormField,
    /// Highlighted entry on the mode menu
    pub mode_index: usize,
    /// Column targeted by sort and filter keys
    pub column_index: usize,
    pub filter_editor: Option<FilterEditor>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            error_queue: VecDeque::new(),
            credential_input: FormField::secret("credential", "Access token"),
            mode_index: 0,
            column_index: 0,
            filter_editor: None,
        }
    }
}

impl AppState {
    pub fn push_error(&mut self, message: String) {
        tracing::warn!("{message}");
        self.error_queue.push_back(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.error_queue.is_empty()
    }

    pub fn current_error(&self) -> Option<&str> {
        self.error_queue.front().map(String::as_str)
    }

    pub fn dismiss_error(&mut self) {
        self.error_queue.pop_front();
    }

    pub fn selected_mode(&self) -> ListMode {
        ListMode::ALL[self.mode_index.min(ListMode::ALL.len() - 1)]
    }

    pub fn move_mode_down(&mut self) {
        if self.mode_index + 1 < ListMode::ALL.len() {
            self.mode_index += 1;
        }
    }

    pub fn move_mode_up(&mut self) {
        self.mode_index = self.mode_index.saturating_sub(1);
    }

    pub fn next_column(&mut self, count: usize) {
        if count > 0 {
            self.column_index = (self.column_index + 1) % count;
        }
    }

    pub fn prev_column(&mut self, count: usize) {
        if count > 0 {
            self.column_index = (self.column_index + count - 1) % count;
        }
    }
}
