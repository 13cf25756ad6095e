//! Filterable, sortable, windowed selection table over an immutable row set

use std::cell::{Cell, OnceCell};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::query::{sort_indices, CompiledFilter, FilterState, SortState};
use super::row::{Row, RowKey, RowSchema};

/// Fixed row height and container size used to derive the render window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub row_height: usize,
    pub container_height: usize,
    pub overscan: usize,
}

impl Viewport {
    pub fn new(row_height: usize, container_height: usize, overscan: usize) -> Self {
        Self {
            row_height: row_height.max(1),
            container_height,
            overscan,
        }
    }

    /// Rows that fit in the container, rounding partial rows up
    pub fn rows_per_page(&self) -> usize {
        self.container_height.div_ceil(self.row_height).max(1)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 20, 5)
    }
}

/// Half-open range of visible-sequence indices to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportWindow {
    pub first: usize,
    pub end: usize,
}

/// Everything needed to put a table back exactly as the user left it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepSnapshot {
    pub filter: FilterState,
    pub sort: Option<SortState>,
    pub selection: BTreeSet<RowKey>,
    pub scroll_offset: usize,
    pub cursor: usize,
}

pub struct SelectionTable {
    schema: Arc<RowSchema>,
    rows: Vec<Row>,
    filter: FilterState,
    sort: Option<SortState>,
    selection: BTreeSet<RowKey>,
    viewport: Viewport,
    scroll_offset: usize,
    /// Index into the visible sequence
    cursor: usize,
    /// Indices into `rows`, filtered then sorted. Reset by filter/sort changes.
    view: OnceCell<Vec<usize>>,
    /// Selected keys the filter hides. Reset by view and selection changes,
    /// never by scrolling.
    hidden_selected: Cell<Option<usize>>,
}

impl SelectionTable {
    pub fn new(schema: Arc<RowSchema>, rows: Vec<Row>, viewport: Viewport) -> Self {
        Self {
            schema,
            rows,
            filter: FilterState::new(),
            sort: None,
            selection: BTreeSet::new(),
            viewport,
            scroll_offset: 0,
            cursor: 0,
            view: OnceCell::new(),
            hidden_selected: Cell::new(None),
        }
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn view(&self) -> &[usize] {
        self.view.get_or_init(|| {
            let compiled = CompiledFilter::compile(&self.schema, &self.filter);
            let mut indices: Vec<usize> = (0..self.rows.len())
                .filter(|&i| compiled.is_empty() || compiled.matches(&self.rows[i]))
                .collect();
            if let Some(sort) = &self.sort {
                sort_indices(&self.schema, &self.rows, &mut indices, sort);
            }
            indices
        })
    }

    fn invalidate_view(&mut self) {
        self.view = OnceCell::new();
        self.hidden_selected.set(None);
        self.scroll_offset = 0;
        self.cursor = 0;
    }

    // === Filter / sort ===

    pub fn set_filter(&mut self, filter: FilterState) {
        if filter != self.filter {
            self.filter = filter;
            self.invalidate_view();
        }
    }

    /// Set or clear (empty value) a single filter entry
    pub fn set_filter_value(&mut self, field: &str, value: &str) {
        let mut filter = self.filter.clone();
        if value.trim().is_empty() {
            filter.remove(field);
        } else {
            filter.insert(field.to_string(), value.to_string());
        }
        self.set_filter(filter);
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        if sort != self.sort {
            self.sort = sort;
            self.invalidate_view();
        }
    }

    /// Sort by `field`; picking the active column again flips the direction
    pub fn sort_by_column(&mut self, field: &str) {
        let next = match &self.sort {
            Some(current) if current.key == field => SortState {
                key: current.key.clone(),
                direction: current.direction.toggle(),
            },
            _ => SortState::ascending(field),
        };
        self.set_sort(Some(next));
    }

    // === Selection ===

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.selection.contains(key)
    }

    pub fn toggle_selected(&mut self, key: &RowKey) {
        if !self.selection.remove(key) {
            self.selection.insert(key.clone());
        }
        self.hidden_selected.set(None);
    }

    /// Add `key` regardless of whether it is currently visible
    pub fn select_key(&mut self, key: RowKey) {
        if self.selection.insert(key) {
            self.hidden_selected.set(None);
        }
    }

    /// Add every row that currently passes the filter
    pub fn select_all_visible(&mut self) {
        let keys: Vec<RowKey> = self
            .view()
            .iter()
            .map(|&i| self.rows[i].key().clone())
            .collect();
        // Only visible keys are added, so the hidden count stays valid
        self.selection.extend(keys);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.hidden_selected.set(Some(0));
    }

    pub fn toggle_cursor_selected(&mut self) {
        if let Some(key) = self.cursor_row().map(|row| row.key().clone()) {
            self.toggle_selected(&key);
        }
    }

    pub fn selected_keys(&self) -> Vec<RowKey> {
        self.selection.iter().cloned().collect()
    }

    pub fn selection_count(&self) -> usize {
        self.selection.len()
    }

    /// Selected keys that the current filter hides; computed once per view
    /// or selection change so redraws while scrolling stay cheap
    pub fn hidden_selection_count(&self) -> usize {
        if let Some(count) = self.hidden_selected.get() {
            return count;
        }
        let count = if self.selection.is_empty() {
            0
        } else {
            let visible: BTreeSet<&RowKey> = self.visible_rows().map(Row::key).collect();
            self.selection.iter().filter(|k| !visible.contains(k)).count()
        };
        self.hidden_selected.set(Some(count));
        count
    }

    // === Visible sequence and viewport ===

    pub fn visible_count(&self) -> usize {
        self.view().len()
    }

    /// The full filtered and sorted sequence
    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.view().iter().map(|&i| &self.rows[i])
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport::new(
            viewport.row_height,
            viewport.container_height,
            viewport.overscan,
        );
        let clamped = self.scroll_offset.min(self.max_scroll_offset());
        self.scroll_offset = clamped;
        self.ensure_cursor_visible();
    }

    fn max_scroll_offset(&self) -> usize {
        (self.visible_count() * self.viewport.row_height)
            .saturating_sub(self.viewport.container_height)
    }

    /// Index of the first row whose top is inside the container
    pub fn top_index(&self) -> usize {
        self.scroll_offset / self.viewport.row_height
    }

    pub fn window(&self) -> ViewportWindow {
        let count = self.visible_count();
        let top = self.top_index();
        let end = (top + self.viewport.rows_per_page() + self.viewport.overscan).min(count);
        let first = top.saturating_sub(self.viewport.overscan).min(end);
        ViewportWindow { first, end }
    }

    /// Move the scroll position; returns whether the window start moved and
    /// the overscanned window needs rebuilding
    pub fn set_scroll_offset(&mut self, offset: usize) -> bool {
        let before = self.window().first;
        self.scroll_offset = offset.min(self.max_scroll_offset());
        self.window().first != before
    }

    /// `(visible index, row)` pairs inside the render window
    pub fn visible_window_rows(&self) -> Vec<(usize, &Row)> {
        let window = self.window();
        let view = self.view();
        (window.first..window.end)
            .map(|position| (position, &self.rows[view[position]]))
            .collect()
    }

    // === Cursor ===

    pub fn cursor_row(&self) -> Option<&Row> {
        self.view().get(self.cursor).map(|&i| &self.rows[i])
    }

    pub fn move_cursor_down(&mut self) {
        self.move_cursor_to(self.cursor.saturating_add(1));
    }

    pub fn move_cursor_up(&mut self) {
        self.move_cursor_to(self.cursor.saturating_sub(1));
    }

    pub fn page_down(&mut self) {
        self.move_cursor_to(self.cursor + self.viewport.rows_per_page());
    }

    pub fn page_up(&mut self) {
        self.move_cursor_to(self.cursor.saturating_sub(self.viewport.rows_per_page()));
    }

    pub fn move_cursor_first(&mut self) {
        self.move_cursor_to(0);
    }

    pub fn move_cursor_last(&mut self) {
        self.move_cursor_to(usize::MAX);
    }

    fn move_cursor_to(&mut self, index: usize) {
        self.cursor = index.min(self.visible_count().saturating_sub(1));
        self.ensure_cursor_visible();
    }

    fn ensure_cursor_visible(&mut self) {
        let count = self.visible_count();
        if count == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.min(count - 1);

        let rows_per_page = (self.viewport.container_height / self.viewport.row_height).max(1);
        let top = self.top_index();
        if self.cursor < top {
            self.set_scroll_offset(self.cursor * self.viewport.row_height);
        } else if self.cursor >= top + rows_per_page {
            self.set_scroll_offset((self.cursor + 1 - rows_per_page) * self.viewport.row_height);
        }
    }

    // === Snapshot ===

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            selection: self.selection.clone(),
            scroll_offset: self.scroll_offset,
            cursor: self.cursor,
        }
    }

    pub fn restore(&mut self, snapshot: &StepSnapshot) {
        self.set_filter(snapshot.filter.clone());
        self.set_sort(snapshot.sort.clone());
        self.clear_selection();
        for key in &snapshot.selection {
            self.select_key(key.clone());
        }
        self.scroll_offset = snapshot.scroll_offset.min(self.max_scroll_offset());
        self.cursor = snapshot.cursor.min(self.visible_count().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::query::SortDirection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Arc<RowSchema> {
        Arc::new(RowSchema::cases())
    }

    fn case(id: &str, owner: &str, amount: f64) -> Row {
        Row::decode(
            &RowSchema::cases(),
            json!({"caseId": id, "ownerName": owner, "amount": amount}),
        )
        .unwrap()
    }

    fn table(rows: Vec<Row>) -> SelectionTable {
        SelectionTable::new(schema(), rows, Viewport::new(1, 10, 2))
    }

    fn numbered(n: usize) -> SelectionTable {
        table(
            (0..n)
                .map(|i| case(&format!("C{i:03}"), &format!("Owner {i}"), i as f64))
                .collect(),
        )
    }

    fn visible_keys(table: &SelectionTable) -> Vec<String> {
        table.visible_rows().map(|r| r.key().to_string()).collect()
    }

    #[test]
    fn test_chen_scenario() {
        let mut t = table(vec![case("A", "Chen Wei", 1.0), case("B", "Lisa", 2.0)]);
        t.set_filter_value("ownerName", "chen");
        assert_eq!(visible_keys(&t), vec!["A"]);
    }

    #[test]
    fn test_unfiltered_table_shows_every_row_in_order() {
        let t = numbered(5);
        assert_eq!(visible_keys(&t), vec!["C000", "C001", "C002", "C003", "C004"]);
    }

    #[test]
    fn test_clearing_filter_value_restores_rows() {
        let mut t = numbered(5);
        t.set_filter_value("ownerName", "owner 3");
        assert_eq!(t.visible_count(), 1);
        t.set_filter_value("ownerName", "");
        assert_eq!(t.visible_count(), 5);
        assert!(t.filter().is_empty());
    }

    #[test]
    fn test_selection_survives_filter_and_sort() {
        let mut t = numbered(6);
        t.toggle_selected(&RowKey::new("C001"));
        t.toggle_selected(&RowKey::new("C004"));
        let before = t.selected_keys();

        t.set_filter_value("ownerName", "owner 1");
        t.sort_by_column("amount");
        t.sort_by_column("amount");
        assert_eq!(t.selected_keys(), before);
        assert_eq!(t.hidden_selection_count(), 1);

        t.set_filter(FilterState::new());
        assert_eq!(t.selected_keys(), before);
        assert_eq!(t.hidden_selection_count(), 0);
    }

    #[test]
    fn test_select_all_visible_adds_only_visible_rows() {
        let mut t = table(vec![
            case("A", "Chen Wei", 1.0),
            case("B", "Lisa", 2.0),
            case("C", "Chen Li", 3.0),
        ]);
        t.select_key(RowKey::new("B"));
        t.set_filter_value("ownerName", "chen");
        t.select_all_visible();
        assert_eq!(
            t.selected_keys(),
            vec![RowKey::new("A"), RowKey::new("B"), RowKey::new("C")]
        );

        t.clear_selection();
        t.select_all_visible();
        assert_eq!(t.selected_keys(), vec![RowKey::new("A"), RowKey::new("C")]);
    }

    #[test]
    fn test_toggle_twice_unselects() {
        let mut t = numbered(3);
        let key = RowKey::new("C002");
        t.toggle_selected(&key);
        assert!(t.is_selected(&key));
        t.toggle_selected(&key);
        assert!(!t.is_selected(&key));
    }

    #[test]
    fn test_sort_by_same_column_toggles_direction() {
        let mut t = numbered(3);
        t.sort_by_column("amount");
        assert_eq!(t.sort().unwrap().direction, SortDirection::Ascending);
        assert_eq!(visible_keys(&t), vec!["C000", "C001", "C002"]);

        t.sort_by_column("amount");
        assert_eq!(t.sort().unwrap().direction, SortDirection::Descending);
        assert_eq!(visible_keys(&t), vec!["C002", "C001", "C000"]);

        t.sort_by_column("ownerName");
        assert_eq!(t.sort(), Some(&SortState::ascending("ownerName")));
    }

    #[test]
    fn test_view_is_cached_until_filter_or_sort_changes() {
        let mut t = numbered(30);
        assert!(t.view.get().is_none());
        t.visible_count();
        assert!(t.view.get().is_some());

        t.set_scroll_offset(10);
        t.move_cursor_down();
        t.toggle_cursor_selected();
        assert!(t.view.get().is_some());

        t.set_sort(Some(SortState::descending("amount")));
        assert!(t.view.get().is_none());
        t.visible_count();

        // Same filter again keeps the cache
        t.set_filter(FilterState::new());
        assert!(t.view.get().is_some());
    }

    #[test]
    fn test_hidden_selection_count_is_cached_across_scrolling() {
        let mut t = numbered(100);
        t.toggle_selected(&RowKey::new("C001"));
        t.toggle_selected(&RowKey::new("C050"));
        t.set_filter_value("ownerName", "owner 5");
        assert_eq!(t.hidden_selection_count(), 1);
        assert_eq!(t.hidden_selected.get(), Some(1));

        t.set_scroll_offset(5);
        t.move_cursor_down();
        t.page_down();
        assert_eq!(t.hidden_selected.get(), Some(1));

        t.toggle_selected(&RowKey::new("C002"));
        assert_eq!(t.hidden_selected.get(), None);
        assert_eq!(t.hidden_selection_count(), 2);

        t.clear_selection();
        assert_eq!(t.hidden_selected.get(), Some(0));
        assert_eq!(t.hidden_selection_count(), 0);

        t.select_key(RowKey::new("C003"));
        assert_eq!(t.hidden_selection_count(), 1);
        t.select_all_visible();
        assert_eq!(t.hidden_selected.get(), Some(1));
        assert_eq!(t.selection_count(), 12);
        t.set_filter(FilterState::new());
        assert_eq!(t.hidden_selection_count(), 0);
    }

    #[test]
    fn test_window_with_overscan() {
        let mut t = numbered(100);
        assert_eq!(t.window(), ViewportWindow { first: 0, end: 12 });

        t.set_scroll_offset(40);
        assert_eq!(t.window(), ViewportWindow { first: 38, end: 52 });
        assert_eq!(t.visible_window_rows().len(), 14);
        assert_eq!(t.visible_window_rows()[0].1.key().as_str(), "C038");
    }

    #[test]
    fn test_window_respects_row_height() {
        let mut t = SelectionTable::new(
            schema(),
            (0..100).map(|i| case(&format!("C{i}"), "x", 0.0)).collect(),
            Viewport::new(40, 600, 5),
        );
        t.set_scroll_offset(4000);
        // top = 100, but max scroll clamps to 100 * 40 - 600 = 3400 → top 85
        assert_eq!(t.top_index(), 85);
        assert_eq!(t.window(), ViewportWindow { first: 80, end: 100 });

        t.set_scroll_offset(410);
        assert_eq!(t.window(), ViewportWindow { first: 5, end: 30 });
    }

    #[test]
    fn test_window_clamps_to_visible_count() {
        let mut t = numbered(4);
        assert_eq!(t.window(), ViewportWindow { first: 0, end: 4 });
        t.set_filter_value("ownerName", "nobody");
        assert_eq!(t.window(), ViewportWindow::default());
        assert!(t.visible_window_rows().is_empty());
        assert!(t.cursor_row().is_none());
    }

    #[test]
    fn test_scroll_reports_window_start_changes_only() {
        let mut t = numbered(100);
        // Inside the overscan band the window start stays at 0
        assert!(!t.set_scroll_offset(1));
        assert!(!t.set_scroll_offset(2));
        assert!(t.set_scroll_offset(3));
        assert!(!t.set_scroll_offset(3));
    }

    #[test]
    fn test_cursor_movement_scrolls_into_view() {
        let mut t = numbered(50);
        for _ in 0..12 {
            t.move_cursor_down();
        }
        assert_eq!(t.cursor(), 12);
        assert_eq!(t.top_index(), 3);

        t.move_cursor_first();
        assert_eq!(t.top_index(), 0);

        t.move_cursor_last();
        assert_eq!(t.cursor(), 49);
        assert_eq!(t.cursor_row().unwrap().key().as_str(), "C049");
        assert_eq!(t.top_index(), 40);

        t.page_up();
        assert_eq!(t.cursor(), 39);
        t.move_cursor_up();
        assert_eq!(t.cursor(), 38);
        assert_eq!(t.top_index(), 38);
    }

    #[test]
    fn test_filter_change_resets_cursor_and_scroll() {
        let mut t = numbered(50);
        t.page_down();
        t.page_down();
        assert!(t.scroll_offset() > 0);
        t.set_filter_value("ownerName", "owner");
        assert_eq!(t.scroll_offset(), 0);
        assert_eq!(t.cursor(), 0);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut t = numbered(60);
        t.set_filter_value("ownerName", "owner");
        t.sort_by_column("amount");
        t.sort_by_column("amount");
        t.toggle_selected(&RowKey::new("C010"));
        t.toggle_selected(&RowKey::new("C020"));
        t.toggle_selected(&RowKey::new("C030"));
        for _ in 0..25 {
            t.move_cursor_down();
        }
        let snapshot = t.snapshot();

        t.set_filter(FilterState::new());
        t.set_sort(None);
        t.clear_selection();
        t.move_cursor_first();

        t.restore(&snapshot);
        assert_eq!(t.snapshot(), snapshot);
        assert_eq!(t.selection_count(), 3);
        assert_eq!(t.cursor_row().unwrap().key().as_str(), "C034");
    }

    #[test]
    fn test_shrinking_viewport_keeps_cursor_visible() {
        let mut t = numbered(50);
        for _ in 0..9 {
            t.move_cursor_down();
        }
        t.set_viewport(Viewport::new(1, 4, 1));
        assert_eq!(t.top_index(), 6);
        assert_eq!(t.cursor(), 9);
    }
}
