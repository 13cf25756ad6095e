//! Application runtime: key handling, command execution and event draining

use crate::config::DispatchConfig;
use crate::engine::{
    aggregate, export_to_dir, AssignmentService, Command, EngineEvent, ListKind, ListStep,
    SessionContext, WorkflowEngine, WorkflowStep,
};
use crate::remote::{CredentialStore, FileCredentialStore, RemoteClient};
use crate::state::{AppState, FilterEditor};
use crate::ui;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Lines scrolled per mouse wheel notch
const WHEEL_STEP: usize = 3;

/// Writes text to the clipboard
type ClipboardWriter = fn(&str) -> Result<()>;

/// Main application struct
pub struct App {
    /// Wizard state machine
    pub engine: WorkflowEngine,
    /// Front-end state
    pub state: AppState,
    client: RemoteClient,
    credentials: Box<dyn CredentialStore>,
    events_tx: UnboundedSender<EngineEvent>,
    events_rx: UnboundedReceiver<EngineEvent>,
    clipboard: ClipboardWriter,
    /// Whether the app should quit
    quit: bool,
    /// Status feedback message
    pub copy_message: Option<String>,
    /// Terminal size (height, width)
    pub terminal_size: Option<(u16, u16)>,
}

impl App {
    /// Create a new App from the user configuration and stored credential
    pub fn new() -> Result<Self> {
        let config = DispatchConfig::load()?;
        Self::with_parts(config, Box::new(FileCredentialStore::default_location()))
    }

    pub fn with_parts(config: DispatchConfig, credentials: Box<dyn CredentialStore>) -> Result<Self> {
        let mut state = AppState::default();
        let credential = match credentials.load() {
            Ok(credential) => credential,
            Err(err) => {
                state.push_error(format!("Could not read stored credential: {err:#}"));
                None
            }
        };

        let client = RemoteClient::new(&config)?.with_credential(credential.clone());
        let engine = WorkflowEngine::new(SessionContext::new(config, credential));
        let (events_tx, events_rx) = unbounded_channel();

        Ok(Self {
            engine,
            state,
            client,
            credentials,
            events_tx,
            events_rx,
            clipboard: system_clipboard,
            quit: false,
            copy_message: None,
            terminal_size: None,
        })
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn quit(&mut self) {
        self.engine.close();
        self.quit = true;
    }

    /// Whether anything is loading, for faster redraws
    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    /// Push an error message to the error queue for display
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.state.push_error(message.into());
    }

    /// Size list viewports to the current terminal
    pub fn sync_viewport(&mut self) {
        let height = self.terminal_size.map(|(h, _)| h).unwrap_or(24);
        self.engine.set_viewport_height(ui::table_body_height(height));
    }

    /// Feed every finished background result into the engine; returns
    /// whether anything arrived
    pub fn drain_events(&mut self) -> bool {
        let mut received = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.engine.handle_event(event);
            received = true;
        }
        received
    }

    fn run_commands(&mut self, commands: Vec<Command>) {
        for command in commands {
            self.run_command(command);
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::LoadList { list, scope, plan } => {
                let session = self.engine.session();
                let (path, schema) = match list {
                    ListKind::Cases => (&session.config.cases_path, session.case_schema.clone()),
                    ListKind::Assignees => {
                        (&session.config.assignees_path, session.assignee_schema.clone())
                    }
                };
                let listing = self.client.listing(path, schema);
                let tx = self.events_tx.clone();

                tokio::spawn(async move {
                    let progress_tx = tx.clone();
                    let scope_id = scope.id();
                    let outcome = aggregate(&listing, &plan, &scope, |loaded, total| {
                        let _ = progress_tx.send(EngineEvent::ListProgress {
                            list,
                            scope: scope_id,
                            loaded,
                            total,
                        });
                    })
                    .await;
                    let _ = tx.send(EngineEvent::ListLoaded {
                        list,
                        scope: scope_id,
                        outcome,
                    });
                });
            }
            Command::Assign { scope, batch } => {
                let client = self.client.clone();
                let tx = self.events_tx.clone();

                tokio::spawn(async move {
                    let result = AssignmentService::new(&client).assign(&batch, &scope).await;
                    let _ = tx.send(EngineEvent::AssignmentFinished {
                        scope: scope.id(),
                        result,
                    });
                });
            }
            Command::PersistCredential(credential) => {
                let stored = match &credential {
                    Some(credential) => self.credentials.save(credential),
                    None => self.credentials.clear(),
                };
                if let Err(err) = stored {
                    self.push_error(format!("Could not store credential: {err:#}"));
                }
                self.client.set_credential(credential);
            }
        }
    }

    // === Input ===

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Handle error dialog dismissal first (modal)
        if self.state.has_errors() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.state.dismiss_error();
            }
            return;
        }

        // Filter editor (modal)
        if self.state.filter_editor.is_some() {
            self.handle_filter_editor_key(key);
            return;
        }

        // Clear any status messages on key press
        self.copy_message = None;

        match self.engine.step() {
            WorkflowStep::AwaitingCredential => self.handle_credential_key(key),
            WorkflowStep::ModeSelection => self.handle_mode_key(key),
            WorkflowStep::CaseList(_) => self.handle_case_list_key(key),
            WorkflowStep::AssigneeSelection => self.handle_assignee_key(key),
            WorkflowStep::Confirming => self.handle_confirm_key(key),
            WorkflowStep::Result => self.handle_result_key(key),
        }
    }

    /// Scroll the active table; returns whether the screen needs a redraw
    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        let Some(table) = self.engine.active_table_mut() else {
            return false;
        };
        let step = WHEEL_STEP * table.viewport().row_height;
        let offset = match mouse.kind {
            MouseEventKind::ScrollDown => table.scroll_offset() + step,
            MouseEventKind::ScrollUp => table.scroll_offset().saturating_sub(step),
            _ => return false,
        };
        // The window carries overscan, but the terminal shows rows from the
        // top index, so a moved top needs a redraw too
        let top = table.top_index();
        let window_moved = table.set_scroll_offset(offset);
        window_moved || table.top_index() != top
    }

    fn handle_credential_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let credential = self.state.credential_input.as_text().to_string();
                let commands = self.engine.submit_credential(&credential);
                if !commands.is_empty() {
                    self.state.credential_input.clear();
                }
                self.run_commands(commands);
            }
            KeyCode::Tab => {
                self.state.credential_input.clear();
                let commands = self.engine.skip_credential();
                self.run_commands(commands);
            }
            KeyCode::Esc => {
                self.state.credential_input.clear();
                let commands = self.engine.back();
                self.run_commands(commands);
            }
            KeyCode::Backspace => self.state.credential_input.pop_char(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.credential_input.push_char(c)
            }
            _ => {}
        }
    }

    fn handle_mode_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_mode_down(),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_mode_up(),
            KeyCode::Char('1') => self.start_mode(0),
            KeyCode::Char('2') => self.start_mode(1),
            KeyCode::Enter => self.start_mode(self.state.mode_index),
            KeyCode::Char('c') => {
                let commands = self.engine.change_credential();
                self.run_commands(commands);
            }
            KeyCode::Char('q') => self.quit(),
            _ => {}
        }
    }

    fn start_mode(&mut self, index: usize) {
        self.state.mode_index = index;
        self.state.column_index = 0;
        let commands = self.engine.choose_mode(self.state.selected_mode());
        self.run_commands(commands);
    }

    /// Keys shared by both list steps; returns whether the key was used
    fn handle_list_key(&mut self, key: KeyEvent) -> bool {
        let column_count = self
            .engine
            .active_table_mut()
            .map(|t| t.schema().fields.len())
            .unwrap_or(0);

        match key.code {
            KeyCode::Char('x') if self.engine.active_list().is_some_and(ListStep::is_loading) => {
                let commands = self.engine.stop_loading();
                self.run_commands(commands);
                return true;
            }
            KeyCode::Char('r') => {
                let commands = self.engine.reload();
                self.run_commands(commands);
                return true;
            }
            KeyCode::Esc => {
                let commands = self.engine.back();
                self.run_commands(commands);
                return true;
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.state.prev_column(column_count);
                return true;
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.state.next_column(column_count);
                return true;
            }
            _ => {}
        }

        let column = self.state.column_index;
        let Some(table) = self.engine.active_table_mut() else {
            return false;
        };
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => table.move_cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => table.move_cursor_up(),
            KeyCode::PageDown => table.page_down(),
            KeyCode::PageUp => table.page_up(),
            KeyCode::Char('g') | KeyCode::Home => table.move_cursor_first(),
            KeyCode::Char('G') | KeyCode::End => table.move_cursor_last(),
            KeyCode::Char('s') => {
                if let Some(name) = table.schema().fields.get(column).map(|f| f.name.clone()) {
                    table.sort_by_column(&name);
                }
            }
            KeyCode::Char('/') => {
                if let Some(field) = table.schema().fields.get(column) {
                    self.state.filter_editor = Some(FilterEditor::open(field, table.filter()));
                }
            }
            KeyCode::Char('c') => table.set_filter(Default::default()),
            _ => return false,
        }
        true
    }

    fn handle_filter_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.state.filter_editor.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.state.filter_editor = None,
            KeyCode::Enter => {
                let entries = editor.entries();
                self.state.filter_editor = None;
                if let Some(table) = self.engine.active_table_mut() {
                    for (field, value) in entries {
                        table.set_filter_value(&field, &value);
                    }
                }
            }
            KeyCode::Backspace => editor.input.pop_char(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                editor.input.push_char(c)
            }
            _ => {}
        }
    }

    fn handle_case_list_key(&mut self, key: KeyEvent) {
        if self.handle_list_key(key) {
            return;
        }
        match key.code {
            KeyCode::Enter => {
                let commands = self.engine.proceed();
                self.run_commands(commands);
            }
            KeyCode::Char('e') => self.export_cases(),
            KeyCode::Char('y') => self.copy_selected_keys(),
            code => {
                let Some(table) = self.engine.active_table_mut() else {
                    return;
                };
                match code {
                    KeyCode::Char(' ') => table.toggle_cursor_selected(),
                    KeyCode::Char('a') => table.select_all_visible(),
                    KeyCode::Char('x') => table.clear_selection(),
                    _ => {}
                }
            }
        }
    }

    fn handle_assignee_key(&mut self, key: KeyEvent) {
        if self.handle_list_key(key) {
            return;
        }
        if key.code == KeyCode::Enter {
            let commands = self.engine.choose_assignee();
            self.run_commands(commands);
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let commands = match key.code {
            KeyCode::Enter | KeyCode::Char('y') => self.engine.confirm(),
            KeyCode::Char('a') => self.engine.reauthenticate(),
            KeyCode::Esc | KeyCode::Char('n') => self.engine.back(),
            _ => Vec::new(),
        };
        self.run_commands(commands);
    }

    fn handle_result_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                let commands = self.engine.finish();
                self.run_commands(commands);
            }
            KeyCode::Char('y') => {
                let Some(result) = self.engine.result() else {
                    return;
                };
                let report = result
                    .outcome
                    .failures
                    .iter()
                    .map(|f| format!("{}\t{}", f.key, f.reason))
                    .collect::<Vec<_>>()
                    .join("\n");
                if report.is_empty() {
                    self.copy_message = Some("No failures to copy".to_string());
                } else {
                    let count = result.outcome.failure_count();
                    self.copy_to_clipboard(&report, format!("Copied {count} failures"));
                }
            }
            _ => {}
        }
    }

    // === Export and clipboard ===

    fn export_cases(&mut self) {
        let Some(cases) = self.engine.case_list() else {
            return;
        };
        let Some(table) = cases.list.table.as_ref() else {
            self.copy_message = Some("Nothing loaded yet".to_string());
            return;
        };

        let dir = self.engine.session().config.export_dir();
        let now = chrono::Local::now().naive_local();
        match export_to_dir(table.schema(), table.visible_rows(), &dir, cases.mode, now) {
            Ok((path, written)) => {
                self.copy_message = Some(format!("Exported {written} rows to {}", path.display()));
            }
            Err(err) => self.push_error(format!("Export failed: {err:#}")),
        }
    }

    fn copy_selected_keys(&mut self) {
        let Some(table) = self.engine.case_list().and_then(|c| c.list.table.as_ref()) else {
            return;
        };
        let keys = table.selected_keys();
        if keys.is_empty() {
            self.copy_message = Some("No cases selected".to_string());
            return;
        }
        let text = keys
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.copy_to_clipboard(&text, format!("Copied {} case keys", keys.len()));
    }

    /// Copy `text`, reporting `done` in the status bar; failures go to the
    /// error dialog and leave the wizard where it is
    fn copy_to_clipboard(&mut self, text: &str, done: String) {
        match (self.clipboard)(text) {
            Ok(()) => self.copy_message = Some(done),
            Err(err) => self.push_error(format!("Copy failed: {err:#}")),
        }
    }
}

fn system_clipboard(text: &str) -> Result<()> {
    use arboard::Clipboard;
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ListMode, LoadStatus, RowKey};
    use crate::remote::test_server::TestServer;
    use crate::remote::{MockCredentialStore, RetryPolicy};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app_with(store: MockCredentialStore) -> App {
        App::with_parts(DispatchConfig::default(), Box::new(store)).unwrap()
    }

    #[test]
    fn test_starts_at_credential_prompt_without_token() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(None));
        let app = app_with(store);
        assert_eq!(app.engine.step(), WorkflowStep::AwaitingCredential);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_stored_token_skips_prompt() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(Some("tok".into())));
        let app = app_with(store);
        assert_eq!(app.engine.step(), WorkflowStep::ModeSelection);
    }

    #[test]
    fn test_unreadable_store_queues_error() {
        let mut store = MockCredentialStore::new();
        store
            .expect_load()
            .returning(|| Err(anyhow::anyhow!("permission denied")));
        let mut app = app_with(store);
        assert!(app.state.has_errors());
        assert_eq!(app.engine.step(), WorkflowStep::AwaitingCredential);

        // Error dialog swallows keys until dismissed
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.state.credential_input.as_text(), "");
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.state.has_errors());
    }

    #[test]
    fn test_entering_credential_saves_it() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .withf(|credential| credential == "s3cret")
            .times(1)
            .returning(|_| Ok(()));
        let mut app = app_with(store);

        type_text(&mut app, "s3cret");
        assert_eq!(app.state.credential_input.display_value(), "••••••");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.engine.step(), WorkflowStep::ModeSelection);
        assert_eq!(app.engine.session().credential(), Some("s3cret"));
        assert!(app.state.credential_input.is_empty());
    }

    #[test]
    fn test_failed_save_is_reported() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        let mut app = app_with(store);

        type_text(&mut app, "tok");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.engine.step(), WorkflowStep::ModeSelection);
        assert!(app.state.current_error().unwrap().contains("disk full"));
    }

    #[test]
    fn test_change_credential_clears_store() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(Some("old".into())));
        store.expect_clear().times(1).returning(|| Ok(()));
        let mut app = app_with(store);

        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.engine.step(), WorkflowStep::AwaitingCredential);

        // Esc without a credential stays on the prompt
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.engine.step(), WorkflowStep::AwaitingCredential);
    }

    #[test]
    fn test_mode_menu_navigation_and_quit() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(Some("tok".into())));
        let mut app = app_with(store);

        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.state.mode_index, 1);
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.state.mode_index, 0);

        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit());
        assert!(app.engine.is_closed());
    }

    fn signed_in() -> MockCredentialStore {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(Some("tok".into())));
        store
    }

    /// Case service: 120 unassigned cases (held back by `unassigned_delay`),
    /// two owned cases, one operator. Assignment rejects the first key.
    async fn case_service(unassigned_delay: Duration) -> TestServer {
        TestServer::start(move |body: Value| async move {
            if let Some(keys) = body.get("keys").and_then(Value::as_array) {
                let rejected: Vec<Value> = keys
                    .iter()
                    .take(1)
                    .map(|key| json!({"key": key, "reason": "locked"}))
                    .collect();
                let accepted: Vec<Value> = keys.iter().skip(1).cloned().collect();
                return (200, json!({"accepted": accepted, "rejected": rejected}));
            }

            let filter = body["filter"].clone();
            if filter == json!({}) {
                return (
                    200,
                    json!({"rows": [{"operatorId": "op-1", "name": "Ann"}], "totalCount": 1}),
                );
            }
            if filter == json!({"assigned": true}) {
                return (
                    200,
                    json!({"rows": [{"caseId": "R0"}, {"caseId": "R1"}], "totalCount": 2}),
                );
            }

            tokio::time::sleep(unassigned_delay).await;
            let page = body["pageIndex"].as_u64().unwrap_or(1);
            let size = body["pageSize"].as_u64().unwrap_or(50);
            let first = (page - 1) * size;
            let rows: Vec<Value> = (first..(first + size).min(120))
                .map(|i| json!({"caseId": format!("U{i:03}")}))
                .collect();
            (200, json!({"rows": rows, "totalCount": 120}))
        })
        .await
    }

    fn app_for(server: &TestServer) -> App {
        let config = DispatchConfig {
            api_base_url: server.base_url.clone(),
            page_size: 50,
            concurrency_limit: 2,
            retry: RetryPolicy::none(),
            ..Default::default()
        };
        App::with_parts(config, Box::new(signed_in())).unwrap()
    }

    /// Drain background events until `done` holds
    async fn drain_until(app: &mut App, done: impl Fn(&App) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                app.drain_events();
                if done(&*app) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("background work should finish");
    }

    fn list_status(app: &App) -> Option<LoadStatus> {
        app.engine.active_list().map(|list| list.status.clone())
    }

    #[tokio::test]
    async fn test_case_list_loads_through_background_task() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);

        app.handle_key(key(KeyCode::Char('1')));
        assert_eq!(app.engine.step(), WorkflowStep::CaseList(ListMode::Unassigned));
        assert!(app.is_busy());

        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        let table = app.engine.active_table_mut().unwrap();
        assert_eq!(table.row_count(), 120);
        assert_eq!(table.visible_rows().next().unwrap().key().as_str(), "U000");
        assert_eq!(server.hits(), 3);
        assert!(!app.is_busy());
    }

    #[tokio::test]
    async fn test_background_progress_is_tagged_with_its_scope() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);
        let commands = app.engine.choose_mode(ListMode::Unassigned);
        let scope = match commands.as_slice() {
            [Command::LoadList { scope, .. }] => scope.id(),
            other => panic!("unexpected commands {other:?}"),
        };
        app.run_commands(commands);

        let mut progress = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), app.events_rx.recv())
                .await
                .expect("event in time")
                .expect("channel open");
            match event {
                EngineEvent::ListProgress {
                    scope: id,
                    loaded,
                    total,
                    ..
                } => {
                    assert_eq!(id, scope);
                    progress.push((loaded, total));
                }
                EngineEvent::ListLoaded { scope: id, .. } => {
                    assert_eq!(id, scope);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(progress, vec![(50, 120), (120, 120)]);
    }

    #[tokio::test]
    async fn test_late_events_from_abandoned_load_are_dropped() {
        let server = case_service(Duration::from_millis(200)).await;
        let mut app = app_for(&server);

        app.handle_key(key(KeyCode::Char('1')));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.engine.step(), WorkflowStep::ModeSelection);

        app.handle_key(key(KeyCode::Char('2')));
        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        assert_eq!(app.engine.active_table_mut().unwrap().row_count(), 2);

        // Let the abandoned unassigned load finish and report
        tokio::time::sleep(Duration::from_millis(400)).await;
        app.drain_events();
        assert_eq!(app.engine.step(), WorkflowStep::CaseList(ListMode::Reassign));
        assert_eq!(list_status(&app), Some(LoadStatus::Ready));
        let table = app.engine.active_table_mut().unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cursor_row().unwrap().key().as_str(), "R0");
    }

    #[tokio::test]
    async fn test_stop_key_keeps_rows_loaded_so_far() {
        let server = case_service(Duration::from_millis(100)).await;
        let mut app = app_for(&server);

        app.handle_key(key(KeyCode::Char('1')));
        // Page 1 arrives alone; stop while the next chunk is in flight
        drain_until(&mut app, |app| {
            matches!(list_status(app), Some(LoadStatus::Loading { loaded: 50, .. }))
        })
        .await;
        app.handle_key(key(KeyCode::Char('x')));

        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Cancelled)).await;
        assert_eq!(app.engine.active_table_mut().unwrap().row_count(), 50);
        assert_eq!(app.engine.step(), WorkflowStep::CaseList(ListMode::Unassigned));
    }

    #[tokio::test]
    async fn test_assignment_round_trip_reaches_result() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);

        app.handle_key(key(KeyCode::Char('1')));
        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.engine.step(), WorkflowStep::AssigneeSelection);

        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.engine.step(), WorkflowStep::Confirming);
        app.handle_key(key(KeyCode::Enter));

        drain_until(&mut app, |app| app.engine.step() == WorkflowStep::Result).await;
        let result = app.engine.result().unwrap();
        assert_eq!(result.requested, 2);
        assert_eq!(result.assignee_label, "Ann");
        assert!(result.outcome.successful_keys.contains(&RowKey::new("U001")));
        assert_eq!(result.outcome.failures[0].key, RowKey::new("U000"));
        assert_eq!(result.outcome.failures[0].reason, "locked");
    }

    #[tokio::test]
    async fn test_clipboard_failure_is_queued_not_fatal() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);
        app.clipboard = |_| Err(anyhow::anyhow!("no display"));

        app.handle_key(key(KeyCode::Char('1')));
        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Char('y')));

        assert!(!app.should_quit());
        assert!(app.state.current_error().unwrap().contains("no display"));
        assert!(app.copy_message.is_none());
        assert_eq!(app.engine.active_table_mut().unwrap().selection_count(), 1);
    }

    #[tokio::test]
    async fn test_clipboard_success_reports_in_status_bar() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);
        app.clipboard = |_| Ok(());

        app.handle_key(key(KeyCode::Char('1')));
        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(key(KeyCode::Char('y')));

        assert!(!app.state.has_errors());
        assert_eq!(app.copy_message.as_deref(), Some("Copied 120 case keys"));
    }

    #[tokio::test]
    async fn test_wheel_reports_redraw_only_when_rows_move() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);
        let wheel = |kind| MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert!(!app.handle_mouse(wheel(MouseEventKind::ScrollDown)));

        app.terminal_size = Some((30, 100));
        app.sync_viewport();
        app.handle_key(key(KeyCode::Char('1')));
        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;

        assert!(app.handle_mouse(wheel(MouseEventKind::ScrollDown)));
        assert!(app.handle_mouse(wheel(MouseEventKind::ScrollUp)));
        assert!(!app.handle_mouse(wheel(MouseEventKind::ScrollUp)));
        assert!(!app.handle_mouse(wheel(MouseEventKind::Moved)));
    }

    #[tokio::test]
    async fn test_filter_editor_ignores_control_chords() {
        let server = case_service(Duration::ZERO).await;
        let mut app = app_for(&server);

        app.handle_key(key(KeyCode::Char('1')));
        drain_until(&mut app, |app| list_status(app) == Some(LoadStatus::Ready)).await;
        app.handle_key(key(KeyCode::Char('/')));
        assert!(app.state.filter_editor.is_some());

        app.handle_key(key(KeyCode::Char('u')));
        app.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        assert_eq!(app.state.filter_editor.as_ref().unwrap().input.as_text(), "u");
    }

    #[test]
    fn test_sync_viewport_uses_terminal_height() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(Some("tok".into())));
        let mut app = app_with(store);
        app.terminal_size = Some((40, 120));
        app.sync_viewport();
        app.drain_events();
        assert!(!app.is_busy());
    }
}
