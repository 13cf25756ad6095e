//! The dispatch wizard: credential → mode → case list → assignee →
//! confirmation → result.
//!
//! The engine never performs I/O. Transitions return [`Command`]s for the
//! runtime to execute, and async completions come back through
//! [`WorkflowEngine::handle_event`] tagged with the scope that started them.

use serde_json::{json, Value};

use super::aggregator::{AggregationOutcome, AggregationPlan};
use super::assignment::{AssigneeId, AssignmentBatch, AssignmentOutcome, AssignmentResult};
use super::cancel::{CancellationScope, ScopeId};
use super::row::Row;
use super::session::SessionContext;
use super::table::{SelectionTable, StepSnapshot, Viewport};
use crate::remote::RemoteError;

/// Which case listing a CaseList step shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListMode {
    /// Cases nobody owns yet
    Unassigned,
    /// Cases already owned by an operator
    Reassign,
}

impl ListMode {
    pub const ALL: [ListMode; 2] = [ListMode::Unassigned, ListMode::Reassign];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unassigned => "Dispatch unassigned cases",
            Self::Reassign => "Reassign owned cases",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Unassigned => "Cases waiting for their first operator",
            Self::Reassign => "Move cases between operators",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Reassign => "reassign",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    AwaitingCredential,
    ModeSelection,
    CaseList(ListMode),
    AssigneeSelection,
    Confirming,
    Result,
}

impl WorkflowStep {
    pub fn title(&self) -> &'static str {
        match self {
            Self::AwaitingCredential => "Sign in",
            Self::ModeSelection => "Choose a task",
            Self::CaseList(ListMode::Unassigned) => "Unassigned cases",
            Self::CaseList(ListMode::Reassign) => "Owned cases",
            Self::AssigneeSelection => "Choose an operator",
            Self::Confirming => "Confirm assignment",
            Self::Result => "Assignment result",
        }
    }
}

/// The two data-bearing list steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Cases,
    Assignees,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading { loaded: usize, total: u64 },
    Ready,
    /// Stopped early; the table holds the rows of completed chunks
    Cancelled,
    Failed(RemoteError),
}

/// One aggregation and the table built from it
pub struct ListStep {
    scope: CancellationScope,
    pub status: LoadStatus,
    pub table: Option<SelectionTable>,
}

impl ListStep {
    fn loading(scope: CancellationScope) -> Self {
        Self {
            scope,
            status: LoadStatus::Loading { loaded: 0, total: 0 },
            table: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading { .. })
    }

    fn teardown(&self) {
        self.scope.cancel();
    }
}

pub struct CaseListStep {
    pub mode: ListMode,
    pub list: ListStep,
    snapshot: Option<StepSnapshot>,
}

impl CaseListStep {
    pub fn snapshot(&self) -> Option<&StepSnapshot> {
        self.snapshot.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub batch: AssignmentBatch,
    pub assignee_label: String,
    pub mode: ListMode,
    in_flight: Option<CancellationScope>,
    /// Set when the whole call failed; the batch can be retried as is
    pub error: Option<RemoteError>,
}

impl Confirmation {
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub assignee_label: String,
    pub requested: usize,
    pub outcome: AssignmentOutcome,
}

/// Side effects requested by the engine
#[derive(Debug, Clone)]
pub enum Command {
    LoadList {
        list: ListKind,
        scope: CancellationScope,
        plan: AggregationPlan,
    },
    Assign {
        scope: CancellationScope,
        batch: AssignmentBatch,
    },
    /// Store (`Some`) or forget (`None`) the credential
    PersistCredential(Option<String>),
}

/// Async completions fed back into the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    ListProgress {
        list: ListKind,
        scope: ScopeId,
        loaded: usize,
        total: u64,
    },
    ListLoaded {
        list: ListKind,
        scope: ScopeId,
        outcome: AggregationOutcome,
    },
    AssignmentFinished {
        scope: ScopeId,
        result: AssignmentResult,
    },
}

pub struct WorkflowEngine {
    session: SessionContext,
    step: WorkflowStep,
    cases: Option<CaseListStep>,
    assignees: Option<ListStep>,
    confirmation: Option<Confirmation>,
    result: Option<ResultView>,
    /// Step to return to once a credential has been (re)entered
    resume: Option<WorkflowStep>,
    viewport: Viewport,
    closed: bool,
}

impl WorkflowEngine {
    pub fn new(session: SessionContext) -> Self {
        let step = if session.has_credential() {
            WorkflowStep::ModeSelection
        } else {
            WorkflowStep::AwaitingCredential
        };
        let viewport = Viewport::new(1, 20, session.config.overscan);
        tracing::info!("Workflow starting at {:?}", step);
        Self {
            session,
            step,
            cases: None,
            assignees: None,
            confirmation: None,
            result: None,
            resume: None,
            viewport,
            closed: false,
        }
    }

    // === Accessors ===

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn case_list(&self) -> Option<&CaseListStep> {
        self.cases.as_ref()
    }

    pub fn assignee_list(&self) -> Option<&ListStep> {
        self.assignees.as_ref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn result(&self) -> Option<&ResultView> {
        self.result.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the step being shown has work in flight
    pub fn is_busy(&self) -> bool {
        match self.step {
            WorkflowStep::CaseList(_) => self.cases.as_ref().is_some_and(|c| c.list.is_loading()),
            WorkflowStep::AssigneeSelection => {
                self.assignees.as_ref().is_some_and(ListStep::is_loading)
            }
            WorkflowStep::Confirming => self
                .confirmation
                .as_ref()
                .is_some_and(Confirmation::is_in_flight),
            _ => false,
        }
    }

    /// The list backing the current step, if it is a list step
    pub fn active_list(&self) -> Option<&ListStep> {
        match self.step {
            WorkflowStep::CaseList(_) => self.cases.as_ref().map(|c| &c.list),
            WorkflowStep::AssigneeSelection => self.assignees.as_ref(),
            _ => None,
        }
    }

    /// Table of the current list step, for filter/sort/select/scroll input
    pub fn active_table_mut(&mut self) -> Option<&mut SelectionTable> {
        match self.step {
            WorkflowStep::CaseList(_) => self.cases.as_mut()?.list.table.as_mut(),
            WorkflowStep::AssigneeSelection => self.assignees.as_mut()?.table.as_mut(),
            _ => None,
        }
    }

    fn case_table(&self) -> Option<&SelectionTable> {
        self.cases.as_ref()?.list.table.as_ref()
    }

    fn assignee_table(&self) -> Option<&SelectionTable> {
        self.assignees.as_ref()?.table.as_ref()
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        if self.viewport.container_height == height {
            return;
        }
        self.viewport.container_height = height;
        let viewport = self.viewport;
        if let Some(table) = self.cases.as_mut().and_then(|c| c.list.table.as_mut()) {
            table.set_viewport(viewport);
        }
        if let Some(table) = self.assignees.as_mut().and_then(|a| a.table.as_mut()) {
            table.set_viewport(viewport);
        }
    }

    fn go(&mut self, step: WorkflowStep) {
        tracing::info!("Workflow step {:?} -> {:?}", self.step, step);
        self.step = step;
    }

    fn ignored(&self, action: &str) -> Vec<Command> {
        tracing::debug!("Ignoring {action} in step {:?}", self.step);
        Vec::new()
    }

    fn plan(&self, filter_payload: Value) -> AggregationPlan {
        AggregationPlan {
            filter_payload,
            page_size: self.session.config.page_size,
            concurrency_limit: self.session.config.concurrency_limit,
        }
    }

    fn teardown_cases(&mut self) {
        if let Some(cases) = self.cases.take() {
            cases.list.teardown();
        }
    }

    fn teardown_assignees(&mut self) {
        if let Some(assignees) = self.assignees.take() {
            assignees.teardown();
        }
    }

    fn start_cases(&mut self, mode: ListMode) -> Command {
        self.teardown_cases();
        let scope = CancellationScope::new();
        let plan = self.plan(self.session.config.filter_for(mode).clone());
        self.cases = Some(CaseListStep {
            mode,
            list: ListStep::loading(scope.clone()),
            snapshot: None,
        });
        Command::LoadList {
            list: ListKind::Cases,
            scope,
            plan,
        }
    }

    fn start_assignees(&mut self) -> Command {
        self.teardown_assignees();
        let scope = CancellationScope::new();
        let plan = self.plan(json!({}));
        self.assignees = Some(ListStep::loading(scope.clone()));
        Command::LoadList {
            list: ListKind::Assignees,
            scope,
            plan,
        }
    }

    // === Credential ===

    pub fn submit_credential(&mut self, credential: &str) -> Vec<Command> {
        if self.step != WorkflowStep::AwaitingCredential {
            return self.ignored("credential submission");
        }
        let credential = credential.trim();
        if credential.is_empty() {
            return self.ignored("blank credential");
        }
        self.session.set_credential(Some(credential.to_string()));
        self.leave_credential_step();
        vec![Command::PersistCredential(Some(credential.to_string()))]
    }

    /// Continue without entering a credential
    pub fn skip_credential(&mut self) -> Vec<Command> {
        if self.step != WorkflowStep::AwaitingCredential {
            return self.ignored("credential skip");
        }
        self.leave_credential_step();
        Vec::new()
    }

    /// Forget the stored credential and ask for a new one
    pub fn change_credential(&mut self) -> Vec<Command> {
        if self.step != WorkflowStep::ModeSelection {
            return self.ignored("credential change");
        }
        self.session.set_credential(None);
        self.go(WorkflowStep::AwaitingCredential);
        vec![Command::PersistCredential(None)]
    }

    fn leave_credential_step(&mut self) {
        let next = match self.resume.take() {
            Some(WorkflowStep::Confirming) if self.confirmation.is_some() => {
                if let Some(confirmation) = self.confirmation.as_mut() {
                    confirmation.error = None;
                }
                WorkflowStep::Confirming
            }
            _ => WorkflowStep::ModeSelection,
        };
        self.go(next);
    }

    // === Mode and lists ===

    pub fn choose_mode(&mut self, mode: ListMode) -> Vec<Command> {
        if self.step != WorkflowStep::ModeSelection {
            return self.ignored("mode choice");
        }
        let command = self.start_cases(mode);
        self.go(WorkflowStep::CaseList(mode));
        vec![command]
    }

    pub fn can_proceed(&self) -> bool {
        matches!(self.step, WorkflowStep::CaseList(_))
            && self.case_table().is_some_and(|t| t.selection_count() > 0)
    }

    pub fn proceed(&mut self) -> Vec<Command> {
        if !self.can_proceed() {
            return self.ignored("proceed without a selection");
        }
        if let Some(cases) = self.cases.as_mut() {
            cases.snapshot = cases.list.table.as_ref().map(SelectionTable::snapshot);
        }

        let reuse = self
            .assignees
            .as_ref()
            .is_some_and(|a| matches!(a.status, LoadStatus::Ready | LoadStatus::Loading { .. }));
        self.go(WorkflowStep::AssigneeSelection);
        if reuse {
            Vec::new()
        } else {
            vec![self.start_assignees()]
        }
    }

    /// Stop the load of the current list, keeping the step. The rows of
    /// chunks that already finished arrive as a cancelled outcome.
    pub fn stop_loading(&mut self) -> Vec<Command> {
        let list = match self.step {
            WorkflowStep::CaseList(_) => self.cases.as_ref().map(|c| &c.list),
            WorkflowStep::AssigneeSelection => self.assignees.as_ref(),
            _ => None,
        };
        match list {
            Some(list) if list.is_loading() => {
                tracing::info!("Stopping {:?} load", self.step);
                list.teardown();
            }
            _ => return self.ignored("stop loading"),
        }
        Vec::new()
    }

    /// Re-fetch the current list from page 1 with a fresh scope
    pub fn reload(&mut self) -> Vec<Command> {
        match self.step {
            WorkflowStep::CaseList(mode) => vec![self.start_cases(mode)],
            WorkflowStep::AssigneeSelection => vec![self.start_assignees()],
            _ => self.ignored("reload"),
        }
    }

    pub fn back(&mut self) -> Vec<Command> {
        match self.step {
            WorkflowStep::AwaitingCredential => {
                let resume = self.resume.take();
                match resume {
                    Some(step) => self.go(step),
                    None if self.session.has_credential() => self.go(WorkflowStep::ModeSelection),
                    None => return self.ignored("back"),
                }
            }
            WorkflowStep::CaseList(_) => {
                self.teardown_cases();
                self.teardown_assignees();
                self.go(WorkflowStep::ModeSelection);
            }
            WorkflowStep::AssigneeSelection => {
                if self.assignees.as_ref().is_some_and(ListStep::is_loading) {
                    self.teardown_assignees();
                }
                let mode = match self.cases.as_mut() {
                    Some(cases) => {
                        if let (Some(table), Some(snapshot)) =
                            (cases.list.table.as_mut(), cases.snapshot.as_ref())
                        {
                            table.restore(snapshot);
                        }
                        cases.mode
                    }
                    None => return self.ignored("back without a case list"),
                };
                self.go(WorkflowStep::CaseList(mode));
            }
            WorkflowStep::Confirming => {
                if self.confirmation.as_ref().is_some_and(Confirmation::is_in_flight) {
                    return self.ignored("back while assigning");
                }
                self.confirmation = None;
                self.go(WorkflowStep::AssigneeSelection);
            }
            WorkflowStep::ModeSelection | WorkflowStep::Result => return self.ignored("back"),
        }
        Vec::new()
    }

    // === Assignee and confirmation ===

    fn cursor_assignee(&self) -> Option<&Row> {
        self.assignee_table()?.cursor_row()
    }

    pub fn can_choose_assignee(&self) -> bool {
        self.step == WorkflowStep::AssigneeSelection
            && self
                .cursor_assignee()
                .is_some_and(|row| !row.key().as_str().trim().is_empty())
            && self.case_table().is_some_and(|t| t.selection_count() > 0)
    }

    pub fn choose_assignee(&mut self) -> Vec<Command> {
        if !self.can_choose_assignee() {
            return self.ignored("assignee choice");
        }
        let (Some(row), Some(mode), Some(keys)) = (
            self.cursor_assignee(),
            self.cases.as_ref().map(|c| c.mode),
            self.case_table().map(SelectionTable::selected_keys),
        ) else {
            return Vec::new();
        };

        let assignee = AssigneeId::new(row.key().as_str());
        let assignee_label = row.title(&self.session.assignee_schema);
        let Some(batch) = AssignmentBatch::new(keys, assignee) else {
            return self.ignored("empty assignment batch");
        };
        self.confirmation = Some(Confirmation {
            batch,
            assignee_label,
            mode,
            in_flight: None,
            error: None,
        });
        self.go(WorkflowStep::Confirming);
        Vec::new()
    }

    pub fn can_confirm(&self) -> bool {
        self.step == WorkflowStep::Confirming
            && self.confirmation.as_ref().is_some_and(|c| !c.is_in_flight())
    }

    pub fn confirm(&mut self) -> Vec<Command> {
        if !self.can_confirm() {
            return self.ignored("confirm");
        }
        let Some(confirmation) = self.confirmation.as_mut() else {
            return Vec::new();
        };
        let scope = CancellationScope::new();
        confirmation.in_flight = Some(scope.clone());
        confirmation.error = None;
        tracing::info!(
            "Assigning {} cases to {}",
            confirmation.batch.len(),
            confirmation.batch.assignee()
        );
        vec![Command::Assign {
            scope,
            batch: confirmation.batch.clone(),
        }]
    }

    /// Enter a new credential, then come back to the same confirmation
    pub fn reauthenticate(&mut self) -> Vec<Command> {
        if !self.can_confirm() {
            return self.ignored("reauthentication");
        }
        self.resume = Some(WorkflowStep::Confirming);
        self.go(WorkflowStep::AwaitingCredential);
        Vec::new()
    }

    pub fn finish(&mut self) -> Vec<Command> {
        if self.step != WorkflowStep::Result {
            return self.ignored("finish");
        }
        self.teardown_cases();
        self.teardown_assignees();
        self.confirmation = None;
        self.result = None;
        self.go(WorkflowStep::ModeSelection);
        Vec::new()
    }

    /// Cancel everything in flight and drop all step state
    pub fn close(&mut self) {
        self.teardown_cases();
        self.teardown_assignees();
        if let Some(scope) = self.confirmation.take().and_then(|c| c.in_flight) {
            scope.cancel();
        }
        self.result = None;
        self.resume = None;
        self.closed = true;
        tracing::info!("Workflow closed");
    }

    // === Async completions ===

    fn list_mut(&mut self, list: ListKind, scope: ScopeId) -> Option<&mut ListStep> {
        let step = match list {
            ListKind::Cases => self.cases.as_mut().map(|c| &mut c.list),
            ListKind::Assignees => self.assignees.as_mut(),
        };
        match step {
            Some(step) if step.scope.id() == scope => Some(step),
            _ => {
                tracing::debug!("Dropping stale {list:?} event from scope {scope}");
                None
            }
        }
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        if self.closed {
            return;
        }
        match event {
            EngineEvent::ListProgress {
                list,
                scope,
                loaded,
                total,
            } => {
                if let Some(step) = self.list_mut(list, scope) {
                    if step.is_loading() {
                        step.status = LoadStatus::Loading { loaded, total };
                    }
                }
            }
            EngineEvent::ListLoaded {
                list,
                scope,
                outcome,
            } => {
                let schema = match list {
                    ListKind::Cases => self.session.case_schema.clone(),
                    ListKind::Assignees => self.session.assignee_schema.clone(),
                };
                let viewport = self.viewport;
                let Some(step) = self.list_mut(list, scope) else {
                    return;
                };
                match outcome {
                    AggregationOutcome::Completed(state) => {
                        tracing::info!("{list:?} loaded: {} rows", state.rows.len());
                        step.table = Some(SelectionTable::new(schema, state.rows, viewport));
                        step.status = LoadStatus::Ready;
                    }
                    AggregationOutcome::Cancelled(state) => {
                        tracing::info!("{list:?} load cancelled after {} rows", state.rows.len());
                        step.table = Some(SelectionTable::new(schema, state.rows, viewport));
                        step.status = LoadStatus::Cancelled;
                    }
                    AggregationOutcome::Failed(err) => {
                        tracing::warn!("{list:?} load failed: {err}");
                        step.table = None;
                        step.status = LoadStatus::Failed(err);
                    }
                }
            }
            EngineEvent::AssignmentFinished { scope, result } => {
                let Some(confirmation) = self
                    .confirmation
                    .as_mut()
                    .filter(|c| c.in_flight.as_ref().is_some_and(|s| s.id() == scope))
                else {
                    tracing::debug!("Dropping stale assignment result from scope {scope}");
                    return;
                };
                confirmation.in_flight = None;
                match result {
                    AssignmentResult::Completed(outcome) => {
                        self.result = Some(ResultView {
                            assignee_label: confirmation.assignee_label.clone(),
                            requested: confirmation.batch.len(),
                            outcome,
                        });
                        self.go(WorkflowStep::Result);
                    }
                    AssignmentResult::TotalFailure(err) => {
                        confirmation.error = Some(err);
                    }
                    AssignmentResult::Cancelled => {}
                }
            }
        }
    }
}
