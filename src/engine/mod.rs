//! Case-dispatch workflow engine
//!
//! Pure state and async orchestration, free of terminal and HTTP concerns:
//! paginated aggregation, the selection table, assignment classification
//! and the wizard state machine that ties them together.

mod aggregator;
mod assignment;
mod cancel;
mod export;
mod query;
mod row;
mod session;
mod table;
mod workflow;

pub use aggregator::aggregate;
pub use assignment::{AssigneeId, AssignmentService};
pub use cancel::CancellationScope;
pub use export::export_to_dir;
pub use query::{FilterState, RANGE_END_SUFFIX, RANGE_START_SUFFIX};
pub use row::{FieldKind, FieldSpec, Row, RowKey, RowSchema};
pub use session::SessionContext;
pub use table::SelectionTable;
#[cfg(test)]
pub use table::Viewport;
pub use workflow::{
    Command, EngineEvent, ListKind, ListMode, ListStep, LoadStatus, WorkflowEngine, WorkflowStep,
};
