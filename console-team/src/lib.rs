pub mod assignment;
pub mod delegation;
pub mod error;
pub mod state;
pub mod tool_specs;
pub mod types;

pub use assignment::{AssignmentStrategy, TaskAssigner};
pub use delegation::{
    DelegateMode, DelegatePolicy, PlanApprovalState, PlanStatus, PlanSubmission,
};
pub use error::{Classify, ErrorKind, Result, TeamError};
pub use state::{TaskStore, TeamConfigStore};
pub use tool_specs::all_team_tool_specs;
pub use types::*;
