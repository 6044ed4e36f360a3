pub mod task_view;
pub mod widget;

pub use task_view::TaskDisplayItem;
pub use task_view::TaskDisplayStatus;
pub use task_view::format_agent_tree;
pub use task_view::format_task_checklist;
pub use widget::DisplayLine;
pub use widget::DisplayLineKind;
pub use widget::RpcLifecycleState;
pub use widget::TeammateSnapshot;
pub use widget::project;
