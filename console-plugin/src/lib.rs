pub mod hook;

pub use hook::HookEvent;
pub use hook::HookResult;
pub use hook::HookSpec;
pub use hook::TaskHookContext;
pub use hook::run_hook;
