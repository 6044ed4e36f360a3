pub mod config;
pub mod logging;
pub mod slash;

pub use config::TeamctlEnv;
pub use logging::{LoggingGuard, init_tracing};
pub use slash::{SlashCommand, SlashError, parse_slash};
