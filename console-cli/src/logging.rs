//! Installs the `tracing` stack: a stderr `fmt` layer always, plus a
//! rolling file writer under `<rootDir>/_logs/` when running as leader
//! (workers are expected to log through their own harness, not teamctl's).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::TeamctlEnv;

/// Holds the non-blocking writer alive for the process lifetime; dropping
/// it stops flushing the rolling log file.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init_tracing(env: &TeamctlEnv) -> LoggingGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if env.is_leader() {
        let log_dir = env.root_dir.join("_logs");
        let _ = std::fs::create_dir_all(&log_dir);
        let appender = tracing_appender::rolling::daily(&log_dir, "teamctl.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
        LoggingGuard { _file_guard: Some(file_guard) }
    } else {
        tracing_subscriber::registry().with(env_filter).with(stderr_layer).init();
        LoggingGuard { _file_guard: None }
    }
}
