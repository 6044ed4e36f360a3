//! One teammate's live RPC connection (§4.G): a child process speaking the
//! NDJSON line protocol over its own stdio. Owns the process handle, the
//! lifecycle state machine, and the in-flight request table; callers never
//! see the underlying `tokio::process::Child`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex as AsyncMutex, broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, RpcError};
use crate::protocol::{InboundLine, RequestLine, RpcCommand, parse_inbound_line};

/// How long a freshly spawned teammate is given to finish booting before
/// it's considered `idle` (§4.G).
const BOOT_DELAY: Duration = Duration::from_millis(120);
/// §4.G: a request with no matching response after this long times out.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// §4.G: grace period between SIGTERM and SIGKILL on `stop`.
const STOP_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcState {
    Starting,
    Idle,
    Streaming,
    Stopped,
    Error,
}

impl RpcState {
    fn is_terminal(self) -> bool {
        matches!(self, RpcState::Stopped | RpcState::Error)
    }
}

/// What the teammate process should be launched with.
#[derive(Debug, Clone)]
pub struct StartOpts {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

/// Emitted on `subscribe_close` once the child process exits.
#[derive(Debug, Clone)]
pub struct CloseInfo {
    pub exit_code: Option<i32>,
    pub state: RpcState,
}

pub use crate::protocol::RpcEvent;

type PendingTable = HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>;

struct Shared {
    state: std::sync::Mutex<RpcState>,
    last_assistant_text: std::sync::Mutex<String>,
    last_error: std::sync::Mutex<Option<String>>,
    pid: std::sync::Mutex<Option<u32>>,
    next_id: AtomicU64,
    pending: std::sync::Mutex<PendingTable>,
    stdin: AsyncMutex<Option<tokio::process::ChildStdin>>,
    events_tx: broadcast::Sender<RpcEvent>,
    close_tx: broadcast::Sender<CloseInfo>,
    cancel: CancellationToken,
}

impl Shared {
    fn set_state(&self, new_state: RpcState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = new_state;
        }
    }

    fn state(&self) -> RpcState {
        self.state.lock().map(|g| *g).unwrap_or(RpcState::Error)
    }

    fn fail_all_pending(&self, message: &str) {
        let mut pending = match self.pending.lock() {
            Ok(p) => p,
            Err(_) => return,
        };
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(message.to_string()));
        }
    }
}

/// A single live teammate connection. Dropping this does not kill the
/// child process; call [`TeammateRpc::stop`] explicitly.
pub struct TeammateRpc {
    shared: Arc<Shared>,
}

impl TeammateRpc {
    /// Spawns the teammate process and begins servicing its stdio. Returns
    /// once the process has been launched; the §4.G boot delay runs in the
    /// background and flips the state from `starting` to `idle`.
    pub async fn start(opts: StartOpts) -> Result<Self> {
        let mut command = Command::new(&opts.program);
        command
            .args(&opts.args)
            .current_dir(&opts.cwd)
            .envs(&opts.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child: Child = command.spawn().map_err(RpcError::Io)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let pid = child.id();

        let (events_tx, _) = broadcast::channel(256);
        let (close_tx, _) = broadcast::channel(16);

        let shared = Arc::new(Shared {
            state: std::sync::Mutex::new(RpcState::Starting),
            last_assistant_text: std::sync::Mutex::new(String::new()),
            last_error: std::sync::Mutex::new(None),
            pid: std::sync::Mutex::new(pid),
            next_id: AtomicU64::new(1),
            pending: std::sync::Mutex::new(HashMap::new()),
            stdin: AsyncMutex::new(stdin),
            events_tx,
            close_tx,
            cancel: CancellationToken::new(),
        });

        if let Some(stdout) = stdout {
            tokio::spawn(read_stdout(shared.clone(), stdout));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(drain_stderr(stderr));
        }
        tokio::spawn(wait_for_exit(shared.clone(), child));
        tokio::spawn(finish_boot(shared.clone()));

        Ok(Self { shared })
    }

    pub fn state(&self) -> RpcState {
        self.shared.state()
    }

    pub fn last_assistant_text(&self) -> String {
        self.shared
            .last_assistant_text
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().ok().and_then(|g| g.clone())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RpcEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Dropping the returned receiver is how a caller unsubscribes.
    pub fn subscribe_close(&self) -> broadcast::Receiver<CloseInfo> {
        self.shared.close_tx.subscribe()
    }

    /// Sends one command and waits up to §4.G's 60s for its response.
    pub async fn send(&self, command: RpcCommand) -> Result<Value> {
        if self.shared.state().is_terminal() {
            return Err(RpcError::ProcessExit);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.shared.pending.lock() {
            pending.insert(id, tx);
        }

        let line = serde_json::to_string(&RequestLine { id, command })
            .map_err(|e| RpcError::CommandFailed(e.to_string()))?;

        {
            let mut guard = self.shared.stdin.lock().await;
            match guard.as_mut() {
                Some(stdin) => {
                    if let Err(e) = stdin.write_all(line.as_bytes()).await {
                        self.forget_pending(id);
                        return Err(RpcError::Io(e));
                    }
                    if let Err(e) = stdin.write_all(b"\n").await {
                        self.forget_pending(id);
                        return Err(RpcError::Io(e));
                    }
                    if let Err(e) = stdin.flush().await {
                        self.forget_pending(id);
                        return Err(RpcError::Io(e));
                    }
                }
                None => {
                    self.forget_pending(id);
                    return Err(RpcError::ProcessExit);
                }
            }
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(Ok(data))) => Ok(data),
            Ok(Ok(Err(message))) => Err(RpcError::CommandFailed(message)),
            Ok(Err(_)) => Err(RpcError::ProcessExit),
            Err(_) => {
                self.forget_pending(id);
                Err(RpcError::Timeout(REQUEST_TIMEOUT))
            }
        }
    }

    fn forget_pending(&self, id: u64) {
        if let Ok(mut pending) = self.shared.pending.lock() {
            pending.remove(&id);
        }
    }

    /// Best-effort abort, then SIGTERM, then SIGKILL after a 1s grace
    /// period (§4.G). Idempotent: calling `stop` on an already-stopped
    /// teammate is a no-op.
    pub async fn stop(&self) {
        if self.shared.state().is_terminal() {
            return;
        }

        let _ = tokio::time::timeout(Duration::from_secs(2), self.send(RpcCommand::Abort)).await;

        let Some(pid) = self.shared.pid.lock().ok().and_then(|g| *g) else {
            self.shared.cancel.cancel();
            return;
        };

        // SAFETY: `pid` is this teammate's own child process id; signal 0
        // checks have already validated it elsewhere for staleness
        // purposes, but here we send the real signal unconditionally.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }

        let deadline = tokio::time::Instant::now() + STOP_GRACE;
        while tokio::time::Instant::now() < deadline {
            if self.shared.state().is_terminal() {
                self.shared.cancel.cancel();
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        if !self.shared.state().is_terminal() {
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGKILL);
            }
        }
        self.shared.cancel.cancel();
    }
}

async fn finish_boot(shared: Arc<Shared>) {
    tokio::time::sleep(BOOT_DELAY).await;
    if shared.state() == RpcState::Starting {
        shared.set_state(RpcState::Idle);
    }
}

async fn read_stdout(shared: Arc<Shared>, stdout: tokio::process::ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let next = lines.next_line().await;
        match next {
            Ok(Some(line)) => dispatch_line(&shared, &line),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "teammate stdout read failed");
                break;
            }
        }
    }
}

fn dispatch_line(shared: &Arc<Shared>, line: &str) {
    match parse_inbound_line(line) {
        Some(InboundLine::Response(response)) => {
            let sender = shared
                .pending
                .lock()
                .ok()
                .and_then(|mut p| p.remove(&response.id));
            if let Some(sender) = sender {
                let resolved = if response.success {
                    Ok(response.data.unwrap_or(Value::Null))
                } else {
                    Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
                };
                let _ = sender.send(resolved);
            }
        }
        Some(InboundLine::Event(event)) => {
            match event.event_type.as_str() {
                "agent_start" => {
                    shared.set_state(RpcState::Streaming);
                    if let Ok(mut text) = shared.last_assistant_text.lock() {
                        text.clear();
                    }
                }
                "agent_end" => shared.set_state(RpcState::Idle),
                "message_update" => {
                    if let Some(delta) = event.text_delta() {
                        if let Ok(mut text) = shared.last_assistant_text.lock() {
                            text.push_str(delta);
                        }
                    }
                }
                _ => {}
            }
            let _ = shared.events_tx.send(event);
        }
        None => debug!(%line, "discarding unrecognized rpc line"),
    }
}

async fn drain_stderr(stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(%line, "teammate stderr");
    }
}

async fn wait_for_exit(shared: Arc<Shared>, mut child: Child) {
    let status = child.wait().await;
    let exit_code = status.as_ref().ok().and_then(|s| s.code());
    let success = status.map(|s| s.success()).unwrap_or(false);

    let final_state = if success {
        RpcState::Stopped
    } else {
        RpcState::Error
    };
    shared.set_state(final_state);
    if !success {
        if let Ok(mut err) = shared.last_error.lock() {
            *err = Some(format!("teammate process exited with code {exit_code:?}"));
        }
    }
    if let Ok(mut stdin) = shared.stdin.try_lock() {
        *stdin = None;
    }
    shared.fail_all_pending("teammate process exited");
    let _ = shared.close_tx.send(CloseInfo {
        exit_code,
        state: final_state,
    });
}
