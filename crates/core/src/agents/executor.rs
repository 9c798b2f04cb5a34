//! Common CLI subprocess executor for agent providers.
//!
//! This module runs a coding-agent CLI to completion (or cancellation),
//! parses its newline-delimited JSON output and translates every record into
//! [`CanonicalEvent`]s through a backend-specific translator.
//!
//! The reader task and the consumer are connected by a bounded channel, so a
//! slow consumer applies backpressure to the child's stdout instead of
//! growing an unbounded queue.

use crate::agents::base::{single_event, EventStream, ProviderError};
use crate::agents::resolver::{merge_environment, CredentialSource, ExecutableResolver};
use fp_protocol::events::CanonicalEvent;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use uuid::Uuid;

/// Capacity of the channel between the stdout reader and the consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default quiet period after which a silent agent is reported.
pub const DEFAULT_LIVENESS: Duration = Duration::from_secs(30);

const MIN_LIVENESS: Duration = Duration::from_secs(1);

/// How long the output pipes may stay open once the child has exited.
///
/// A background descendant can inherit them and hold them open.
pub const OUTPUT_GRACE: Duration = Duration::from_secs(2);

const STDERR_CHUNK_BYTES: usize = 4096;

/// Translates one parsed output record. Must be pure and total.
pub type Translator = fn(&serde_json::Value) -> Option<CanonicalEvent>;

/// Static description of a CLI backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendSpec {
    /// Short name used in messages and logs (e.g. "codex").
    pub name: &'static str,
    /// Executable names looked up in `PATH`, in order.
    pub executables: &'static [&'static str],
    /// Environment variable that may point at the executable.
    pub path_override_var: &'static str,
    /// Variables filled from the credential source when not overridden.
    pub credential_vars: &'static [&'static str],
    pub translate: Translator,
}

/// One invocation of the backend.
#[derive(Debug, Clone)]
pub struct CliInvocation {
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
}

/// Handle on the currently running child of an executor.
struct LiveRun {
    id: Uuid,
    aborted: Arc<AtomicBool>,
    abort: Arc<Notify>,
}

struct ExecutorInner {
    backend: BackendSpec,
    resolver: Arc<dyn ExecutableResolver>,
    credentials: Arc<dyn CredentialSource>,
    liveness_ms: AtomicU64,
    executable: OnceLock<Option<PathBuf>>,
    live: Mutex<Option<LiveRun>>,
}

impl ExecutorInner {
    fn live(&self) -> MutexGuard<'_, Option<LiveRun>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn liveness(&self) -> Duration {
        Duration::from_millis(self.liveness_ms.load(Ordering::Relaxed))
    }

    /// Clear the live slot if it still belongs to `run_id`.
    fn release(&self, run_id: Uuid) {
        let mut live = self.live();
        if live.as_ref().is_some_and(|run| run.id == run_id) {
            *live = None;
        }
    }
}

/// Runs a coding-agent CLI and streams its output as canonical events.
///
/// Cloning is cheap; clones share the executable cache, the liveness
/// setting and the live-child slot, so at most one child runs per executor
/// across all clones.
#[derive(Clone)]
pub struct AgentProcessExecutor {
    inner: Arc<ExecutorInner>,
}

impl AgentProcessExecutor {
    pub fn new(
        backend: BackendSpec,
        resolver: Arc<dyn ExecutableResolver>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                backend,
                resolver,
                credentials,
                liveness_ms: AtomicU64::new(duration_ms(DEFAULT_LIVENESS)),
                executable: OnceLock::new(),
                live: Mutex::new(None),
            }),
        }
    }

    /// Builder form of [`set_liveness`](Self::set_liveness).
    pub fn with_liveness(self, liveness: Duration) -> Self {
        self.set_liveness(liveness);
        self
    }

    /// Set the quiet period that triggers a liveness warning.
    ///
    /// Shared by all clones; applies from the next run on. Clamped to at
    /// least one second.
    pub fn set_liveness(&self, liveness: Duration) {
        self.inner
            .liveness_ms
            .store(duration_ms(liveness.max(MIN_LIVENESS)), Ordering::Relaxed);
    }

    pub fn liveness(&self) -> Duration {
        self.inner.liveness()
    }

    pub fn backend(&self) -> &BackendSpec {
        &self.inner.backend
    }

    /// Resolve the backend executable. Resolved once, then cached.
    pub fn executable(&self) -> Option<PathBuf> {
        self.inner
            .executable
            .get_or_init(|| {
                let path = self.inner.resolver.resolve(&self.inner.backend);
                match &path {
                    Some(p) => tracing::debug!(backend = self.inner.backend.name, path = %p.display(), "resolved executable"),
                    None => tracing::warn!(backend = self.inner.backend.name, "executable not found"),
                }
                path
            })
            .clone()
    }

    /// Whether a child is currently running (or not yet reaped).
    pub fn is_running(&self) -> bool {
        self.inner.live().is_some()
    }

    /// Run the backend with the given invocation.
    ///
    /// Nothing is spawned until the stream is first polled. The stream ends
    /// only after the child has been reaped and the live slot released.
    pub fn run(&self, invocation: CliInvocation) -> EventStream {
        let inner = Arc::clone(&self.inner);
        let Some(program) = self.executable() else {
            return single_event(
                ProviderError::NotInstalled {
                    backend: inner.backend.name.to_string(),
                    override_var: inner.backend.path_override_var.to_string(),
                }
                .into(),
            );
        };

        let stream = async_stream::stream! {
            let (mut rx, aborted) = match start(&inner, program, invocation) {
                Ok(started) => started,
                Err(err) => {
                    yield CanonicalEvent::from(err);
                    return;
                }
            };

            while let Some(event) = rx.recv().await {
                // Drain without yielding until the reader lets go.
                if aborted.load(Ordering::SeqCst) {
                    continue;
                }
                yield event;
            }
        };

        Box::pin(stream)
    }

    /// Signal the live child to terminate.
    ///
    /// Already-yielded events remain valid; the stream ends without further
    /// events. The live slot stays taken until the child is reaped, so a run
    /// started in between is rejected. No-op when nothing is running.
    pub fn abort(&self) {
        let live = self.inner.live();
        if let Some(run) = live.as_ref() {
            tracing::info!(backend = self.inner.backend.name, run_id = %run.id, "aborting agent process");
            run.aborted.store(true, Ordering::SeqCst);
            run.abort.notify_one();
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Claim the live slot, spawn the child and start the reader task.
fn start(
    inner: &Arc<ExecutorInner>,
    program: PathBuf,
    invocation: CliInvocation,
) -> Result<(mpsc::Receiver<CanonicalEvent>, Arc<AtomicBool>), ProviderError> {
    let backend = inner.backend;
    let run_id = Uuid::new_v4();
    let aborted = Arc::new(AtomicBool::new(false));
    let abort = Arc::new(Notify::new());

    {
        let mut live = inner.live();
        if live.is_some() {
            return Err(ProviderError::AlreadyRunning(backend.name.to_string()));
        }
        *live = Some(LiveRun {
            id: run_id,
            aborted: Arc::clone(&aborted),
            abort: Arc::clone(&abort),
        });
    }

    let env = merge_environment(
        &invocation.env,
        backend.credential_vars,
        inner.credentials.as_ref(),
    );

    let mut cmd = Command::new(&program);
    cmd.args(&invocation.args);
    cmd.envs(&env);
    cmd.current_dir(&invocation.working_dir);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            inner.release(run_id);
            tracing::error!(backend = backend.name, error = %e, "failed to spawn agent");
            return Err(ProviderError::Spawn {
                backend: backend.name.to_string(),
                message: e.to_string(),
            });
        }
    };

    tracing::info!(
        backend = backend.name,
        run_id = %run_id,
        pid = child.id(),
        cwd = %invocation.working_dir.display(),
        "spawned agent process"
    );

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let task_inner = Arc::clone(inner);
    tokio::spawn(async move {
        drive(child, &tx, abort, &task_inner, run_id).await;
        task_inner.release(run_id);
        // The consumer sees the end of the stream only after the release.
        drop(tx);
    });

    Ok((rx, aborted))
}

/// Parse one stdout line into an event.
///
/// A line that is not a JSON object becomes a plain text event carrying the
/// line untouched. A JSON object the translator does not map yields `None`.
pub fn parse_line(line: &str, translate: Translator) -> Option<CanonicalEvent> {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) if value.is_object() => translate(&value),
        _ => Some(CanonicalEvent::assistant_text(line)),
    }
}

/// Decode one raw stdout line, dropping its terminator.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Map the exit of a finished run to its terminal event, if any.
pub fn exit_event(
    backend: &str,
    status: &ExitStatus,
    stderr: &str,
    saw_output: bool,
) -> Option<CanonicalEvent> {
    if !status.success() {
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return Some(CanonicalEvent::error(stderr));
        }
        let err = match status.code() {
            Some(code) => ProviderError::ExitCode {
                backend: backend.to_string(),
                code,
            },
            None => ProviderError::Signaled {
                backend: backend.to_string(),
            },
        };
        return Some(err.into());
    }

    if !saw_output {
        return Some(
            ProviderError::NoOutput {
                backend: backend.to_string(),
            }
            .into(),
        );
    }

    None
}

/// Read the child's stdout and wait for its exit concurrently.
///
/// Once the child has exited, stdout gets [`OUTPUT_GRACE`] to reach EOF and
/// stderr the same deadline; pipes still held open after that are dropped.
async fn drive(
    mut child: Child,
    tx: &mpsc::Sender<CanonicalEvent>,
    abort: Arc<Notify>,
    inner: &ExecutorInner,
    run_id: Uuid,
) {
    let backend = inner.backend;
    let quiet = inner.liveness();

    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(read_all(stderr, Arc::clone(&stderr_buf))));

    let mut stdout = child.stdout.take().map(BufReader::new);
    let mut line = Vec::new();
    let mut saw_output = false;
    let mut cancelled = false;
    let mut exit = None;

    let liveness = tokio::time::sleep(quiet);
    tokio::pin!(liveness);
    // Re-armed when the child exits; disabled until then.
    let grace = tokio::time::sleep(OUTPUT_GRACE);
    tokio::pin!(grace);

    loop {
        if exit.is_some() && stdout.is_none() {
            break;
        }

        tokio::select! {
            _ = abort.notified() => {
                cancelled = true;
                break;
            }
            _ = tx.closed() => {
                // Consumer went away: nobody will read the rest.
                cancelled = true;
                break;
            }
            status = child.wait(), if exit.is_none() => {
                grace.as_mut().reset(Instant::now() + OUTPUT_GRACE);
                exit = Some(status);
            }
            read = next_line(&mut stdout, &mut line) => {
                let eof = match read {
                    Ok(n) => n == 0,
                    Err(e) => {
                        // Dropping our end lets a writing child fail instead of block.
                        tracing::warn!(backend = backend.name, error = %e, "failed reading agent stdout, closing it");
                        true
                    }
                };

                if !line.is_empty() {
                    liveness.as_mut().reset(Instant::now() + quiet);
                    let text = decode_line(&line);
                    line.clear();
                    if !text.trim().is_empty() {
                        saw_output = true;
                        if let Some(event) = parse_line(&text, backend.translate) {
                            if tx.send(event).await.is_err() {
                                cancelled = true;
                                break;
                            }
                        }
                    }
                }

                if eof {
                    stdout = None;
                }
            }
            _ = &mut grace, if exit.is_some() => {
                tracing::debug!(backend = backend.name, run_id = %run_id, "stdout held open after exit, abandoning it");
                stdout = None;
            }
            _ = &mut liveness, if exit.is_none() => {
                tracing::warn!(
                    backend = backend.name,
                    run_id = %run_id,
                    quiet_secs = quiet.as_secs(),
                    "no output from agent, process may be hung"
                );
                liveness.as_mut().reset(Instant::now() + quiet);
            }
        }
    }

    if cancelled {
        if exit.is_none() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(backend = backend.name, error = %e, "agent already exited");
            }
            let _ = child.wait().await;
        }
        if let Some(task) = stderr_task {
            task.abort();
        }
        tracing::info!(backend = backend.name, run_id = %run_id, "agent process cancelled");
        return;
    }

    let (status, stderr_deadline) = match exit {
        Some(status) => (status, grace.deadline()),
        None => (child.wait().await, Instant::now() + OUTPUT_GRACE),
    };

    if let Some(task) = stderr_task {
        let handle = task.abort_handle();
        if tokio::time::timeout_at(stderr_deadline, task).await.is_err() {
            tracing::debug!(backend = backend.name, run_id = %run_id, "stderr held open after exit, abandoning it");
            handle.abort();
        }
    }
    let stderr = {
        let buf = stderr_buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    };

    let event = match status {
        Ok(status) => {
            tracing::info!(
                backend = backend.name,
                run_id = %run_id,
                code = status.code(),
                "agent process exited"
            );
            exit_event(backend.name, &status, &stderr, saw_output)
        }
        Err(e) => Some(CanonicalEvent::error(format!(
            "Failed waiting for {}: {e}",
            backend.name
        ))),
    };

    if let Some(event) = event {
        let _ = tx.send(event).await;
    }
}

/// Next raw line of stdout, or never once it is closed.
///
/// Partial data survives cancellation in `line`.
async fn next_line(
    stdout: &mut Option<BufReader<ChildStdout>>,
    line: &mut Vec<u8>,
) -> std::io::Result<usize> {
    match stdout {
        Some(reader) => reader.read_until(b'\n', line).await,
        None => std::future::pending().await,
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = [0u8; STDERR_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => sink
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::debug!(error = %e, "failed reading stderr");
                break;
            }
        }
    }
}
