//! The per-agent process supervisor.
//!
//! Owns the child process running the external LLM CLI: pipes its stdio,
//! parses newline-delimited JSON from stdout into events, watches for
//! stalls, and exposes send/pause/resume/shutdown. The child runs in its
//! own process group so job-control and termination signals reach the
//! whole tree.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use swarm_events::{AgentEvent, EventKind, FanoutHub};
use swarm_guardrails::STALL_TIMEOUT;

use crate::errors::RuntimeError;
use crate::supervisor::protocol::ChildRequest;
use crate::supervisor::status::AgentStatus;
use crate::types::AgentRecord;

/// How the child CLI is launched and supervised.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Executable to spawn.
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory (the agent's workspace).
    pub workspace_dir: PathBuf,
    /// No output for this long while running marks the agent stalled.
    pub stall_timeout: Duration,
    /// Grace between SIGTERM and SIGKILL on shutdown.
    pub term_grace: Duration,
}

impl SupervisorConfig {
    /// Config for the given CLI command and workspace, with default
    /// stall/termination timing.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, workspace_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            workspace_dir,
            stall_timeout: STALL_TIMEOUT,
            term_grace: Duration::from_secs(2),
        }
    }
}

/// Supervises one agent's child process.
pub struct Supervisor {
    agent_id: String,
    record: Arc<Mutex<AgentRecord>>,
    hub: Arc<FanoutHub>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    pgid: Mutex<Option<Pid>>,
    last_output: Arc<Mutex<Instant>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Supervisor {
    /// Spawn the child and start the reader, exit-watcher, and watchdog
    /// tasks. The agent's hub channel must already be registered.
    pub fn spawn(
        config: &SupervisorConfig,
        agent_id: String,
        record: Arc<Mutex<AgentRecord>>,
        hub: Arc<FanoutHub>,
    ) -> Result<Self, RuntimeError> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .current_dir(&config.workspace_dir)
            .process_group(0)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::Spawn(format!("{}: {e}", config.program)))?;

        #[allow(clippy::cast_possible_wrap)]
        let pgid = child.id().map(|pid| Pid::from_raw(pid as i32));
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Spawn("could not capture stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RuntimeError::Spawn("could not capture stderr".into()))?;

        let supervisor = Self {
            agent_id: agent_id.clone(),
            record,
            hub,
            stdin: tokio::sync::Mutex::new(stdin),
            pgid: Mutex::new(pgid),
            last_output: Arc::new(Mutex::new(Instant::now())),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        };

        info!(agent_id, program = %config.program, pid = ?child.id(), "agent process spawned");

        let mut tasks = Vec::new();
        tasks.push(supervisor.spawn_stdout_reader(stdout));
        tasks.push(supervisor.spawn_stderr_reader(stderr));
        tasks.push(supervisor.spawn_exit_watcher(child, config.term_grace));
        tasks.push(supervisor.spawn_watchdog(config.stall_timeout));
        *supervisor.tasks.lock() = tasks;

        Ok(supervisor)
    }

    // ── Prompting ──────────────────────────────────────────────────────

    /// Send a prompt to the child. At most one turn is in flight per
    /// agent: sending while a turn is running interrupts the current task,
    /// then issues the new prompt.
    pub async fn send(
        &self,
        prompt: &str,
        max_turns: Option<u32>,
        session_id: Option<String>,
    ) -> Result<(), RuntimeError> {
        let interrupt_first = {
            let record = self.record.lock();
            if !record.status.can_send() {
                return Err(RuntimeError::Validation(format!(
                    "agent cannot accept a prompt while {}",
                    serde_json::to_string(&record.status)
                        .unwrap_or_default()
                        .trim_matches('"')
                )));
            }
            record.status == AgentStatus::Running
        };

        let mut stdin = self.stdin.lock().await;
        let Some(pipe) = stdin.as_mut() else {
            return Err(RuntimeError::Validation(
                "agent process is not accepting input".into(),
            ));
        };

        if interrupt_first {
            debug!(agent_id = %self.agent_id, "interrupting in-flight turn");
            let line = ChildRequest::Interrupt
                .to_line()
                .map_err(|e| RuntimeError::Validation(e.to_string()))?;
            pipe.write_all(line.as_bytes()).await?;
        }

        let request = ChildRequest::Prompt {
            prompt: prompt.to_owned(),
            max_turns,
            session_id,
        };
        let line = request
            .to_line()
            .map_err(|e| RuntimeError::Validation(e.to_string()))?;
        pipe.write_all(line.as_bytes()).await?;
        pipe.flush().await?;
        drop(stdin);

        let mut prompt_event = AgentEvent::new(EventKind::UserPrompt);
        let _ = prompt_event
            .fields
            .insert("prompt".into(), serde_json::Value::String(prompt.to_owned()));
        let _ = self.hub.publish(&self.agent_id, &prompt_event);

        {
            let mut record = self.record.lock();
            if matches!(record.status, AgentStatus::Idle | AgentStatus::Stalled) {
                record.status = AgentStatus::Running;
            }
        }
        // A fresh prompt resets the stall clock.
        *self.last_output.lock() = Instant::now();
        Ok(())
    }

    // ── Job control ────────────────────────────────────────────────────

    /// Deliver a job-control stop to the process group. Legal from
    /// running/idle/stalled with a live child; returns `false` otherwise.
    pub fn pause(&self) -> bool {
        if !self.record.lock().status.can_pause() {
            return false;
        }
        let Some(pgid) = *self.pgid.lock() else {
            return false;
        };
        if let Err(error) = killpg(pgid, Signal::SIGSTOP) {
            warn!(agent_id = %self.agent_id, %error, "pause signal failed");
            return false;
        }
        self.record.lock().status = AgentStatus::Paused;
        debug!(agent_id = %self.agent_id, "agent paused");
        true
    }

    /// Deliver a job-control continue. Legal only from paused.
    pub fn resume(&self) -> bool {
        if self.record.lock().status != AgentStatus::Paused {
            return false;
        }
        let Some(pgid) = *self.pgid.lock() else {
            return false;
        };
        if let Err(error) = killpg(pgid, Signal::SIGCONT) {
            warn!(agent_id = %self.agent_id, %error, "resume signal failed");
            return false;
        }
        {
            let mut record = self.record.lock();
            record.status = AgentStatus::Running;
        }
        *self.last_output.lock() = Instant::now();
        debug!(agent_id = %self.agent_id, "agent resumed");
        true
    }

    // ── Teardown ───────────────────────────────────────────────────────

    /// Terminate the child (SIGCONT in case it is stopped, then SIGTERM;
    /// the exit watcher escalates to SIGKILL after the grace period) and
    /// wait for supervision tasks to finish.
    pub async fn shutdown(&self) {
        // Cancel first so the exit watcher treats the coming death as
        // intentional rather than an abnormal exit.
        self.cancel.cancel();
        if let Some(pgid) = *self.pgid.lock() {
            let _ = killpg(pgid, Signal::SIGCONT);
            let _ = killpg(pgid, Signal::SIGTERM);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        *self.stdin.lock().await = None;
        self.record.lock().status = AgentStatus::Destroyed;
        debug!(agent_id = %self.agent_id, "supervisor shut down");
    }

    // ── Internal tasks ─────────────────────────────────────────────────

    fn spawn_stdout_reader(&self, stdout: tokio::process::ChildStdout) -> JoinHandle<()> {
        let agent_id = self.agent_id.clone();
        let record = Arc::clone(&self.record);
        let hub = Arc::clone(&self.hub);
        let last_output = Arc::clone(&self.last_output);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let event = AgentEvent::parse_line(&line);
                *last_output.lock() = Instant::now();
                apply_event_transitions(&record, &event);
                let _ = hub.publish(&agent_id, &event);
                // Turn completion is marked with a synthetic terminal event
                // so stream consumers can close without watching statuses.
                if event.kind == EventKind::Result {
                    let _ = hub.publish(&agent_id, &AgentEvent::done(None));
                }
            }
            debug!(agent_id, "stdout closed");
        })
    }

    fn spawn_stderr_reader(&self, stderr: tokio::process::ChildStderr) -> JoinHandle<()> {
        let agent_id = self.agent_id.clone();
        let hub = Arc::clone(&self.hub);
        let last_output = Arc::clone(&self.last_output);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                *last_output.lock() = Instant::now();
                let _ = hub.publish(&agent_id, &AgentEvent::stderr(line));
            }
        })
    }

    fn spawn_exit_watcher(&self, mut child: Child, term_grace: Duration) -> JoinHandle<()> {
        let agent_id = self.agent_id.clone();
        let record = Arc::clone(&self.record);
        let hub = Arc::clone(&self.hub);
        let pgid = *self.pgid.lock();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    if cancel.is_cancelled() {
                        debug!(agent_id, "agent process ended during shutdown");
                        return;
                    }
                    let code = status.ok().and_then(|s| s.code());
                    match code {
                        Some(0) => {
                            info!(agent_id, "agent process exited cleanly");
                            let _ = hub.publish(&agent_id, &AgentEvent::done(Some(0)));
                        }
                        code => {
                            warn!(agent_id, ?code, "agent process exited abnormally");
                            record.lock().status = AgentStatus::Error;
                            let _ = hub.publish(
                                &agent_id,
                                &AgentEvent::system(
                                    "process_error",
                                    format!("agent process exited with code {code:?}"),
                                ),
                            );
                            let _ = hub.publish(&agent_id, &AgentEvent::done(code));
                        }
                    }
                }
                () = cancel.cancelled() => {
                    // shutdown() already delivered SIGTERM to the group.
                    match tokio::time::timeout(term_grace, child.wait()).await {
                        Ok(_) => debug!(agent_id, "agent process terminated within grace"),
                        Err(_) => {
                            warn!(agent_id, "agent process ignored SIGTERM, killing");
                            if let Some(pgid) = pgid {
                                let _ = killpg(pgid, Signal::SIGKILL);
                            }
                            let _ = child.wait().await;
                        }
                    }
                }
            }
        })
    }

    fn spawn_watchdog(&self, stall_timeout: Duration) -> JoinHandle<()> {
        let agent_id = self.agent_id.clone();
        let record = Arc::clone(&self.record);
        let hub = Arc::clone(&self.hub);
        let last_output = Arc::clone(&self.last_output);
        let cancel = self.cancel.clone();
        let check_period = (stall_timeout / 4).max(Duration::from_millis(50));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = cancel.cancelled() => break,
                }
                let idle_for = last_output.lock().elapsed();
                if idle_for < stall_timeout {
                    continue;
                }
                let stalled = {
                    let mut record = record.lock();
                    if record.status == AgentStatus::Running {
                        record.status = AgentStatus::Stalled;
                        true
                    } else {
                        false
                    }
                };
                if stalled {
                    warn!(agent_id, idle_secs = idle_for.as_secs(), "agent stalled");
                    let _ = hub.publish(
                        &agent_id,
                        &AgentEvent::system(
                            "watchdog",
                            format!("no output for {}s, marking stalled", idle_for.as_secs()),
                        ),
                    );
                }
            }
        })
    }
}

/// Fold a child event into the agent record: status transitions, token
/// usage, and the child CLI session ID.
fn apply_event_transitions(record: &Arc<Mutex<AgentRecord>>, event: &AgentEvent) {
    let mut record = record.lock();

    // Any output wakes a starting or stalled agent.
    if matches!(record.status, AgentStatus::Starting | AgentStatus::Stalled) {
        record.status = AgentStatus::Running;
    }

    if event.kind == EventKind::Result {
        record.status = AgentStatus::Idle;
        let tokens_in = event.u64_field("tokensIn").unwrap_or(0);
        let tokens_out = event.u64_field("tokensOut").unwrap_or(0);
        if tokens_in > 0 || tokens_out > 0 {
            let model = record.model.clone();
            record.usage.fold(&model, tokens_in, tokens_out);
        }
    }

    if let Some(session_id) = event.str_field("sessionId") {
        record.cli_session_id = Some(session_id.to_owned());
    }
}
