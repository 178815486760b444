//! Shell execution engine
//!
//! Runs `Execute` commands as child processes (no shell interpolation) and
//! answers `Status`, `Version` and `Help` itself.
//!
//! ## Return Codes
//! - process exit code (low 8 bits, non-zero stays non-zero), or
//!   `128 + signal` when killed by a signal
//! - [`RC_TIMEOUT`]: the process, or a background process holding its
//!   output open, outlived the command timeout
//! - [`RC_NOT_FOUND`]: the program could not be spawned
//! - [`RC_NOT_EXECUTABLE`]: empty program name or an over-long argument

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use crate::config::Config;
use crate::protocol::{Action, CommandPacket, PacketLimits, ResponsePacket, RC_FAILURE, RC_SUCCESS};
use super::Executor;

/// Command ran longer than the configured timeout
pub const RC_TIMEOUT: u8 = 124;

/// Command was refused before spawning
pub const RC_NOT_EXECUTABLE: u8 = 126;

/// Program could not be started
pub const RC_NOT_FOUND: u8 = 127;

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Counters reported by the `Status` action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Commands handled, of any action
    pub executed: u64,

    /// Commands that returned a non-zero code
    pub failed: u64,
}

/// Executor backed by child processes
pub struct ShellEngine {
    limits: PacketLimits,
    timeout: Duration,
    started: Instant,
    stats: Mutex<EngineStats>,
}

impl ShellEngine {
    /// Create an engine for `limits` with a per-command timeout
    pub fn new(limits: PacketLimits, timeout: Duration) -> Self {
        Self {
            limits,
            timeout,
            started: Instant::now(),
            stats: Mutex::new(EngineStats::default()),
        }
    }

    /// Create an engine from the node configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.limits, Duration::from_millis(config.command_timeout_ms))
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> EngineStats {
        *self.stats.lock()
    }

    fn run_program(&self, command: &CommandPacket) -> (u8, String) {
        let program = command.command_name.as_str();
        if program.is_empty() {
            return (RC_NOT_EXECUTABLE, "no program given".to_string());
        }

        if let Some(arg) = command
            .arguments
            .iter()
            .find(|arg| arg.len() > self.limits.max_arg_len())
        {
            return (
                RC_NOT_EXECUTABLE,
                format!(
                    "argument of {} bytes exceeds limit of {}",
                    arg.len(),
                    self.limits.max_arg_len()
                ),
            );
        }

        let mut child = match Command::new(program)
            .args(&command.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!("Failed to spawn '{}': {}", program, e);
                return (RC_NOT_FOUND, format!("{}: {}", program, e));
            }
        };

        let deadline = Instant::now() + self.timeout;
        let capacity = self.limits.stdout_len();
        let stdout = child.stdout.take().map(|pipe| capture(pipe, capacity));
        let stderr = child.stderr.take().map(|pipe| capture(pipe, capacity));

        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => return self.timed_out(program),
            Err(e) => return (RC_FAILURE, format!("waiting for {} failed: {}", program, e)),
        };

        // A background grandchild can hold the pipes open after the child exits
        let (Some(stdout), Some(stderr)) = (collect(stdout, deadline), collect(stderr, deadline))
        else {
            return self.timed_out(program);
        };

        let output = if stdout.is_empty() { stderr } else { stdout };
        (exit_code(status), output)
    }

    fn timed_out(&self, program: &str) -> (u8, String) {
        tracing::warn!("'{}' timed out after {:?}", program, self.timeout);
        (
            RC_TIMEOUT,
            format!("{} timed out after {}ms", program, self.timeout.as_millis()),
        )
    }

    fn status(&self) -> String {
        let stats = self.stats();
        format!(
            "uptime {}s, executed {}, failed {}",
            self.started.elapsed().as_secs(),
            stats.executed,
            stats.failed
        )
    }

    fn version() -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), crate::VERSION)
    }

    fn help(topic: &str) -> (u8, String) {
        if topic.is_empty() {
            let text = Action::ALL
                .iter()
                .map(|action| usage(*action))
                .collect::<Vec<_>>()
                .join("\n");
            return (RC_SUCCESS, text);
        }

        match Action::from_name(topic) {
            Some(action) => (RC_SUCCESS, usage(action).to_string()),
            None => (RC_FAILURE, format!("unknown help topic: {}", topic)),
        }
    }
}

impl Executor for ShellEngine {
    fn execute(&self, command: &CommandPacket) -> ResponsePacket {
        let started = Instant::now();

        let (return_code, output) = match command.action {
            Action::Execute => self.run_program(command),
            Action::Status => (RC_SUCCESS, self.status()),
            Action::Version => (RC_SUCCESS, Self::version()),
            Action::Help => Self::help(&command.command_name),
        };

        let elapsed = started.elapsed().as_secs_f64();

        {
            let mut stats = self.stats.lock();
            stats.executed += 1;
            if return_code != RC_SUCCESS {
                stats.failed += 1;
            }
        }

        ResponsePacket::new(return_code, elapsed, output)
    }
}

impl std::fmt::Debug for ShellEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellEngine")
            .field("timeout", &self.timeout)
            .field("stats", &self.stats())
            .finish()
    }
}

fn usage(action: Action) -> &'static str {
    match action {
        Action::Execute => "execute <program> [args...]: run a program",
        Action::Status => "status: report uptime and command counters",
        Action::Version => "version: report software version",
        Action::Help => "help [action]: describe available actions",
    }
}

/// Read up to `capacity` bytes from a pipe, then drain the rest so the
/// child never blocks on a full pipe. The captured bytes are sent once the
/// pipe closes.
fn capture<R: Read + Send + 'static>(pipe: R, capacity: usize) -> Receiver<Vec<u8>> {
    let (tx, rx) = channel::bounded(1);
    thread::spawn(move || {
        let mut captured = Vec::with_capacity(capacity);
        let mut limited = pipe.take(capacity as u64);
        if let Err(e) = limited.read_to_end(&mut captured) {
            tracing::debug!("Failed to read child output: {}", e);
        }
        if let Err(e) = io::copy(&mut limited.into_inner(), &mut io::sink()) {
            tracing::debug!("Failed to drain child output: {}", e);
        }
        // The engine stops listening once the command deadline has passed
        let _ = tx.send(captured);
    });
    rx
}

/// Captured output, or `None` if the pipe was still open at `deadline`
fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };

    match reader.recv_deadline(deadline) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

/// Wait for the child; `Ok(None)` means it was killed at `deadline`.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Map a process exit code onto the one-byte return code
///
/// Codes wider than a byte keep their low 8 bits, except that a non-zero
/// code never becomes success.
pub fn return_code_for_exit(code: i32) -> u8 {
    match code as u8 {
        RC_SUCCESS if code != 0 => RC_FAILURE,
        rc => rc,
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> u8 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => return_code_for_exit(code),
        (None, Some(signal)) => return_code_for_exit(128 + signal),
        (None, None) => RC_FAILURE,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> u8 {
    status.code().map(return_code_for_exit).unwrap_or(RC_FAILURE)
}
