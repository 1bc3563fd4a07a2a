//! Supervised execution of engine subprocesses.
//!
//! The engine can run for minutes, so [`run`] never blocks on the child
//! without also watching the caller's [`Interrupt`]. On cancellation or
//! deadline the whole process group is killed (providers spawned by the
//! engine included) before the error is returned.

use crate::error::{Error, Result};
use crate::types::{CommandOutput, Phase};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why an in-flight invocation must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The caller cancelled
    Cancelled,
    /// The caller's deadline passed
    DeadlineExceeded,
}

/// Source of cancellation for engine invocations.
///
/// Implement this to bridge whatever cancellable context the caller uses.
pub trait Interrupt: Send + Sync {
    /// Return `Some` once the invocation should be aborted.
    fn check(&self) -> Option<Interruption>;
}

/// Interrupt that never fires.
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    fn check(&self) -> Option<Interruption> {
        None
    }
}

/// Run a prepared command to completion, or until interrupted.
///
/// Stdout and stderr are captured. A non-zero exit is *not* an error here;
/// callers interpret exit codes per subcommand.
pub fn run(phase: Phase, mut command: Command, interrupt: &dyn Interrupt) -> Result<CommandOutput> {
    if let Some(reason) = interrupt.check() {
        return Err(interrupted(phase, reason, Duration::ZERO));
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let program = command.get_program().to_string_lossy().into_owned();
    log::debug!("{} {}: spawning {}", phase, describe_dir(&command), program);

    let start = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|source| Error::Spawn { program, source })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    loop {
        if let Some(status) = child.try_wait()? {
            let output = CommandOutput {
                stdout: collect(stdout),
                stderr: collect(stderr),
                code: status.code(),
            };
            log::debug!(
                "{} finished in {:?} with exit code {:?}",
                phase,
                start.elapsed(),
                output.code
            );
            return Ok(output);
        }

        if let Some(reason) = interrupt.check() {
            log::warn!("{} interrupted ({:?}), killing engine process group", phase, reason);
            terminate(&mut child);
            collect(stdout);
            collect(stderr);
            return Err(interrupted(phase, reason, start.elapsed()));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn interrupted(phase: Phase, reason: Interruption, elapsed: Duration) -> Error {
    match reason {
        Interruption::Cancelled => Error::Cancelled { phase },
        Interruption::DeadlineExceeded => Error::Timeout { phase, elapsed },
    }
}

fn describe_dir(command: &Command) -> String {
    command
        .get_current_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Kill the child's process group, then the child itself, and reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group was created by
        // `process_group(0)` at spawn, so its id equals the child's pid.
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc != 0 {
            log::debug!("killpg({}) failed: {}", pgid, std::io::Error::last_os_error());
        }
    }

    if let Err(e) = child.kill() {
        log::debug!("kill({}) failed: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        log::debug!("reaping engine process {} failed: {}", child.id(), e);
    }
}
