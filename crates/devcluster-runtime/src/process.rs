//! Streaming child-process execution with cancellation.
//!
//! Output is pumped into caller-supplied sinks on two scoped threads while the
//! calling thread polls the child and the `Context`. On unix the child leads its
//! own process group so that cancellation also reaches anything it spawned
//! (kind shells out to the container runtime).

use crate::context::{Context, Done};
use crate::RuntimeError;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `cmd` to completion, streaming its stdout and stderr into the sinks.
///
/// Fails with `Spawn` if the program cannot be started, `CommandFailed` on a
/// non-zero exit, and `Cancelled`/`DeadlineExceeded` if `ctx` finishes first,
/// in which case the child has already been killed and reaped. `ctx` is
/// honoured until both output streams close, not only until the child exits.
pub fn run_streaming(
    ctx: &Context,
    mut cmd: Command,
    stdout: &mut (dyn Write + Send),
    stderr: &mut (dyn Write + Send),
) -> Result<(), RuntimeError> {
    let command = describe(&cmd);
    if let Some(done) = ctx.done() {
        return Err(done_error(done, command));
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| RuntimeError::Spawn {
        program: cmd.get_program().to_string_lossy().into_owned(),
        source,
    })?;
    let child_out = child.stdout.take();
    let child_err = child.stderr.take();

    let (waited, out_res, err_res) = thread::scope(|s| {
        let out_pump = s.spawn(move || pump_stdout(child_out, stdout));
        let err_pump = s.spawn(move || pump_stderr(child_err, stderr));
        let waited = match wait_or_kill(ctx, &mut child) {
            Ok(Ok(status)) => Ok(drain_or_kill(ctx, &mut child, [&out_pump, &err_pump])
                .map_or(Ok(status), Err)),
            other => other,
        };
        (waited, join_pump(out_pump), join_pump(err_pump))
    });

    let outcome = waited?;
    if let Err(e) = out_res.and(err_res) {
        warn!("output of '{command}' was not fully delivered: {e}");
    }

    match outcome {
        Ok(status) if status.success() => {
            debug!("'{command}' completed");
            Ok(())
        }
        Ok(status) => Err(RuntimeError::CommandFailed { command, status }),
        Err(done) => Err(done_error(done, command)),
    }
}

fn wait_or_kill(ctx: &Context, child: &mut Child) -> io::Result<Result<ExitStatus, Done>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Ok(status)),
            Ok(None) => {}
            Err(e) => {
                kill(child);
                let _ = child.wait();
                return Err(e);
            }
        }
        if let Some(done) = ctx.done() {
            debug!("context done ({done:?}), killing pid {}", child.id());
            kill(child);
            child.wait()?;
            return Ok(Err(done));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Wait for the pumps to hit EOF after the child has exited. Descendants that
/// inherited stdout or stderr keep the pipes open; if `ctx` finishes first the
/// group is killed so the pumps can return.
fn drain_or_kill(
    ctx: &Context,
    child: &mut Child,
    pumps: [&thread::ScopedJoinHandle<'_, io::Result<()>>; 2],
) -> Option<Done> {
    while !pumps.iter().all(|p| p.is_finished()) {
        if let Some(done) = ctx.done() {
            debug!(
                "context done ({done:?}) with output still open, killing group {}",
                child.id()
            );
            kill(child);
            return Some(done);
        }
        thread::sleep(POLL_INTERVAL);
    }
    None
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn kill(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) with a negative pid signals the process group the
        // child leads, which outlives the child while any member is alive.
        // It has no memory-safety preconditions.
        if unsafe { libc::kill(-pid, libc::SIGKILL) } == 0 {
            return;
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill(child: &mut Child) {
    let _ = child.kill();
}

fn pump_stdout(src: Option<ChildStdout>, sink: &mut (dyn Write + Send)) -> io::Result<()> {
    match src {
        Some(mut s) => pump(&mut s, sink),
        None => Ok(()),
    }
}

fn pump_stderr(src: Option<ChildStderr>, sink: &mut (dyn Write + Send)) -> io::Result<()> {
    match src {
        Some(mut s) => pump(&mut s, sink),
        None => Ok(()),
    }
}

/// Copy until EOF. A failing sink does not stop the read side, otherwise the
/// child could block on a full pipe.
fn pump(src: &mut dyn Read, sink: &mut (dyn Write + Send)) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    let mut sink_err = None;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if sink_err.is_none() {
            if let Err(e) = sink.write_all(&buf[..n]) {
                sink_err = Some(e);
            }
        }
    }
    match sink_err {
        Some(e) => Err(e),
        None => sink.flush(),
    }
}

fn join_pump(handle: thread::ScopedJoinHandle<'_, io::Result<()>>) -> io::Result<()> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output pump panicked")))
}

fn done_error(done: Done, command: String) -> RuntimeError {
    match done {
        Done::Cancelled => RuntimeError::Cancelled { command },
        Done::DeadlineExceeded => RuntimeError::DeadlineExceeded { command },
    }
}

/// Program and arguments joined by spaces, for logs and errors.
pub(crate) fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
