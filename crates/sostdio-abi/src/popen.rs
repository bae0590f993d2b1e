//! Process-pipe streams.
//!
//! [`spawn`] starts a program with one of its standard descriptors wired to
//! a pipe and returns the parent's end as an ordinary stream. [`reap`]
//! closes that stream and waits for the child.
//!
//! Everything the child needs (argument vector, redirection paths, open
//! flags) is prepared before `fork`, so the child only issues
//! async-signal-safe syscalls before `exec`.

use std::ffi::{CStr, CString, c_char};
use std::ptr;

use sostdio_core::StreamError;
use sostdio_core::config::StreamConfig;
use sostdio_core::metrics::{StdioMetrics, global_metrics};
use sostdio_core::process::{EXEC_FAILURE_STATUS, PipeDirection, WaitStatus, parse_command};
use sostdio_core::stdio::{DEFAULT_CREATE_MODE, Stream, flags_to_oflags, parse_mode};
use tracing::{debug, warn};

use crate::fd::FdIo;
use crate::file::SoFile;
use crate::sys;

/// Start `command` and connect to it through a pipe.
///
/// With [`PipeDirection::Read`] the stream yields the child's standard
/// output; with [`PipeDirection::Write`] it feeds the child's standard
/// input. `< file` and `> file` tokens redirect the child's other standard
/// descriptors. A program that cannot be executed still produces a stream;
/// the failure shows up as exit status 127 from [`reap`].
pub fn spawn(command: &str, direction: PipeDirection) -> Result<SoFile, StreamError> {
    spawn_with_config(command, direction, StreamConfig::from_env())
}

/// [`spawn`] with an explicit buffer configuration.
pub fn spawn_with_config(
    command: &str,
    direction: PipeDirection,
    config: StreamConfig,
) -> Result<SoFile, StreamError> {
    let parsed = parse_command(command)?;
    let plan = ExecPlan::new(&parsed.argv, parsed.stdin_from.clone(), parsed.stdout_to.clone())?;

    let ends = sys::pipe_cloexec().map_err(|errno| StreamError::Os { op: "pipe", errno })?;
    let parent_fd = ends[direction.parent_end()];
    let child_fd = ends[direction.child_end()];

    match sys::fork() {
        Err(errno) => {
            let _ = sys::close(parent_fd);
            let _ = sys::close(child_fd);
            warn!(program = %parsed.program(), errno, "fork failed");
            StdioMetrics::inc(&global_metrics().errors);
            Err(StreamError::Os { op: "fork", errno })
        }
        Ok(0) => run_child(&plan, parent_fd, child_fd, direction.child_stdio_fd()),
        Ok(pid) => {
            let _ = sys::close(child_fd);
            StdioMetrics::inc(&global_metrics().spawns);
            debug!(pid, fd = parent_fd, ?direction, program = %parsed.program(), "child spawned");
            Ok(Stream::with_config(FdIo::from_raw(parent_fd), config).with_child(pid))
        }
    }
}

/// Close a pipe stream and wait for its child.
///
/// The child is waited for even when the final flush or close fails; the
/// first failure is reported. A stream that was not created by [`spawn`] is
/// closed and rejected with [`StreamError::NotAProcess`].
pub fn reap(stream: SoFile) -> Result<WaitStatus, StreamError> {
    let Some(pid) = stream.child() else {
        if let Err(err) = stream.close() {
            warn!(%err, "close of non-pipe stream failed");
        }
        return Err(StreamError::NotAProcess);
    };

    let closed = stream.close();
    let waited = wait_for(pid);
    match &waited {
        Ok(status) => {
            StdioMetrics::inc(&global_metrics().reaps);
            debug!(pid, status = status.raw(), "child reaped");
        }
        Err(err) => warn!(pid, %err, "waitpid failed"),
    }
    closed.and(waited)
}

fn wait_for(pid: i32) -> Result<WaitStatus, StreamError> {
    loop {
        match sys::waitpid(pid, 0) {
            Ok((_, raw)) => return Ok(WaitStatus::from_raw(raw)),
            Err(libc::EINTR) => continue,
            Err(errno) => return Err(StreamError::Os { op: "waitpid", errno }),
        }
    }
}

// ---------------------------------------------------------------------------
// Child side
// ---------------------------------------------------------------------------

/// Pre-built exec arguments.
struct ExecPlan {
    _args: Vec<CString>,
    /// Pointers into `_args`, NULL-terminated.
    argv: Vec<*const c_char>,
    stdin_from: Option<(CString, i32)>,
    stdout_to: Option<(CString, i32)>,
}

impl ExecPlan {
    fn new(
        argv: &[String],
        stdin_from: Option<String>,
        stdout_to: Option<String>,
    ) -> Result<Self, StreamError> {
        let args = argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| StreamError::InvalidArgument)?;
        let mut ptrs: Vec<*const c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
        ptrs.push(ptr::null());

        Ok(Self {
            _args: args,
            argv: ptrs,
            stdin_from: redirect_plan(stdin_from, "r")?,
            stdout_to: redirect_plan(stdout_to, "w")?,
        })
    }
}

fn redirect_plan(
    path: Option<String>,
    mode: &str,
) -> Result<Option<(CString, i32)>, StreamError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let flags = parse_mode(mode).ok_or_else(|| StreamError::InvalidMode(mode.to_owned()))?;
    let path = CString::new(path).map_err(|_| StreamError::InvalidArgument)?;
    Ok(Some((path, flags_to_oflags(&flags))))
}

/// Runs in the forked child. Never returns.
fn run_child(plan: &ExecPlan, parent_fd: i32, child_fd: i32, target: i32) -> ! {
    // The parent runtime ignores SIGPIPE and that disposition survives exec.
    if sys::reset_sigpipe().is_err() {
        sys::exit_immediately(EXEC_FAILURE_STATUS);
    }
    let _ = sys::close(parent_fd);

    if child_fd == target {
        // dup2 onto itself would leave close-on-exec set.
        if sys::clear_cloexec(child_fd).is_err() {
            sys::exit_immediately(EXEC_FAILURE_STATUS);
        }
    } else {
        if sys::dup2(child_fd, target).is_err() {
            sys::exit_immediately(EXEC_FAILURE_STATUS);
        }
        let _ = sys::close(child_fd);
    }

    if let Some((path, oflags)) = &plan.stdin_from {
        redirect_or_exit(path, *oflags, 0);
    }
    if let Some((path, oflags)) = &plan.stdout_to {
        redirect_or_exit(path, *oflags, 1);
    }

    sys::execvp(&plan.argv);
    sys::exit_immediately(EXEC_FAILURE_STATUS)
}

fn redirect_or_exit(path: &CStr, oflags: i32, target: i32) {
    let Ok(fd) = sys::open(path, oflags, DEFAULT_CREATE_MODE) else {
        sys::exit_immediately(EXEC_FAILURE_STATUS);
    };
    if fd != target {
        if sys::dup2(fd, target).is_err() {
            sys::exit_immediately(EXEC_FAILURE_STATUS);
        }
        let _ = sys::close(fd);
    }
}
