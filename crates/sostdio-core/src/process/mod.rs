//! Process-pipe model.
//!
//! Pipe direction, wait-status decoding, and the command-line parser used
//! by the pipe adapter. The adapter itself (pipe/fork/exec/wait) lives in
//! the ABI crate.

pub mod command;

pub use command::{CommandLine, parse_command};

/// Exit status of a child whose redirection or exec failed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// Which end of the pipe the parent keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeDirection {
    /// Parent reads what the child writes to its standard output.
    Read,
    /// Parent writes what the child reads from its standard input.
    Write,
}

impl PipeDirection {
    /// Parse a `popen`-style type string (`"r"` or `"w"`).
    pub fn from_type(kind: &str) -> Option<PipeDirection> {
        match kind {
            "r" => Some(PipeDirection::Read),
            "w" => Some(PipeDirection::Write),
            _ => None,
        }
    }

    /// Standard descriptor of the child that gets rewired to the pipe.
    pub const fn child_stdio_fd(self) -> i32 {
        match self {
            PipeDirection::Read => 1,
            PipeDirection::Write => 0,
        }
    }

    /// Index into `pipe()`'s `[read_end, write_end]` kept by the parent.
    pub const fn parent_end(self) -> usize {
        match self {
            PipeDirection::Read => 0,
            PipeDirection::Write => 1,
        }
    }

    /// Index into `pipe()`'s `[read_end, write_end]` handed to the child.
    pub const fn child_end(self) -> usize {
        1 - self.parent_end()
    }
}

// ---------------------------------------------------------------------------
// Wait-status decoding (Linux bit layout)
// ---------------------------------------------------------------------------

/// True if the child terminated normally (via `_exit` or `exit`).
#[must_use]
pub const fn wifexited(status: i32) -> bool {
    (status & 0x7f) == 0
}

/// Exit code of a normally-terminated child (valid only when `wifexited`).
#[must_use]
pub const fn wexitstatus(status: i32) -> i32 {
    (status >> 8) & 0xff
}

/// True if the child was killed by a signal.
#[must_use]
pub const fn wifsignaled(status: i32) -> bool {
    let low7 = status & 0x7f;
    low7 != 0 && low7 != 0x7f
}

/// Signal number that killed the child (valid only when `wifsignaled`).
#[must_use]
pub const fn wtermsig(status: i32) -> i32 {
    status & 0x7f
}

/// Termination status of a reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus(i32);

impl WaitStatus {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw status word as filled in by `waitpid`.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn exited(self) -> bool {
        wifexited(self.0)
    }

    /// Exit code, if the child exited normally.
    #[must_use]
    pub const fn exit_code(self) -> Option<i32> {
        if wifexited(self.0) {
            Some(wexitstatus(self.0))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn signaled(self) -> bool {
        wifsignaled(self.0)
    }

    /// Terminating signal, if the child was killed by one.
    #[must_use]
    pub const fn term_signal(self) -> Option<i32> {
        if wifsignaled(self.0) {
            Some(wtermsig(self.0))
        } else {
            None
        }
    }

    /// True for a normal exit with code 0.
    #[must_use]
    pub const fn success(self) -> bool {
        self.0 == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
