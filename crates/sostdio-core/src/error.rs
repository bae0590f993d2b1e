//! Error type shared by the stream engine and the process-pipe adapter.
//!
//! OS failures carry the raw errno of the failing call. Absent-stream and
//! bad-argument cases never touch the device.

use thiserror::Error;

/// errno values the engine produces or inspects itself.
pub mod errno {
    pub const EIO: i32 = 5;
    pub const EBADF: i32 = 9;
    pub const ECHILD: i32 = 10;
    pub const EINVAL: i32 = 22;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("unrecognized open mode {0:?}")]
    InvalidMode(String),
    #[error("invalid argument")]
    InvalidArgument,
    #[error("{op} failed (errno {errno})")]
    Os { op: &'static str, errno: i32 },
    #[error("device accepted zero bytes while flushing")]
    WriteZero,
    #[error("stream has no child process to reap")]
    NotAProcess,
    #[error("command line is empty")]
    EmptyCommand,
    #[error("redirection `{0}` is missing a file name")]
    MissingRedirectTarget(char),
}

impl StreamError {
    /// errno equivalent of this error, for C callers.
    pub fn errno(&self) -> i32 {
        match self {
            StreamError::Os { errno, .. } => *errno,
            StreamError::WriteZero => errno::EIO,
            StreamError::NotAProcess => errno::ECHILD,
            StreamError::InvalidMode(_)
            | StreamError::InvalidArgument
            | StreamError::EmptyCommand
            | StreamError::MissingRedirectTarget(_) => errno::EINVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_error_keeps_errno() {
        let err = StreamError::Os {
            op: "write",
            errno: errno::EBADF,
        };
        assert_eq!(err.errno(), errno::EBADF);
        assert_eq!(err.to_string(), "write failed (errno 9)");
    }

    #[test]
    fn argument_errors_map_to_einval() {
        assert_eq!(StreamError::InvalidMode("q".into()).errno(), errno::EINVAL);
        assert_eq!(StreamError::EmptyCommand.errno(), errno::EINVAL);
        assert_eq!(
            StreamError::MissingRedirectTarget('>').to_string(),
            "redirection `>` is missing a file name"
        );
    }
}
