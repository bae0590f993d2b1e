//! Opening files as streams.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use sostdio_core::StreamError;
use sostdio_core::config::StreamConfig;
use sostdio_core::stdio::{DEFAULT_CREATE_MODE, Stream, flags_to_oflags, parse_mode};
use tracing::{debug, warn};

use crate::fd::FdIo;
use crate::sys;

/// A stream over an owned descriptor.
pub type SoFile = Stream<FdIo>;

/// Open `path` with an `fopen`-style mode (`r`, `r+`, `w`, `w+`, `a`, `a+`).
///
/// Created files get mode `0644` before the umask. The descriptor is
/// close-on-exec so it never leaks into pipe children.
pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<SoFile, StreamError> {
    open_with_config(path, mode, StreamConfig::from_env())
}

/// [`open`] with an explicit buffer configuration.
pub fn open_with_config(
    path: impl AsRef<Path>,
    mode: &str,
    config: StreamConfig,
) -> Result<SoFile, StreamError> {
    let path = path.as_ref();
    let flags = parse_mode(mode).ok_or_else(|| StreamError::InvalidMode(mode.to_owned()))?;
    let c_path =
        CString::new(path.as_os_str().as_bytes()).map_err(|_| StreamError::InvalidArgument)?;

    let oflags = flags_to_oflags(&flags) | libc::O_CLOEXEC;
    let fd = sys::open(&c_path, oflags, DEFAULT_CREATE_MODE).map_err(|errno| {
        warn!(path = %path.display(), mode, errno, "open failed");
        StreamError::Os { op: "open", errno }
    })?;

    debug!(fd, path = %path.display(), mode, "stream opened");
    Ok(Stream::with_config(FdIo::from_raw(fd), config))
}
