//! Raw syscall wrappers.
//!
//! Each wrapper issues exactly one libc call and maps the `-1`/`errno`
//! convention onto `Result<_, i32>`. The wrappers used between `fork` and
//! `exec` (`reset_sigpipe`, `close`, `dup2`, `open`, `clear_cloexec`,
//! `execvp`, `exit_immediately`) neither allocate nor lock.

use std::ffi::{CStr, c_char};

/// errno left behind by the last failed call on this thread.
#[inline]
pub fn last_errno() -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::EIO)
}

/// Store `value` into the calling thread's `errno`.
#[inline]
pub fn set_errno(value: i32) {
    // SAFETY: __errno_location returns a valid thread-local pointer.
    unsafe { *libc::__errno_location() = value };
}

#[inline]
fn check(ret: libc::c_int) -> Result<libc::c_int, i32> {
    if ret < 0 { Err(last_errno()) } else { Ok(ret) }
}

#[inline]
fn check_size(ret: libc::ssize_t) -> Result<usize, i32> {
    if ret < 0 {
        Err(last_errno())
    } else {
        Ok(ret as usize)
    }
}

pub fn open(path: &CStr, oflags: i32, mode: u32) -> Result<i32, i32> {
    // SAFETY: `path` is NUL-terminated and outlives the call.
    check(unsafe { libc::open(path.as_ptr(), oflags, mode as libc::c_uint) })
}

pub fn read(fd: i32, buf: &mut [u8]) -> Result<usize, i32> {
    // SAFETY: the kernel writes at most `buf.len()` bytes into `buf`.
    check_size(unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) })
}

pub fn write(fd: i32, buf: &[u8]) -> Result<usize, i32> {
    // SAFETY: the kernel reads at most `buf.len()` bytes from `buf`.
    check_size(unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) })
}

pub fn lseek(fd: i32, offset: i64, whence: i32) -> Result<i64, i32> {
    // SAFETY: plain integer arguments.
    let ret = unsafe { libc::lseek(fd, offset as libc::off_t, whence) };
    if ret < 0 { Err(last_errno()) } else { Ok(ret as i64) }
}

pub fn close(fd: i32) -> Result<(), i32> {
    // SAFETY: plain integer argument.
    check(unsafe { libc::close(fd) }).map(drop)
}

/// `pipe2(O_CLOEXEC)`; returns `[read_end, write_end]`.
pub fn pipe_cloexec() -> Result<[i32; 2], i32> {
    let mut fds = [-1; 2];
    // SAFETY: `fds` has room for the two descriptors.
    check(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    Ok(fds)
}

pub fn dup2(oldfd: i32, newfd: i32) -> Result<i32, i32> {
    // SAFETY: plain integer arguments.
    check(unsafe { libc::dup2(oldfd, newfd) })
}

/// Clear `FD_CLOEXEC` so `fd` survives `exec`.
pub fn clear_cloexec(fd: i32) -> Result<(), i32> {
    // SAFETY: plain integer arguments.
    let flags = check(unsafe { libc::fcntl(fd, libc::F_GETFD) })?;
    // SAFETY: plain integer arguments.
    check(unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) }).map(drop)
}

/// Restore the default `SIGPIPE` disposition.
pub fn reset_sigpipe() -> Result<(), i32> {
    // SAFETY: installs SIG_DFL; no handler code runs.
    let prev = unsafe { libc::signal(libc::SIGPIPE, libc::SIG_DFL) };
    if prev == libc::SIG_ERR {
        Err(last_errno())
    } else {
        Ok(())
    }
}

/// Returns the child's pid in the parent and 0 in the child.
pub fn fork() -> Result<i32, i32> {
    // SAFETY: the caller restricts the child to async-signal-safe calls.
    check(unsafe { libc::fork() })
}

/// Replace the process image, searching `PATH` for `argv[0]`.
///
/// Returns only on failure. `argv` must be NULL-terminated.
pub fn execvp(argv: &[*const c_char]) -> i32 {
    debug_assert!(argv.last().is_some_and(|p| p.is_null()));
    // SAFETY: `argv` is a NULL-terminated array of NUL-terminated strings.
    unsafe { libc::execvp(argv[0], argv.as_ptr()) };
    last_errno()
}

/// Returns `(pid, raw_status)`.
pub fn waitpid(pid: i32, options: i32) -> Result<(i32, i32), i32> {
    let mut status = 0;
    // SAFETY: `status` is a valid out-pointer.
    let ret = check(unsafe { libc::waitpid(pid, &mut status, options) })?;
    Ok((ret, status))
}

/// `_exit`: terminate without running atexit handlers or flushing anything.
pub fn exit_immediately(status: i32) -> ! {
    // SAFETY: `_exit` never returns.
    unsafe { libc::_exit(status) }
}
