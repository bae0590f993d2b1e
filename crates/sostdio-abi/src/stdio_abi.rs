//! C ABI for sostdio streams.
//!
//! A global registry maps opaque `SO_FILE*` handles to [`SoFile`] streams.
//! Handles are small integers disguised as pointers; a handle that is not in
//! the registry (including NULL and already-closed handles) makes every call
//! fail with its documented sentinel instead of touching memory.

use std::collections::HashMap;
use std::ffi::{CStr, OsStr, c_char, c_int, c_long, c_void};
use std::os::unix::ffi::OsStrExt;
use std::sync::OnceLock;

use parking_lot::Mutex;
use sostdio_core::StreamError;
use sostdio_core::process::PipeDirection;
use sostdio_core::stdio::Whence;

use crate::file::{self, SoFile};
use crate::popen;
use crate::sys::set_errno;

/// End-of-input / failure sentinel returned by the `int` entry points.
pub const SO_EOF: c_int = -1;

// ---------------------------------------------------------------------------
// Stream registry
// ---------------------------------------------------------------------------

/// First handle value; low addresses are never issued.
const FIRST_STREAM_ID: usize = 0x1000_0010;

static NEXT_STREAM_ID: Mutex<usize> = parking_lot::const_mutex(FIRST_STREAM_ID);

fn registry() -> &'static Mutex<HashMap<usize, SoFile>> {
    static REG: OnceLock<Mutex<HashMap<usize, SoFile>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(HashMap::new()))
}

fn alloc_stream_id() -> usize {
    let mut next = NEXT_STREAM_ID.lock();
    let id = *next;
    *next = id.wrapping_add(1).max(FIRST_STREAM_ID);
    id
}

fn register(stream: SoFile) -> *mut c_void {
    let id = alloc_stream_id();
    registry().lock().insert(id, stream);
    id as *mut c_void
}

fn unregister(handle: *mut c_void) -> Option<SoFile> {
    registry().lock().remove(&(handle as usize))
}

/// Run `f` on the stream behind `handle`, or return `absent` with
/// `errno = EBADF`.
fn with_stream<R>(handle: *mut c_void, absent: R, f: impl FnOnce(&mut SoFile) -> R) -> R {
    let mut reg = registry().lock();
    match reg.get_mut(&(handle as usize)) {
        Some(stream) => f(stream),
        None => {
            set_errno(libc::EBADF);
            absent
        }
    }
}

fn status_of(result: Result<(), StreamError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(err) => {
            set_errno(err.errno());
            SO_EOF
        }
    }
}

/// Borrow a NUL-terminated UTF-8 argument; `None` for NULL or invalid UTF-8.
unsafe fn c_str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: the caller passes a NUL-terminated string.
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Open / close
// ---------------------------------------------------------------------------

/// Open a file stream. Returns NULL on failure with `errno` set.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fopen(pathname: *const c_char, mode: *const c_char) -> *mut c_void {
    if pathname.is_null() || mode.is_null() {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    }
    // SAFETY: non-null, NUL-terminated per the C contract.
    let path = OsStr::from_bytes(unsafe { CStr::from_ptr(pathname) }.to_bytes());
    // SAFETY: non-null, NUL-terminated per the C contract.
    let Some(mode) = (unsafe { c_str_arg(mode) }) else {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    };

    match file::open(path, mode) {
        Ok(stream) => register(stream),
        Err(err) => {
            set_errno(err.errno());
            std::ptr::null_mut()
        }
    }
}

/// Flush and close a stream. The handle is invalid afterwards, even on
/// failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fclose(stream: *mut c_void) -> c_int {
    let Some(s) = unregister(stream) else {
        set_errno(libc::EBADF);
        return SO_EOF;
    };
    status_of(s.close())
}

// ---------------------------------------------------------------------------
// Byte and block I/O
// ---------------------------------------------------------------------------

/// Next byte as a non-negative value, or `SO_EOF`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fgetc(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| {
        s.read_byte().map_or(SO_EOF, c_int::from)
    })
}

/// Write the low byte of `c`; returns it, or `SO_EOF` on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fputc(c: c_int, stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| match s.write_byte(c as u8) {
        Ok(byte) => c_int::from(byte),
        Err(err) => {
            set_errno(err.errno());
            SO_EOF
        }
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fflush(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| status_of(s.flush()))
}

/// Read up to `nmemb` elements of `size` bytes; returns complete elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fread(
    ptr: *mut c_void,
    size: usize,
    nmemb: usize,
    stream: *mut c_void,
) -> usize {
    let Some(total) = size.checked_mul(nmemb) else {
        return 0;
    };
    if ptr.is_null() || total == 0 {
        return 0;
    }
    with_stream(stream, 0, |s| {
        // SAFETY: the caller provides `size * nmemb` writable bytes at `ptr`.
        let dest = unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), total) };
        s.read_block(dest, size, nmemb)
    })
}

/// Write `nmemb` elements of `size` bytes; returns `nmemb` or 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fwrite(
    ptr: *const c_void,
    size: usize,
    nmemb: usize,
    stream: *mut c_void,
) -> usize {
    let Some(total) = size.checked_mul(nmemb) else {
        return 0;
    };
    if ptr.is_null() || total == 0 {
        return 0;
    }
    with_stream(stream, 0, |s| {
        // SAFETY: the caller provides `size * nmemb` readable bytes at `ptr`.
        let src = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), total) };
        s.write_block(src, size, nmemb)
    })
}

// ---------------------------------------------------------------------------
// Positioning and status
// ---------------------------------------------------------------------------

/// Reposition with POSIX `SEEK_SET` / `SEEK_CUR` / `SEEK_END`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fseek(stream: *mut c_void, offset: c_long, whence: c_int) -> c_int {
    let Some(whence) = Whence::from_posix(whence) else {
        set_errno(libc::EINVAL);
        return -1;
    };
    with_stream(stream, -1, |s| match s.seek(i64::from(offset), whence) {
        Ok(()) => 0,
        Err(err) => {
            set_errno(err.errno());
            -1
        }
    })
}

/// Logical position, or -1.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_ftell(stream: *mut c_void) -> c_long {
    with_stream(stream, -1, |s| match s.tell() {
        Ok(pos) => pos as c_long,
        Err(err) => {
            set_errno(err.errno());
            -1
        }
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fileno(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| s.fileno())
}

/// Nonzero once end of input was seen; `SO_EOF` for an unknown handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_feof(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| c_int::from(s.is_eof()))
}

/// Nonzero once an I/O error occurred; `SO_EOF` for an unknown handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_ferror(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| c_int::from(s.is_error()))
}

// ---------------------------------------------------------------------------
// Process pipes
// ---------------------------------------------------------------------------

/// Start `command` with a pipe to its stdout (`"r"`) or stdin (`"w"`).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_popen(command: *const c_char, kind: *const c_char) -> *mut c_void {
    // SAFETY: NUL-terminated per the C contract; NULL is rejected.
    let (Some(command), Some(kind)) = (unsafe { c_str_arg(command) }, unsafe { c_str_arg(kind) })
    else {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    };
    let Some(direction) = PipeDirection::from_type(kind) else {
        set_errno(libc::EINVAL);
        return std::ptr::null_mut();
    };

    match popen::spawn(command, direction) {
        Ok(stream) => register(stream),
        Err(err) => {
            set_errno(err.errno());
            std::ptr::null_mut()
        }
    }
}

/// Close a pipe stream and wait for its child.
///
/// Returns 0 once the child has been reaped, whatever its exit status, and
/// -1 on failure. The handle is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_pclose(stream: *mut c_void) -> c_int {
    let Some(s) = unregister(stream) else {
        set_errno(libc::EBADF);
        return -1;
    };
    match popen::reap(s) {
        Ok(_) => 0,
        Err(err) => {
            set_errno(err.errno());
            -1
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
