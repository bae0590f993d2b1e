//! Buffered stream engine.
//!
//! `Stream` owns one device and one fixed block buffer. Byte reads refill
//! the whole block in one OS read; byte writes accumulate until the block is
//! full and then drain it. Block transfers are plain loops over the byte
//! operations so every buffering rule applies to them unchanged.
//!
//! Direction changes resolve outstanding data first: pending writes are
//! flushed before a read, unread read-ahead is discarded before a write.
//! The `eof` and `error` indicators are sticky for the life of the stream.

use tracing::{debug, trace, warn};

use super::buffer::{BufferState, StreamBuffer};
use super::file::Whence;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::metrics::{StdioMetrics, global_metrics};

/// The OS-facing half of a stream.
///
/// Errors are raw errno values, as a syscall returns them.
pub trait RawIo {
    /// One read call; `Ok(0)` means end of input.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32>;
    /// One write call; may accept fewer bytes than offered.
    fn write(&mut self, buf: &[u8]) -> Result<usize, i32>;
    /// Reposition the device offset, returning the new offset.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<i64, i32>;
    /// Release the device. Called at most once by the stream.
    fn close(&mut self) -> Result<(), i32>;
    /// Descriptor number, or -1 when there is none.
    fn raw_fd(&self) -> i32;
}

/// Buffered stream over a [`RawIo`] device.
#[derive(Debug)]
pub struct Stream<I: RawIo> {
    io: I,
    buffer: StreamBuffer,
    eof: bool,
    error: bool,
    /// Process id of the child on the other end of a pipe stream.
    child: Option<i32>,
    closed: bool,
}

impl<I: RawIo> Stream<I> {
    /// Wrap a device using the environment-configured buffer capacity.
    pub fn new(io: I) -> Self {
        Self::with_config(io, StreamConfig::from_env())
    }

    /// Wrap a device with explicit settings.
    pub fn with_config(io: I, config: StreamConfig) -> Self {
        Self {
            io,
            buffer: StreamBuffer::new(config.buffer_capacity),
            eof: false,
            error: false,
            child: None,
            closed: false,
        }
    }

    /// Attach the child process whose pipe this stream wraps.
    #[must_use]
    pub fn with_child(mut self, pid: i32) -> Self {
        self.child = Some(pid);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Descriptor of the underlying device.
    pub fn fileno(&self) -> i32 {
        self.io.raw_fd()
    }

    /// True once a read has observed end of input.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// True once any OS-level call has failed.
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Child process id for process-pipe streams.
    pub fn child(&self) -> Option<i32> {
        self.child
    }

    /// Current buffer interpretation.
    pub fn state(&self) -> BufferState {
        self.buffer.state()
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Borrow the device.
    pub fn get_ref(&self) -> &I {
        &self.io
    }

    /// Mutably borrow the device. Bypassing the buffer desynchronizes it.
    pub fn get_mut(&mut self) -> &mut I {
        &mut self.io
    }

    fn fail(&mut self, op: &'static str, errno: i32) -> StreamError {
        self.error = true;
        StdioMetrics::inc(&global_metrics().errors);
        StreamError::Os { op, errno }
    }

    // -----------------------------------------------------------------------
    // Byte I/O
    // -----------------------------------------------------------------------

    /// Read one byte.
    ///
    /// `None` is the shared end-of-data / failure sentinel; use
    /// [`is_eof`](Self::is_eof) and [`is_error`](Self::is_error) to tell
    /// them apart.
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.buffer.is_writing() && self.flush().is_err() {
            return None;
        }
        if let Some(byte) = self.buffer.next_byte() {
            return Some(byte);
        }
        if !self.refill() {
            return None;
        }
        self.buffer.next_byte()
    }

    /// One bulk read into the block. Returns `true` if any bytes arrived.
    fn refill(&mut self) -> bool {
        let fd = self.io.raw_fd();
        StdioMetrics::inc(&global_metrics().os_reads);
        match self.io.read(self.buffer.fill_target()) {
            Ok(0) => {
                self.buffer.mark_filled(0);
                self.eof = true;
                trace!(fd, "end of input");
                false
            }
            Ok(n) => {
                self.buffer.mark_filled(n);
                trace!(fd, bytes = n, "buffer refilled");
                true
            }
            Err(errno) => {
                self.buffer.mark_filled(0);
                let _ = self.fail("read", errno);
                warn!(fd, errno, "read failed");
                false
            }
        }
    }

    /// Write one byte, draining the block once it fills.
    pub fn write_byte(&mut self, byte: u8) -> Result<u8, StreamError> {
        self.buffer.begin_write();
        if self.buffer.is_full() {
            // Left full by an earlier failed flush.
            self.flush()?;
            self.buffer.begin_write();
        }
        self.buffer.push(byte);
        if self.buffer.is_full() {
            self.flush()?;
        }
        Ok(byte)
    }

    /// Write every pending byte to the device.
    ///
    /// Short writes are resumed. On failure the bytes that did reach the
    /// device are dropped from the buffer and the rest stay pending. On
    /// success the buffer returns to idle, discarding any read-ahead.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        let metrics = global_metrics();
        StdioMetrics::inc(&metrics.flushes);
        let fd = self.io.raw_fd();
        let pending = self.buffer.pending();
        let mut written = 0;

        while written < pending {
            StdioMetrics::inc(&metrics.os_writes);
            match self.io.write(&self.buffer.pending_write_data()[written..]) {
                Ok(0) => {
                    self.buffer.consume_flushed(written);
                    self.error = true;
                    StdioMetrics::inc(&metrics.errors);
                    warn!(fd, written, pending, "device accepted zero bytes");
                    return Err(StreamError::WriteZero);
                }
                Ok(n) => {
                    if written + n < pending {
                        StdioMetrics::inc(&metrics.short_writes);
                    }
                    trace!(fd, bytes = n, "buffer drained");
                    written += n;
                }
                Err(errno) => {
                    self.buffer.consume_flushed(written);
                    warn!(fd, errno, written, pending, "flush failed");
                    return Err(self.fail("write", errno));
                }
            }
        }

        self.buffer.reset();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Block I/O
    // -----------------------------------------------------------------------

    /// Read up to `count` elements of `size` bytes into `dest`.
    ///
    /// Returns the number of complete elements. Bytes of a trailing partial
    /// element are still stored in `dest`.
    pub fn read_block(&mut self, dest: &mut [u8], size: usize, count: usize) -> usize {
        let Some(total) = block_len(dest.len(), size, count) else {
            return 0;
        };
        let mut copied = 0;
        for slot in &mut dest[..total] {
            match self.read_byte() {
                Some(byte) => {
                    *slot = byte;
                    copied += 1;
                }
                None => break,
            }
        }
        copied / size
    }

    /// Write `count` elements of `size` bytes from `src`.
    ///
    /// Returns `count` if every byte was accepted and 0 otherwise, even when
    /// some bytes already reached the stream before the failure.
    pub fn write_block(&mut self, src: &[u8], size: usize, count: usize) -> usize {
        let Some(total) = block_len(src.len(), size, count) else {
            return 0;
        };
        for &byte in &src[..total] {
            if self.write_byte(byte).is_err() {
                return 0;
            }
        }
        count
    }

    // -----------------------------------------------------------------------
    // Positioning
    // -----------------------------------------------------------------------

    /// Reposition the stream.
    ///
    /// Pending writes are flushed first (a failed flush fails the seek);
    /// unread read-ahead is discarded.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<(), StreamError> {
        StdioMetrics::inc(&global_metrics().seeks);
        match self.buffer.state() {
            BufferState::Writing { .. } => self.flush()?,
            BufferState::Reading { .. } => self.buffer.reset(),
            BufferState::Idle => {}
        }
        match self.io.seek(offset, whence) {
            Ok(_) => Ok(()),
            Err(errno) => Err(self.fail("lseek", errno)),
        }
    }

    /// Logical position as seen by the caller.
    ///
    /// The raw device offset is adjusted for read-ahead (which the device
    /// has already passed) and for pending writes (which it has not yet
    /// reached).
    pub fn tell(&mut self) -> Result<i64, StreamError> {
        let raw = match self.io.seek(0, Whence::Current) {
            Ok(raw) => raw,
            Err(errno) => return Err(self.fail("lseek", errno)),
        };
        Ok(match self.buffer.state() {
            BufferState::Reading { cursor, filled } => raw - filled as i64 + cursor as i64,
            BufferState::Writing { pending } => raw + pending as i64,
            BufferState::Idle => raw,
        })
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    /// Flush pending writes and release the device.
    ///
    /// The device is released even if the flush fails; the first failure is
    /// reported.
    pub fn close(mut self) -> Result<(), StreamError> {
        let fd = self.io.raw_fd();
        let flushed = if self.buffer.is_writing() {
            self.flush()
        } else {
            Ok(())
        };
        self.buffer.reset();
        self.closed = true;
        let released = match self.io.close() {
            Ok(()) => Ok(()),
            Err(errno) => {
                warn!(fd, errno, "close failed");
                Err(self.fail("close", errno))
            }
        };
        debug!(fd, ok = flushed.is_ok() && released.is_ok(), "stream closed");
        flushed.and(released)
    }
}

impl<I: RawIo> Drop for Stream<I> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if self.buffer.is_writing() {
            let _ = self.flush();
        }
        let _ = self.io.close();
    }
}

/// Byte length of a block transfer, or `None` if the request is unusable.
fn block_len(available: usize, size: usize, count: usize) -> Option<usize> {
    if size == 0 || count == 0 {
        return None;
    }
    let total = size.checked_mul(count)?;
    (total <= available).then_some(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
