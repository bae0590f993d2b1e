//! In-memory device.
//!
//! A seekable byte vector implementing [`RawIo`], with knobs for short
//! writes and injected failures. Every successful write call is recorded so
//! callers can observe exactly how a stream drained its buffer.

use super::file::Whence;
use super::stream::RawIo;
use crate::error::errno;

#[derive(Debug, Default)]
pub struct MemoryIo {
    data: Vec<u8>,
    pos: usize,
    read_calls: usize,
    write_sizes: Vec<usize>,
    write_limit: Option<usize>,
    /// (write calls allowed to succeed, errno returned afterwards)
    write_failure: Option<(usize, i32)>,
    read_failure: Option<i32>,
    closed: bool,
}

impl MemoryIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device pre-loaded with `data`, positioned at offset 0.
    pub fn with_contents(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Accept at most `max` bytes per write call.
    pub fn limit_writes(&mut self, max: usize) {
        self.write_limit = Some(max);
    }

    /// Let `allowed` more write calls succeed, then fail with `errno`.
    pub fn fail_writes_after(&mut self, allowed: usize, errno: i32) {
        self.write_failure = Some((self.write_sizes.len() + allowed, errno));
    }

    /// Stop injecting write failures.
    pub fn heal_writes(&mut self) {
        self.write_failure = None;
    }

    /// Fail every read with `errno`.
    pub fn fail_reads(&mut self, errno: i32) {
        self.read_failure = Some(errno);
    }

    /// Append bytes at the end without moving the offset.
    pub fn append_input(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of read calls issued, including failed ones.
    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    /// Byte count of each successful write call, in order.
    pub fn write_sizes(&self) -> &[usize] {
        &self.write_sizes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RawIo for MemoryIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        self.read_calls += 1;
        if self.closed {
            return Err(errno::EBADF);
        }
        if let Some(err) = self.read_failure {
            return Err(err);
        }
        let start = self.pos.min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos = start + n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, i32> {
        if self.closed {
            return Err(errno::EBADF);
        }
        if let Some((allowed, err)) = self.write_failure
            && self.write_sizes.len() >= allowed
        {
            return Err(err);
        }
        let n = self.write_limit.map_or(buf.len(), |max| buf.len().min(max));
        let end = self.pos + n;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(&buf[..n]);
        self.pos = end;
        self.write_sizes.push(n);
        Ok(n)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<i64, i32> {
        if self.closed {
            return Err(errno::EBADF);
        }
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.pos as i64,
            Whence::End => self.data.len() as i64,
        };
        let target = base.checked_add(offset).ok_or(errno::EINVAL)?;
        if target < 0 {
            return Err(errno::EINVAL);
        }
        self.pos = target as usize;
        Ok(target)
    }

    fn close(&mut self) -> Result<(), i32> {
        if self.closed {
            return Err(errno::EBADF);
        }
        self.closed = true;
        Ok(())
    }

    fn raw_fd(&self) -> i32 {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_position() {
        let mut io = MemoryIo::with_contents(b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(io.read(&mut buf), Ok(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(io.read(&mut buf), Ok(2));
        assert_eq!(io.read(&mut buf), Ok(0));
        assert_eq!(io.read_calls(), 3);
    }

    #[test]
    fn write_past_end_zero_fills() {
        let mut io = MemoryIo::new();
        io.seek(3, Whence::Start).unwrap();
        assert_eq!(io.write(b"x"), Ok(1));
        assert_eq!(io.contents(), b"\0\0\0x");
    }

    #[test]
    fn injected_failures() {
        let mut io = MemoryIo::new();
        io.fail_writes_after(1, errno::EIO);
        assert_eq!(io.write(b"a"), Ok(1));
        assert_eq!(io.write(b"b"), Err(errno::EIO));
        io.heal_writes();
        assert_eq!(io.write(b"c"), Ok(1));
        assert_eq!(io.contents(), b"ac");
    }

    #[test]
    fn closed_device_rejects_io() {
        let mut io = MemoryIo::new();
        assert_eq!(io.close(), Ok(()));
        assert!(io.is_closed());
        assert_eq!(io.write(b"a"), Err(errno::EBADF));
        assert_eq!(io.close(), Err(errno::EBADF));
    }
}
