//! Descriptor-backed device.

use sostdio_core::stdio::{RawIo, Whence};

use crate::sys;

/// An owned file descriptor driven through plain syscalls.
///
/// The descriptor is closed exactly once: by [`RawIo::close`] or, failing
/// that, on drop.
#[derive(Debug)]
pub struct FdIo {
    fd: i32,
}

impl FdIo {
    /// Take ownership of `fd`.
    pub fn from_raw(fd: i32) -> Self {
        Self { fd }
    }

    pub fn is_closed(&self) -> bool {
        self.fd < 0
    }
}

impl RawIo for FdIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        sys::read(self.fd, buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, i32> {
        sys::write(self.fd, buf)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<i64, i32> {
        sys::lseek(self.fd, offset, whence.to_posix())
    }

    fn close(&mut self) -> Result<(), i32> {
        // The descriptor is gone after close(2) whatever it returns.
        let fd = std::mem::replace(&mut self.fd, -1);
        if fd < 0 {
            return Err(libc::EBADF);
        }
        sys::close(fd)
    }

    fn raw_fd(&self) -> i32 {
        self.fd
    }
}

impl Drop for FdIo {
    fn drop(&mut self) {
        if self.fd >= 0 {
            let _ = sys::close(self.fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_single_shot() {
        let [r, w] = sys::pipe_cloexec().unwrap();
        let mut io = FdIo::from_raw(r);
        assert_eq!(io.raw_fd(), r);
        assert_eq!(io.close(), Ok(()));
        assert!(io.is_closed());
        assert_eq!(io.raw_fd(), -1);
        assert_eq!(io.close(), Err(libc::EBADF));
        sys::close(w).unwrap();
    }

    #[test]
    fn drop_closes_descriptor() {
        let [r, w] = sys::pipe_cloexec().unwrap();
        drop(FdIo::from_raw(w));
        let mut buf = [0u8; 1];
        // Write end gone: reader sees end of input.
        assert_eq!(sys::read(r, &mut buf), Ok(0));
        sys::close(r).unwrap();
    }

    #[test]
    fn pipe_is_not_seekable() {
        let [r, w] = sys::pipe_cloexec().unwrap();
        let mut io = FdIo::from_raw(r);
        assert_eq!(io.seek(0, Whence::Current), Err(libc::ESPIPE));
        sys::close(w).unwrap();
    }
}
