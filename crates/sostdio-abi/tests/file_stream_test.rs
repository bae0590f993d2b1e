//! Integration test: streams over real files.
//!
//! Exercises open modes, the auto-flush boundary as seen on disk, logical
//! positions, and block transfers against descriptors closed behind the
//! stream's back.
//!
//! Run: cargo test -p sostdio-abi --test file_stream_test

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use sostdio_abi::{open, open_with_config};
use sostdio_core::StreamError;
use sostdio_core::config::StreamConfig;
use sostdio_core::stdio::{BUFSIZ, Whence};

/// Serializes tests that close descriptors out-of-band, so a freed fd
/// number cannot be reused by a concurrent test.
static FD_LOCK: Mutex<()> = Mutex::new(());

fn temp_path(prefix: &str) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "sostdio-{prefix}-{}-{seq}",
        std::process::id()
    ))
}

fn config() -> StreamConfig {
    StreamConfig::default()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

// -----------------------------------------------------------------
// Open modes
// -----------------------------------------------------------------

#[test]
fn read_mode_requires_existing_file() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("missing");
    assert_eq!(
        open(&path, "r").err(),
        Some(StreamError::Os {
            op: "open",
            errno: libc::ENOENT
        })
    );
}

#[test]
fn write_mode_truncates() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("trunc");
    std::fs::write(&path, b"old contents").unwrap();

    let mut s = open_with_config(&path, "w", config()).unwrap();
    assert_eq!(file_len(&path), 0);
    s.write_block(b"new", 1, 3);
    s.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"new");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn append_mode_writes_at_end_after_seek() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("append");
    std::fs::write(&path, b"head").unwrap();

    let mut s = open_with_config(&path, "a", config()).unwrap();
    s.seek(0, Whence::Start).unwrap();
    s.write_block(b"-tail", 1, 5);
    s.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"head-tail");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn append_plus_creates_and_reads() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("aplus");
    let mut s = open_with_config(&path, "a+", config()).unwrap();
    s.write_block(b"xyz", 1, 3);
    s.seek(0, Whence::Start).unwrap();
    assert_eq!(s.read_byte(), Some(b'x'));
    s.close().unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn read_only_stream_cannot_write() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("ro");
    std::fs::write(&path, b"data").unwrap();

    let mut s = open_with_config(&path, "r", config()).unwrap();
    s.write_byte(b'!').unwrap();
    assert_eq!(
        s.flush(),
        Err(StreamError::Os {
            op: "write",
            errno: libc::EBADF
        })
    );
    assert!(s.is_error());
    drop(s);
    assert_eq!(std::fs::read(&path).unwrap(), b"data");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn error_indicator_survives_later_success() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("sticky");
    let mut s = open_with_config(&path, "w", config()).unwrap();

    // Reading a write-only descriptor fails with EBADF.
    assert_eq!(s.read_byte(), None);
    assert!(s.is_error());
    assert!(!s.is_eof());

    assert_eq!(s.write_block(b"fine", 1, 4), 4);
    s.flush().unwrap();
    s.seek(0, Whence::Start).unwrap();
    assert!(s.is_error());

    s.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"fine");
    std::fs::remove_file(&path).unwrap();
}

// -----------------------------------------------------------------
// Round trip and auto-flush boundary
// -----------------------------------------------------------------

#[test]
fn file_roundtrip_around_block_size() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    for n in [0, 1, BUFSIZ - 1, BUFSIZ, BUFSIZ + 1] {
        let path = temp_path("roundtrip");
        let data = pattern(n);

        let mut w = open_with_config(&path, "w", config()).unwrap();
        for &b in &data {
            w.write_byte(b).unwrap();
        }
        w.close().unwrap();

        let mut r = open_with_config(&path, "r", config()).unwrap();
        let mut back = Vec::new();
        while let Some(b) = r.read_byte() {
            back.push(b);
        }
        assert!(r.is_eof());
        r.close().unwrap();
        assert_eq!(back, data, "round trip of {n} bytes");
        std::fs::remove_file(&path).unwrap();
    }
}

#[test]
fn file_grows_only_in_whole_blocks() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("boundary");
    let mut s = open_with_config(&path, "w", config()).unwrap();

    for &b in &pattern(BUFSIZ - 1) {
        s.write_byte(b).unwrap();
    }
    assert_eq!(file_len(&path), 0);

    s.write_byte(0).unwrap();
    assert_eq!(file_len(&path), BUFSIZ as u64);

    s.write_byte(1).unwrap();
    assert_eq!(file_len(&path), BUFSIZ as u64);

    s.close().unwrap();
    assert_eq!(file_len(&path), BUFSIZ as u64 + 1);
    std::fs::remove_file(&path).unwrap();
}

// -----------------------------------------------------------------
// Positions
// -----------------------------------------------------------------

#[test]
fn tell_counts_bytes_consumed() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("tell");
    std::fs::write(&path, pattern(3 * BUFSIZ)).unwrap();

    let mut s = open_with_config(&path, "r", config()).unwrap();
    for k in [1usize, 17, BUFSIZ, BUFSIZ + 1, 2 * BUFSIZ + 5] {
        s.seek(0, Whence::Start).unwrap();
        for _ in 0..k {
            s.read_byte().unwrap();
        }
        assert_eq!(s.tell(), Ok(k as i64), "after {k} reads");
    }
    s.close().unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn read_write_stream_switches_direction() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("rplus");
    std::fs::write(&path, b"0123456789").unwrap();

    let mut s = open_with_config(&path, "r+", config()).unwrap();
    s.seek(3, Whence::Start).unwrap();
    s.write_block(b"AB", 1, 2);
    assert_eq!(s.read_byte(), Some(b'5'));
    assert_eq!(s.tell(), Ok(6));
    s.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"012AB56789");
    std::fs::remove_file(&path).unwrap();
}

// -----------------------------------------------------------------
// Block transfers
// -----------------------------------------------------------------

#[test]
fn read_block_counts_complete_elements() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = temp_path("elements");
    std::fs::write(&path, b"abcdefghij").unwrap();

    let mut s = open_with_config(&path, "r", config()).unwrap();
    let mut dest = [0u8; 15];
    assert_eq!(s.read_block(&mut dest, 3, 5), 3);
    assert_eq!(&dest[..9], b"abcdefghi");
    assert!(s.is_eof());
    s.close().unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn write_block_on_closed_descriptor_returns_zero() {
    let _guard = FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    for (size, count) in [(1, BUFSIZ), (BUFSIZ, 1), (512, 9), (3, 5000)] {
        let path = temp_path("oob");
        let mut s = open_with_config(&path, "w", config()).unwrap();
        // SAFETY: the descriptor belongs to `s`; FD_LOCK keeps its number
        // from being reused before the stream is dropped.
        assert_eq!(unsafe { libc::close(s.fileno()) }, 0);

        let src = pattern(size * count);
        assert_eq!(s.write_block(&src, size, count), 0, "{size}x{count}");
        assert!(s.is_error());
        assert!(s.close().is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
