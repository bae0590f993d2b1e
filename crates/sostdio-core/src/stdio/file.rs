//! Open modes and seek origins.
//!
//! The mode table is fixed: exactly `r`, `r+`, `w`, `w+`, `a`, `a+` are
//! recognized, each mapping to one combination of access, create, truncate
//! and append. Anything else is rejected before a descriptor is opened.

/// Permission bits for files created by `w`/`a` modes (before umask).
pub const DEFAULT_CREATE_MODE: u32 = 0o644;

/// File open mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub readable: bool,
    pub writable: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
}

/// Parse an open mode string.
///
/// Returns `None` for anything outside the six recognized modes.
pub fn parse_mode(mode: &str) -> Option<OpenFlags> {
    let flags = match mode {
        "r" => OpenFlags {
            readable: true,
            ..Default::default()
        },
        "r+" => OpenFlags {
            readable: true,
            writable: true,
            ..Default::default()
        },
        "w" => OpenFlags {
            writable: true,
            create: true,
            truncate: true,
            ..Default::default()
        },
        "w+" => OpenFlags {
            readable: true,
            writable: true,
            create: true,
            truncate: true,
            ..Default::default()
        },
        "a" => OpenFlags {
            writable: true,
            create: true,
            append: true,
            ..Default::default()
        },
        "a+" => OpenFlags {
            readable: true,
            writable: true,
            create: true,
            append: true,
            ..Default::default()
        },
        _ => return None,
    };
    Some(flags)
}

/// Convert open flags to Linux `O_*` flag bits.
pub fn flags_to_oflags(flags: &OpenFlags) -> i32 {
    let mut oflags = 0i32;

    if flags.readable && flags.writable {
        oflags |= 2; // O_RDWR
    } else if flags.writable {
        oflags |= 1; // O_WRONLY
    }
    // O_RDONLY is 0, so readable-only needs no flag.

    if flags.create {
        oflags |= 0o100; // O_CREAT
    }
    if flags.truncate {
        oflags |= 0o1000; // O_TRUNC
    }
    if flags.append {
        oflags |= 0o2000; // O_APPEND
    }

    oflags
}

/// Origin for a seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Relative to the start of the file (`SEEK_SET`).
    Start,
    /// Relative to the current descriptor offset (`SEEK_CUR`).
    Current,
    /// Relative to the end of the file (`SEEK_END`).
    End,
}

impl Whence {
    /// POSIX `SEEK_*` value.
    pub const fn to_posix(self) -> i32 {
        match self {
            Whence::Start => 0,
            Whence::Current => 1,
            Whence::End => 2,
        }
    }

    /// Convert from a POSIX `SEEK_*` value.
    pub const fn from_posix(whence: i32) -> Option<Whence> {
        match whence {
            0 => Some(Whence::Start),
            1 => Some(Whence::Current),
            2 => Some(Whence::End),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
