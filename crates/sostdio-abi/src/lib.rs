// extern "C" entry points take raw pointers from C callers and validate
// handles through the registry, so per-function safety docs are omitted.
#![allow(clippy::missing_safety_doc)]
//! # sostdio-abi
//!
//! OS-backed half of sostdio: descriptor devices, file and process-pipe
//! streams, and the `so_*` C boundary.
//!
//! ```text
//! C caller -> so_* entry (stdio_abi) -> registry -> Stream<FdIo> -> sys -> kernel
//! ```
//!
//! The buffering rules live in `sostdio-core`; this crate only supplies
//! the syscalls underneath them.

pub mod fd;
pub mod file;
pub mod popen;
pub mod stdio_abi;
pub mod sys;

pub use fd::FdIo;
pub use file::{SoFile, open, open_with_config};
pub use popen::{reap, spawn, spawn_with_config};
