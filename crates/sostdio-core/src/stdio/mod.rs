//! Buffered stream I/O.
//!
//! Implements the stream half of the library: open-mode parsing, the
//! single-block buffer, and the stream engine that drives a [`RawIo`]
//! device through it.

pub mod buffer;
pub mod file;
pub mod memory;
pub mod stream;

pub use buffer::{BUFSIZ, BufferState, StreamBuffer};
pub use file::{DEFAULT_CREATE_MODE, OpenFlags, Whence, flags_to_oflags, parse_mode};
pub use memory::MemoryIo;
pub use stream::{RawIo, Stream};
