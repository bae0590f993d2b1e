//! # sostdio-core
//!
//! Safe Rust model of a minimal buffered stdio stream and of the
//! process-pipe streams built on it.
//!
//! This crate holds the state machines and parsers; it never calls into the
//! OS itself. Devices plug in through [`stdio::RawIo`]. No `unsafe` code is
//! permitted at the crate level.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod process;
pub mod stdio;

pub use error::StreamError;
