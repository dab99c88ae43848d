//! Filesystem utilities for davlock.
//!
//! Lock records are refreshed in place and the config file is written once at
//! init; both go through the atomic write here so a reader never observes a
//! half-written file.

pub mod atomic;

pub use atomic::atomic_write;
