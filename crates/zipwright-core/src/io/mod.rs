//! I/O utilities for archive output.

pub mod atomic;

pub use atomic::AtomicFile;
