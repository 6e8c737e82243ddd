//! Structured logging for ShelfScan.
//!
//! Wraps `tracing` to provide a console layer plus a daily-rolling NDJSON
//! file, with environment-based level control.

pub mod logger;

pub use logger::init_logger;
