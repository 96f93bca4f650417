//! Tracing/logging setup shared by the shell binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, ParseLogFormatError, init, init_with};
