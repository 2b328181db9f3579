//! `dashker` Core Library
//!
//! Shared functionality for `dashker` components:
//! - Demultiplexing of the container runtime's framed log output
//! - Line splitting for interactive (TTY) container output
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod error;
pub mod mux;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use mux::{LogRecord, StreamKind};
