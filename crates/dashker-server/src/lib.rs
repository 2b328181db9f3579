//! dashker Server Library
//!
//! Core functionality for the dashker server:
//! - Container runtime client (Docker Engine API over its Unix socket)
//! - Socket sessions and the origin allow-list
//! - Log relay, terminal proxy, event filter and stats relay
//! - HTTP routes for container listing and lifecycle verbs

pub mod api;
pub mod runtime;
pub mod session;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_helpers;
