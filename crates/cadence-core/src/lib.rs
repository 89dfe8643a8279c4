//! # cadence-core
//!
//! Core types for the Cadence chat automation engine.
//!
//! Cadence keeps a long-lived loop sending generated messages to a
//! rate-limited chat service. This crate holds what every other crate
//! agrees on:
//!
//! - The unified error type and its transient/terminal classification
//! - Account, quota and points snapshots
//! - Contracts for the remote services and the presentation/diagnostic sinks
//! - Configuration loaded from `.cadence/config.toml`

pub mod clock;
pub mod config;
mod error;
pub mod fail_open;
mod services;
mod types;

pub use clock::{Clock, MonotonicClock, SystemClock};
pub use config::CadenceConfig;
pub use error::{CadenceError, ErrorKind, NetworkErrorKind, Result};
pub use services::*;
pub use types::*;
