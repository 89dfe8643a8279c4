//! # cadence-engine
//!
//! Orchestration engine for Cadence sessions.
//!
//! - [`Session`] exposes `start`, `pause`, `resume` and `stop` and owns the
//!   single orchestration loop
//! - [`RetryPolicy`] retries transient failures of one remote call
//! - [`CircuitBreaker`] escalates consecutive failed cycles to a long pause
//! - [`CooldownCoordinator`] suspends the loop until the quota resets
//! - [`state_machine`] holds the pure run-state transitions
//!
//! Collaborators are injected through [`Services`], so the engine never
//! talks to the network or the terminal directly.

mod activity_logger;
mod circuit_breaker;
mod cooldown;
mod log_sink;
mod loop_engine;
mod retry;
mod session;
pub mod state_machine;

#[cfg(test)]
mod test_support;

pub use activity_logger::ActivityLogger;
pub use circuit_breaker::{BreakerAdvice, CircuitBreaker};
pub use cooldown::{CooldownCoordinator, CooldownPoll, CooldownWindow};
pub use log_sink::LogStatusSink;
pub use retry::{RetryAttempt, RetryPolicy};
pub use session::{Services, Session, SessionSettings, SessionSnapshot, SessionStats};
