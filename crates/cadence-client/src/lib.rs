//! # cadence-client
//!
//! Remote collaborators for the Cadence engine.
//!
//! [`ApiClient`] speaks the chat service's REST API and implements the
//! credential, chat, quota and points contracts from `cadence-core`.
//! [`PromptPool`] supplies message text.
//!
//! Transport failures are mapped to `CadenceError` with a structured
//! network/HTTP tag so the engine can tell transient from terminal failures
//! without looking at message text.

mod auth;
mod chat;
mod client;
mod generator;
mod wire;

pub use auth::resolve_api_key;
pub use client::ApiClient;
pub use generator::PromptPool;
