//! Payment session security core.
//!
//! An in-memory payment session service: sessions are created against a
//! payment policy, card submissions pass through a validating and tokenizing
//! gateway, and settlement outcomes land through compare-and-set transitions
//! so every session finalizes exactly once.

use std::sync::Arc;

pub mod cleanup;
pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod service;
pub mod settlement;
pub mod store;
pub mod tokenization;
pub mod validation;

use gateway::SecurityGateway;
use store::SessionStore;

/// Shared handles for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SecurityGateway>,
    pub store: Arc<SessionStore>,
}
