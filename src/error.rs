//! Error types for the order book and the engine service

use crate::validation::ValidationError;
use thiserror::Error;

/// Errors returned by `OrderBook::submit`
///
/// Cancelling an unknown order is not an error; `cancel` reports it as `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] ValidationError),
}

/// Errors raised by the matching engine service
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("matching engine command channel closed")]
    Closed,

    #[error("failed to spawn matching engine worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("matching engine worker panicked")]
    WorkerPanicked,
}
