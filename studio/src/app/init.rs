//! Application initialization error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Generation worker error: {0}")]
    Worker(String),
    #[error(transparent)]
    Client(#[from] cadenza_core::GenerationError),
}
