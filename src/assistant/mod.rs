pub mod client;
pub mod generator;

pub use client::{AssistantApi, OpenAiClient};
pub use generator::{CardGenerator, GeneratedCard, GenerationOptions, Question, ANY_COUNT};

use thiserror::Error;

/// Errors from the external assistant service and the generation job.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("assistant API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed assistant response: {0}")]
    MalformedResponse(String),

    #[error("generation job exceeded its deadline")]
    Timeout,

    #[error("generation job was cancelled")]
    Cancelled,
}
