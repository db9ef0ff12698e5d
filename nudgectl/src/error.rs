//! Error types and Result alias for nudgectl.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(#[from] nudgectl_capture::Error),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API error: {message}")]
    Response { message: String, payload: String },

    #[error("Presentation failed: {0}")]
    Presentation(String),

    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

/// How the cycle controller reacts to an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Stop the loop and exit non-zero.
    Fatal,
    /// Show the fallback suggestion and keep going.
    Recoverable,
    /// Log and ignore.
    BestEffort,
}

impl Error {
    pub(crate) fn response(message: impl Into<String>, payload: impl Into<String>) -> Self {
        Error::Response {
            message: message.into(),
            payload: payload.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Error::Config(_) | Error::Capture(_) => Severity::Fatal,
            Error::Transport(_) | Error::Response { .. } => Severity::Recoverable,
            Error::Presentation(_) | Error::Cleanup(_) => Severity::BestEffort,
        }
    }

    /// Raw response body for [`Error::Response`], if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Error::Response { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
