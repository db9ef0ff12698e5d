//! Error types for nudgectl-capture.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No display available: {0}")]
    NoDisplay(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
