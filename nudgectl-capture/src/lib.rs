//! nudgectl-capture: primary-display capture into temporary PNG files.
//!
//! This crate provides the capture side of nudgectl:
//! - [`ScreenCapturer`] grabs the primary monitor at full resolution
//! - [`ImageArtifact`] owns the resulting temporary PNG until it is deleted
//!
//! The [`Capturer`] trait is the seam the cycle controller depends on, so
//! tests can substitute synthetic frames for a real display.

pub mod artifact;
pub mod error;
pub mod screen;

// Re-export common types at crate root
pub use artifact::ImageArtifact;
pub use error::{Error, Result};
pub use screen::{capture_primary_display, Capturer, ScreenCapturer};
