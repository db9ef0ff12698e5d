//! Primary-display capture.

use crate::artifact::ImageArtifact;
use crate::error::{Error, Result};
use image::RgbaImage;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Produces one still image of the screen per call.
pub trait Capturer {
    fn capture(&self) -> Result<ImageArtifact>;
}

/// Captures the primary monitor into the OS temporary directory.
#[derive(Clone, Debug, Default)]
pub struct ScreenCapturer {
    temp_dir: Option<PathBuf>,
}

impl ScreenCapturer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write artifacts into `dir` instead of the OS temporary directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Capturer for ScreenCapturer {
    fn capture(&self) -> Result<ImageArtifact> {
        let start = Instant::now();
        let frame = capture_primary_display()?;
        let grabbed = start.elapsed();

        let artifact = match &self.temp_dir {
            Some(dir) => ImageArtifact::from_image_in(&frame, dir)?,
            None => ImageArtifact::from_image(&frame)?,
        };

        debug!(
            "Captured {}x{} to {} (grab {:?}, total {:?})",
            frame.width(),
            frame.height(),
            artifact.path().display(),
            grabbed,
            start.elapsed()
        );
        Ok(artifact)
    }
}

/// Grab the primary monitor at native resolution.
///
/// Falls back to the first enumerated monitor when none reports itself as
/// primary.
#[cfg(feature = "desktop")]
pub fn capture_primary_display() -> Result<RgbaImage> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| Error::NoDisplay(format!("Failed to enumerate monitors: {}", e)))?;

    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| Error::NoDisplay("No monitors found".to_string()))?;

    let raw = monitor
        .capture_image()
        .map_err(|e| Error::ScreenshotFailed(format!("Screen capture failed: {}", e)))?;

    let (width, height) = (raw.width(), raw.height());
    if width == 0 || height == 0 {
        return Err(Error::ScreenshotFailed(
            "Captured empty screenshot - possible permission issue or no display".to_string(),
        ));
    }

    // Re-pack through the raw buffer so we don't depend on xcap's image version
    RgbaImage::from_raw(width, height, raw.into_raw())
        .ok_or_else(|| Error::ScreenshotFailed("Failed to create image buffer".into()))
}

#[cfg(not(feature = "desktop"))]
pub fn capture_primary_display() -> Result<RgbaImage> {
    Err(Error::NoDisplay(
        "nudgectl-capture was built without the `desktop` feature".to_string(),
    ))
}
