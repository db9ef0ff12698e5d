//! Temporary on-disk image for a single capture.

use crate::error::{Error, Result};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::Path;
use tempfile::TempPath;

const FILE_PREFIX: &str = "nudgectl-";
const FILE_SUFFIX: &str = ".png";

/// A captured frame stored as a uniquely named PNG file.
///
/// The file is removed by [`ImageArtifact::delete`], or when the artifact is
/// dropped if deletion was never requested explicitly.
#[derive(Debug)]
pub struct ImageArtifact {
    path: TempPath,
    width: u32,
    height: u32,
}

impl ImageArtifact {
    /// Encode `image` as PNG into a new file in the OS temporary directory.
    pub fn from_image(image: &RgbaImage) -> Result<Self> {
        Self::from_image_in(image, &std::env::temp_dir())
    }

    /// Encode `image` as PNG into a new file inside `dir`.
    pub fn from_image_in(image: &RgbaImage, dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| Error::ScreenshotFailed(format!("Failed to create temp file: {}", e)))?;

        // Close our handle before the encoder reopens the path
        let path = file.into_temp_path();
        image.save_with_format(&*path, ImageFormat::Png)?;

        Ok(Self {
            path,
            width: image.width(),
            height: image.height(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Read the encoded PNG bytes back from disk.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&*self.path)?)
    }

    /// Remove the file from disk.
    ///
    /// A file that is already gone counts as deleted.
    pub fn delete(self) -> std::io::Result<()> {
        match self.path.close() {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
