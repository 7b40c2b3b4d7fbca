use std::path::Path;

use image::ImageFormat;

use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Writes a frame to an image file using the `image` crate.
///
/// The format is inferred from the extension. The parent directory must
/// already exist.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(format!(
                "Unsupported output extension '{extension}' (expected one of: {})",
                IMAGE_EXTENSIONS.join(", ")
            )
            .into());
        }
        let format = ImageFormat::from_path(path)?;

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        img.save_with_format(path, format)?;
        Ok(())
    }
}
