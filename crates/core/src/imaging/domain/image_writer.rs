use std::path::Path;

use crate::shared::frame::Frame;

/// Encodes a frame to an image file.
pub trait ImageWriter: Send {
    /// Writes `frame` to `path`, choosing the encoding from the path's
    /// extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
