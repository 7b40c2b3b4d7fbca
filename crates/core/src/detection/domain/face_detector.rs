use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for face detection: given a frame, produce the face
/// bounding boxes found in it.
///
/// Implementations may keep scratch state between calls, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
