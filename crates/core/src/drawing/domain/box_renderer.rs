use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for marking regions on a frame.
///
/// Implementations modify the frame in-place (`&mut Frame`) to avoid allocation.
pub trait BoxRenderer: Send {
    fn draw(&self, frame: &mut Frame, regions: &[Region])
        -> Result<(), Box<dyn std::error::Error>>;
}
