use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::drawing::domain::box_renderer::BoxRenderer;
use crate::shared::constants::{BOX_COLOR, BOX_THICKNESS};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Draws unfilled rectangle outlines with corners at `(x, y)` and
/// `(x + width, y + height)`.
///
/// The stroke is centred on the outline: thickness 3 paints one pixel on
/// either side of it. Strokes are clipped at the frame edges.
pub struct OutlineRenderer {
    color: [u8; 3],
    thickness: u32,
}

impl OutlineRenderer {
    pub fn new(color: [u8; 3], thickness: u32) -> Self {
        Self { color, thickness }
    }
}

impl Default for OutlineRenderer {
    fn default() -> Self {
        Self::new(BOX_COLOR, BOX_THICKNESS)
    }
}

impl BoxRenderer for OutlineRenderer {
    fn draw(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("Expected an RGB frame, got {} channels", frame.channels()).into());
        }
        if regions.is_empty() {
            return Ok(());
        }
        let mut canvas = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Frame data does not match its dimensions")?;

        let color = Rgb(self.color);
        let inner = (self.thickness / 2) as i32;
        let outer = self.thickness as i32 - 1 - inner;
        for r in regions {
            // Offset d grows the outline outwards (d > 0) or inwards (d < 0).
            for d in -inner..=outer {
                let w = r.width + 1 + 2 * d;
                let h = r.height + 1 + 2 * d;
                if w <= 0 || h <= 0 {
                    continue;
                }
                let rect = Rect::at(r.x - d, r.y - d).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
        frame.data_mut().copy_from_slice(canvas.as_raw());
        Ok(())
    }
}
