//! Haar-cascade face detector running the cascade over an image pyramid.
//!
//! Multi-scale sliding-window search with the stock parameters: scale step
//! 1.1, three neighbours, 0.2 grouping tolerance. There is no minimum size
//! and the full image is the maximum size.

use std::path::Path;

use image::imageops::interpolate_bilinear;
use image::{GrayImage, Luma};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{GROUP_EPS, MIN_NEIGHBORS, SCALE_FACTOR};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::haar_cascade::{CascadeError, HaarCascade, WindowVerdict};
use super::integral_image::IntegralImage;
use super::rect_grouping::group_rectangles;

/// Pyramid scale above which every pixel position is scanned.
const DENSE_SCAN_FACTOR: f64 = 2.0;

pub struct CascadeFaceDetector {
    cascade: HaarCascade,
}

impl CascadeFaceDetector {
    pub fn new(cascade: HaarCascade) -> Self {
        Self { cascade }
    }

    /// Loads the cascade definition at `path`.
    ///
    /// Fails with [`CascadeError::NotFound`] before touching anything else
    /// when the file is absent.
    pub fn from_file(path: &Path) -> Result<Self, CascadeError> {
        let cascade = HaarCascade::load(path)?;
        let (w, h) = cascade.window_size();
        log::info!(
            "Loaded cascade classifier from {} ({} stages, {} features, {w}x{h} window)",
            path.display(),
            cascade.stages().len(),
            cascade.features().len(),
        );
        Ok(Self::new(cascade))
    }

    /// Raw accepted windows across all pyramid levels, in original image
    /// coordinates, before grouping.
    pub fn detect_candidates(&self, luma: &GrayImage) -> Vec<Region> {
        let (img_w, img_h) = luma.dimensions();
        let (win_w, win_h) = self.cascade.window_size();
        let mut hits = Vec::new();

        let mut factor = 1.0f64;
        loop {
            let window_w = (win_w as f64 * factor).round() as u32;
            let window_h = (win_h as f64 * factor).round() as u32;
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            if scaled_w <= win_w || scaled_h <= win_h {
                break;
            }
            if window_w > img_w || window_h > img_h {
                break;
            }

            let resized;
            let level = if scaled_w == img_w && scaled_h == img_h {
                luma
            } else {
                resized = resize_bilinear(luma, scaled_w, scaled_h);
                &resized
            };
            let integral = IntegralImage::new(level.as_raw(), scaled_w as usize, scaled_h as usize);

            let step = if factor > DENSE_SCAN_FACTOR { 1 } else { 2 };
            // Windows may sit flush with the right and bottom edges.
            let span_x = (scaled_w - win_w + 1) as usize;
            let span_y = (scaled_h - win_h + 1) as usize;
            let before = hits.len();

            let mut y = 0;
            while y < span_y {
                let mut x = 0;
                while x < span_x {
                    match self.cascade.classify(&integral, x, y) {
                        WindowVerdict::Accepted => hits.push(Region::new(
                            (x as f64 * factor).round() as i32,
                            (y as f64 * factor).round() as i32,
                            window_w as i32,
                            window_h as i32,
                        )),
                        // Rejected outright: the neighbour is very likely too.
                        WindowVerdict::Rejected { stage: 0 } => x += step,
                        WindowVerdict::Rejected { .. } => {}
                    }
                    x += step;
                }
                y += step;
            }

            log::trace!(
                "scale {factor:.3}: {scaled_w}x{scaled_h}, {} hits",
                hits.len() - before
            );
            factor *= SCALE_FACTOR;
        }

        hits
    }
}

/// Point-sampled bilinear resize with half-pixel centres and no
/// anti-aliasing, so downscaled levels keep the source's sharpness.
fn resize_bilinear(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = src.dimensions();
    let fx = src_w as f32 / width as f32;
    let fy = src_h as f32 / height as f32;
    let max_x = (src_w - 1) as f32;
    let max_y = (src_h - 1) as f32;
    GrayImage::from_fn(width, height, |dx, dy| {
        let sx = ((dx as f32 + 0.5) * fx - 0.5).clamp(0.0, max_x);
        let sy = ((dy as f32 + 0.5) * fy - 0.5).clamp(0.0, max_y);
        interpolate_bilinear(src, sx, sy).unwrap_or(Luma([0]))
    })
}

impl FaceDetector for CascadeFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let luma = GrayImage::from_raw(frame.width(), frame.height(), frame.to_luma())
            .ok_or("Frame data does not match its dimensions")?;
        log::debug!("Running cascade on unequalized luminance");

        let candidates = self.detect_candidates(&luma);
        let faces = group_rectangles(&candidates, MIN_NEIGHBORS, GROUP_EPS);
        log::debug!(
            "{} raw windows grouped into {} faces",
            candidates.len(),
            faces.len()
        );
        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::fixtures::{
        accept_all_xml, reject_all_xml,
    };

    fn detector(xml: &str) -> CascadeFaceDetector {
        CascadeFaceDetector::new(HaarCascade::from_xml_str(xml).unwrap())
    }

    fn make_frame(w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h * 3) as usize], w, h, 3)
    }

    #[test]
    fn test_from_file_missing_is_not_found() {
        let result = CascadeFaceDetector::from_file(Path::new("/nonexistent/faces.xml"));
        assert!(matches!(result, Err(CascadeError::NotFound(_))));
    }

    #[test]
    fn test_from_file_loads_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.xml");
        std::fs::write(&path, accept_all_xml(10)).unwrap();
        let mut detector = CascadeFaceDetector::from_file(&path).unwrap();
        assert!(!detector.detect(&make_frame(20, 20, 90)).unwrap().is_empty());
    }

    #[test]
    fn test_reject_all_finds_nothing() {
        let mut d = detector(&reject_all_xml(10));
        let faces = d.detect(&make_frame(64, 48, 120)).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_accept_all_yields_grouped_faces() {
        let mut d = detector(&accept_all_xml(10));
        let frame = make_frame(40, 40, 90);
        let luma = GrayImage::from_raw(40, 40, frame.to_luma()).unwrap();
        let raw = d.detect_candidates(&luma);
        let faces = d.detect(&frame).unwrap();
        assert!(!faces.is_empty());
        assert!(faces.len() < raw.len());
    }

    #[test]
    fn test_first_scale_scans_every_other_position() {
        // 20x20 image, 10x10 window: positions 0..=10, step 2 → {0, 2, .., 10}
        let d = detector(&accept_all_xml(10));
        let luma = GrayImage::from_pixel(20, 20, image::Luma([128]));
        let raw = d.detect_candidates(&luma);
        let first_scale: Vec<&Region> = raw.iter().filter(|r| r.width == 10).collect();
        assert_eq!(first_scale.len(), 36);
        assert!(first_scale.iter().all(|r| r.x % 2 == 0 && r.y % 2 == 0));
        assert!(first_scale.iter().all(|r| r.x <= 10 && r.y <= 10));
    }

    #[test]
    fn test_windows_flush_with_bottom_right_edge_are_scanned() {
        let d = detector(&accept_all_xml(10));
        let luma = GrayImage::from_pixel(20, 20, image::Luma([128]));
        let raw = d.detect_candidates(&luma);
        assert!(raw.contains(&Region::new(10, 10, 10, 10)));
        assert!(raw.contains(&Region::new(10, 0, 10, 10)));
        assert!(raw.contains(&Region::new(0, 10, 10, 10)));
    }

    #[test]
    fn test_resize_samples_without_smoothing() {
        // 9 -> 3 columns: output centre maps exactly onto source column 4.
        let mut src = GrayImage::new(9, 1);
        src.put_pixel(4, 0, image::Luma([90]));
        let level = resize_bilinear(&src, 3, 1);
        assert_eq!(level.as_raw(), &vec![0, 90, 0]);
    }

    #[test]
    fn test_resize_identity_keeps_pixels() {
        let src = GrayImage::from_fn(5, 4, |x, y| image::Luma([(x * 40 + y * 7) as u8]));
        assert_eq!(resize_bilinear(&src, 5, 4), src);
    }

    #[test]
    fn test_larger_scales_use_larger_windows() {
        let d = detector(&accept_all_xml(10));
        let luma = GrayImage::from_pixel(40, 40, image::Luma([128]));
        let raw = d.detect_candidates(&luma);
        let max_window = raw.iter().map(|r| r.width).max().unwrap();
        assert!(max_window > 10);
        assert!(max_window <= 40);
        assert!(raw.iter().all(|r| r.width == r.height));
    }

    #[test]
    fn test_image_not_larger_than_window_is_skipped() {
        let d = detector(&accept_all_xml(10));
        let luma = GrayImage::from_pixel(10, 30, image::Luma([128]));
        assert!(d.detect_candidates(&luma).is_empty());
    }

    #[test]
    fn test_detect_accepts_single_channel_frame() {
        let mut d = detector(&accept_all_xml(10));
        let frame = Frame::new(vec![0; 20 * 20], 20, 20, 1);
        assert!(d.detect(&frame).is_ok());
    }
}
