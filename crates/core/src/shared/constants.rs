pub const DEFAULT_CASCADE_PATH: &str = "haarcascade_frontalface_default.xml";
pub const DEFAULT_INPUT_PATH: &str = "input.jpg";
pub const DEFAULT_OUTPUT_PATH: &str = "output_faces.jpg";

/// Bounding-box stroke colour (RGB, light green).
pub const BOX_COLOR: [u8; 3] = [50, 255, 50];

/// Bounding-box stroke thickness in pixels.
pub const BOX_THICKNESS: u32 = 3;

/// Pyramid step between detection scales.
pub const SCALE_FACTOR: f64 = 1.1;

/// A candidate group needs more than this many raw hits to survive.
pub const MIN_NEIGHBORS: usize = 3;

/// Relative tolerance used when grouping overlapping candidates.
pub const GROUP_EPS: f64 = 0.2;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
