/// An axis-aligned face bounding box in pixel coordinates, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge (`x + width`).
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge (`y + height`).
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Two boxes are similar when each of their four edges lies within
    /// `eps * (min width + min height) / 2` of the other's.
    pub fn is_similar(&self, other: &Region, eps: f64) -> bool {
        let delta = eps
            * (self.width.min(other.width) + self.height.min(other.height)) as f64
            * 0.5;
        (self.x - other.x).abs() as f64 <= delta
            && (self.y - other.y).abs() as f64 <= delta
            && (self.right() - other.right()).abs() as f64 <= delta
            && (self.bottom() - other.bottom()).abs() as f64 <= delta
    }

    /// Whether `self` fits inside `outer` grown by `eps` of its size on
    /// every side.
    pub fn is_inside(&self, outer: &Region, eps: f64) -> bool {
        let dx = (outer.width as f64 * eps).round() as i32;
        let dy = (outer.height as f64 * eps).round() as i32;
        self.x >= outer.x - dx
            && self.y >= outer.y - dy
            && self.right() <= outer.right() + dx
            && self.bottom() <= outer.bottom() + dy
    }
}
