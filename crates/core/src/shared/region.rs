/// A detected face: axis-aligned bounding box in frame pixels plus the
/// detector's confidence score.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f64,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Builds a region from `(x1, y1)`-`(x2, y2)` corner coordinates, the
    /// convention most detectors report in.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Self {
        let x = x1.round() as i32;
        let y = y1.round() as i32;
        Self {
            x,
            y,
            width: x2.round() as i32 - x,
            height: y2.round() as i32 - y,
            confidence,
        }
    }

    /// Intersects the region with a `frame_w` x `frame_h` frame.
    ///
    /// Returns `(x, y, width, height)` in unsigned pixels, or `None` when
    /// nothing of the box is visible.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x.clamp(0, frame_w as i32);
        let y1 = self.y.clamp(0, frame_h as i32);
        let x2 = (self.x + self.width).clamp(0, frame_w as i32);
        let y2 = (self.y + self.height).clamp(0, frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}
