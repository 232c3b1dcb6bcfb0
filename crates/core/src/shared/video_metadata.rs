/// Geometry and rate of a frame stream, shared by the capture source and
/// the recorded output.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Device or file the stream was opened from, for log messages.
    pub source: Option<String>,
}

impl VideoMetadata {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            source: None,
        }
    }

    /// Frame rate rounded to a whole number, falling back to 30 when the
    /// source reports none.
    pub fn integral_fps(&self) -> i32 {
        let fps = self.fps.round() as i32;
        if fps <= 0 {
            30
        } else {
            fps
        }
    }
}
