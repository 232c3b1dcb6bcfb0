use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// A live or recorded stream of frames, read one at a time.
///
/// Frames come out as RGB24 at the size reported by `open`. The capture
/// loop owns the source for the whole session and always calls `close`,
/// including after errors.
pub trait CaptureSource: Send {
    /// Opens the device or file and returns the geometry of the frames
    /// `read` will produce.
    fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Blocks until the next frame is available.
    ///
    /// `Ok(None)` means the stream is exhausted. An `Err` may be transient;
    /// the caller decides whether to retry.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}
