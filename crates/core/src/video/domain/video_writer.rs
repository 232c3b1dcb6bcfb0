use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Persists the annotated frame sequence of a capture session.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Frames must match the size passed to `open`.
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered packets and finalizes the container. Safe to call
    /// more than once.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
