use crate::shared::frame::Frame;

/// Optional live display of annotated frames while capturing.
pub trait LiveView: Send {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
