use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
///
/// The image is encoded next to the target and renamed over it, so a
/// viewer polling the file always sees a complete image.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;

        let format = image::ImageFormat::from_path(path)?;
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".partial");
        let temp_path = path.with_file_name(temp_name);

        if let Err(e) = img.save_with_format(&temp_path, format) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}
