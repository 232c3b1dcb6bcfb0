use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::live_view::LiveView;

/// Live view that keeps an image file updated with the latest annotated
/// frame. Any image viewer that reloads on change can display it.
pub struct SnapshotLiveView {
    path: PathBuf,
    writer: Box<dyn ImageWriter>,
    every: usize,
    shown: usize,
}

impl SnapshotLiveView {
    /// Writes one of every `every` frames to `path`.
    pub fn new(path: PathBuf, writer: Box<dyn ImageWriter>, every: usize) -> Self {
        Self {
            path,
            writer,
            every: every.max(1),
            shown: 0,
        }
    }
}

impl LiveView for SnapshotLiveView {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let due = self.shown % self.every == 0;
        self.shown += 1;
        if due {
            self.writer.write(&self.path, frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    struct RecordingWriter {
        written: Arc<Mutex<Vec<usize>>>,
    }

    impl ImageWriter for RecordingWriter {
        fn write(&self, _path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(frame.index());
            Ok(())
        }
    }

    struct FailingWriter;

    impl ImageWriter for FailingWriter {
        fn write(&self, _path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Err("disk full".into())
        }
    }

    #[test]
    fn test_writes_every_nth_frame() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut view = SnapshotLiveView::new(
            PathBuf::from("live.png"),
            Box::new(RecordingWriter {
                written: written.clone(),
            }),
            3,
        );
        for i in 0..7 {
            view.show(&Frame::blank(4, 4, i)).unwrap();
        }
        assert_eq!(*written.lock().unwrap(), vec![0, 3, 6]);
    }

    #[test]
    fn test_zero_interval_writes_every_frame() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut view = SnapshotLiveView::new(
            PathBuf::from("live.png"),
            Box::new(RecordingWriter {
                written: written.clone(),
            }),
            0,
        );
        view.show(&Frame::blank(4, 4, 0)).unwrap();
        view.show(&Frame::blank(4, 4, 1)).unwrap();
        assert_eq!(written.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_writer_error_propagates() {
        let mut view =
            SnapshotLiveView::new(PathBuf::from("live.png"), Box::new(FailingWriter), 1);
        assert!(view.show(&Frame::blank(4, 4, 0)).is_err());
    }

    #[test]
    fn test_writes_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.png");
        let mut view = SnapshotLiveView::new(
            path.clone(),
            Box::new(crate::video::infrastructure::image_file_writer::ImageFileWriter::new()),
            1,
        );
        view.show(&Frame::blank(16, 12, 0)).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (16, 12));
    }
}
