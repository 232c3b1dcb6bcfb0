pub mod capture_source;
pub mod image_writer;
pub mod live_view;
pub mod video_writer;
