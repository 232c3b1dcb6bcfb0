pub mod ffmpeg_capture_source;
pub mod ffmpeg_writer;
pub mod image_file_writer;
pub mod snapshot_live_view;
