pub mod prediction_summary;
pub mod report_renderer;
