pub mod active_window;
pub mod prediction_log;
pub mod prediction_record;
