pub mod annotation;
pub mod classification;
pub mod detection;
pub mod pipeline;
pub mod prediction_log;
pub mod reporting;
pub mod shared;
pub mod video;
