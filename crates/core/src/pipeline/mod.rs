pub mod capture_faces_use_case;
pub mod detection_session;
pub mod pipeline_logger;
