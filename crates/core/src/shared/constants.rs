pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const AGE_MODEL_NAME: &str = "age_detection.onnx";
pub const GENDER_MODEL_NAME: &str = "gender_detection.onnx";

/// Output resolution of the recorded video and of every processed frame.
pub const OUTPUT_WIDTH: u32 = 640;
pub const OUTPUT_HEIGHT: u32 = 480;
pub const OUTPUT_FPS: f64 = 20.0;

/// Side length of the square crop fed to the age and gender classifiers.
pub const CLASSIFIER_INPUT_SIZE: u32 = 96;

/// Crops narrower or shorter than this never reach the classifiers.
pub const MIN_FACE_SIZE: u32 = 10;

/// Continuous presence required before predictions are logged.
pub const DEBOUNCE_SECONDS: f64 = 3.0;

pub const LOG_FILE_PREFIX: &str = "predictions_";
pub const LOG_HEADER: [&str; 3] = ["Timestamp", "Predicted_Age", "Predicted_Gender"];
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
