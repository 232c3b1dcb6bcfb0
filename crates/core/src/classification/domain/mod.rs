pub mod categorical_scores;
pub mod demographics;
pub mod face_classifier;
pub mod face_crop;
