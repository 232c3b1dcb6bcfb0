use ndarray::Array4;

use super::categorical_scores::CategoricalScores;
use super::demographics::{AGE_BUCKET_COUNT, GENDER_COUNT};

/// Domain interface for an N-way face attribute classifier.
///
/// Input is a normalized `[1, H, W, 3]` face crop as produced by
/// [`super::face_crop::normalize`].
pub trait FaceClassifier<const N: usize>: Send {
    fn classify(
        &mut self,
        face: &Array4<f32>,
    ) -> Result<CategoricalScores<N>, Box<dyn std::error::Error>>;
}

pub type AgeClassifier = dyn FaceClassifier<AGE_BUCKET_COUNT>;
pub type GenderClassifier = dyn FaceClassifier<GENDER_COUNT>;
