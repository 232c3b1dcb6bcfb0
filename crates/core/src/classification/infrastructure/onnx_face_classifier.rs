/// Age/gender classifier backed by an ONNX Runtime session.
///
/// Expects a model with a single `[1, H, W, 3]` float input and a single
/// `[1, N]` probability output, the shape of the Keras age and gender
/// models after ONNX conversion.
use std::path::Path;

use ndarray::Array4;

use crate::classification::domain::categorical_scores::CategoricalScores;
use crate::classification::domain::face_classifier::FaceClassifier;
use crate::shared::constants::CLASSIFIER_INPUT_SIZE;

pub struct OnnxFaceClassifier<const N: usize> {
    session: ort::session::Session,
    input_size: u32,
}

impl<const N: usize> OnnxFaceClassifier<N> {
    /// Load the model. The crop size is read from the model's NHWC input
    /// shape and falls back to 96 when the shape is dynamic.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() == 4 && shape[1] > 0 =>
                {
                    Some(shape[1] as u32)
                }
                _ => None,
            })
            .unwrap_or(CLASSIFIER_INPUT_SIZE);

        log::debug!(
            "Loaded {}-way classifier from {} (input {input_size}x{input_size})",
            N,
            model_path.display()
        );

        Ok(Self {
            session,
            input_size,
        })
    }

    /// Side length the face crop should be normalized to.
    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl<const N: usize> FaceClassifier<N> for OnnxFaceClassifier<N> {
    fn classify(
        &mut self,
        face: &Array4<f32>,
    ) -> Result<CategoricalScores<N>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(face.clone())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("classifier produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let raw: Vec<f32> = tensor.iter().copied().collect();
        Ok(CategoricalScores::try_from(raw.as_slice())?)
    }
}
