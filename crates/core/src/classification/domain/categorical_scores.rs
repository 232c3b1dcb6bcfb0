use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ClassificationError {
    #[error("classifier returned {actual} scores, expected {expected}")]
    WrongArity { expected: usize, actual: usize },
    #[error("classifier returned a NaN score at index {0}")]
    NotANumber(usize),
}

/// Output of an N-way classifier: one score per class, in model order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CategoricalScores<const N: usize>([f32; N]);

impl<const N: usize> CategoricalScores<N> {
    pub fn new(scores: [f32; N]) -> Result<Self, ClassificationError> {
        if let Some(i) = scores.iter().position(|s| s.is_nan()) {
            return Err(ClassificationError::NotANumber(i));
        }
        Ok(Self(scores))
    }

    /// Index of the highest score. Exact ties resolve to the lowest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, score) in self.0.iter().enumerate().skip(1) {
            if *score > self.0[best] {
                best = i;
            }
        }
        best
    }

    pub fn scores(&self) -> &[f32; N] {
        &self.0
    }
}

impl<const N: usize> TryFrom<&[f32]> for CategoricalScores<N> {
    type Error = ClassificationError;

    fn try_from(raw: &[f32]) -> Result<Self, Self::Error> {
        let scores: [f32; N] = raw.try_into().map_err(|_| ClassificationError::WrongArity {
            expected: N,
            actual: raw.len(),
        })?;
        Self::new(scores)
    }
}
