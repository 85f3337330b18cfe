//! Face detection + encoding collaborator.

use thiserror::Error;

use crate::types::{Frame, Observation};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model file not found: {0} — download from insightface and place in the model dir")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face region lies outside the frame")]
    FaceOutsideFrame,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Finds faces in a frame and produces one encoding per face.
///
/// Observations are returned highest-confidence first. An empty vector means
/// no face was found and is not an error.
pub trait FaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Observation>, AnalyzerError>;
}

impl<A: FaceAnalyzer + ?Sized> FaceAnalyzer for &mut A {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Observation>, AnalyzerError> {
        (**self).analyze(frame)
    }
}

impl<A: FaceAnalyzer + ?Sized> FaceAnalyzer for Box<A> {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Observation>, AnalyzerError> {
        (**self).analyze(frame)
    }
}
