//! Face analysis backed by pretrained ONNX models (SCRFD + ArcFace).

mod align;
mod detector;
mod embedder;

use image::GrayImage;
use std::path::Path;

pub use detector::ScrfdDetector;
pub use embedder::{ArcFaceEmbedder, EMBEDDING_DIM};

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::encoding::Encoding;
use crate::types::{BoundingBox, Frame, Observation};

pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
pub const EMBEDDER_MODEL_FILE: &str = "w600k_r50.onnx";

/// Detector + embedder pair implementing [`FaceAnalyzer`].
pub struct OnnxAnalyzer {
    detector: ScrfdDetector,
    embedder: ArcFaceEmbedder,
}

impl OnnxAnalyzer {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, AnalyzerError> {
        let detector = ScrfdDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let embedder = ArcFaceEmbedder::load(&model_dir.join(EMBEDDER_MODEL_FILE))?;
        Ok(Self { detector, embedder })
    }
}

impl FaceAnalyzer for OnnxAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Observation>, AnalyzerError> {
        let faces = self.detector.detect(frame)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }
        let image = frame_image(frame)?;
        let embedder = &mut self.embedder;
        observe(faces, |region| embedder.embed(&image, region))
    }
}

/// Grayscale view of a frame's buffer.
fn frame_image(frame: &Frame) -> Result<GrayImage, AnalyzerError> {
    GrayImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(|| {
        AnalyzerError::InferenceFailed(format!(
            "frame buffer of {} bytes does not match {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        ))
    })
}

/// Encode each detected face in order. A face that cannot be cropped is
/// dropped; any other failure fails the frame.
fn observe<F>(faces: Vec<BoundingBox>, mut embed: F) -> Result<Vec<Observation>, AnalyzerError>
where
    F: FnMut(&BoundingBox) -> Result<Encoding, AnalyzerError>,
{
    let mut observations = Vec::with_capacity(faces.len());
    for region in faces {
        match embed(&region) {
            Ok(encoding) => observations.push(Observation { region, encoding }),
            Err(AnalyzerError::FaceOutsideFrame) => {
                tracing::warn!(x = region.x, y = region.y, "skipping face outside the frame");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(observations)
}
