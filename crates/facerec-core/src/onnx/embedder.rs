//! ArcFace embedder via ONNX Runtime.
//!
//! Faces with keypoints are aligned onto the ArcFace template; faces without
//! them fall back to a square crop resized to 112×112. The model output is
//! L2-normalized into a 512-d encoding.

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

use super::align::{self, ALIGNED_SIZE};
use crate::analyzer::AnalyzerError;
use crate::encoding::Encoding;
use crate::types::BoundingBox;

const INPUT_SIZE: u32 = ALIGNED_SIZE;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 127.5;
pub const EMBEDDING_DIM: usize = 512;
/// Extra context around the detector box, as a fraction of its longer side.
const CROP_MARGIN: f32 = 0.1;

pub struct ArcFaceEmbedder {
    session: Session,
}

impl ArcFaceEmbedder {
    pub fn load(model_path: &Path) -> Result<Self, AnalyzerError> {
        if !model_path.exists() {
            return Err(AnalyzerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = %model_path.display(), "loaded ArcFace model");
        Ok(Self { session })
    }

    pub fn embed(&mut self, image: &GrayImage, face: &BoundingBox) -> Result<Encoding, AnalyzerError> {
        let crop = face_input(image, face)?;
        let input = to_tensor(&crop);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(AnalyzerError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(l2_normalize(raw))
    }
}

fn face_input(image: &GrayImage, face: &BoundingBox) -> Result<GrayImage, AnalyzerError> {
    if let Some(aligned) = face.landmarks.as_ref().and_then(|lm| align::align(image, lm)) {
        return Ok(aligned);
    }
    crop_face(image, face)
}

/// Square crop centred on the face box, clamped to the frame, resized to 112×112.
fn crop_face(image: &GrayImage, face: &BoundingBox) -> Result<GrayImage, AnalyzerError> {
    let (width, height) = image.dimensions();
    let side = face.width.max(face.height) * (1.0 + CROP_MARGIN * 2.0);
    let square = BoundingBox {
        x: face.x + face.width / 2.0 - side / 2.0,
        y: face.y + face.height / 2.0 - side / 2.0,
        width: side,
        height: side,
        confidence: face.confidence,
        landmarks: None,
    };

    let (left, top, right, bottom) = square
        .pixel_bounds(width, height)
        .ok_or(AnalyzerError::FaceOutsideFrame)?;

    let cropped = imageops::crop_imm(image, left, top, right - left, bottom - top).to_image();
    Ok(imageops::resize(&cropped, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle))
}

fn to_tensor(crop: &GrayImage) -> Array4<f32> {
    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, px) in crop.enumerate_pixels() {
        let v = (px.0[0] as f32 - PIXEL_MEAN) / PIXEL_STD;
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = v;
        }
    }
    tensor
}

fn l2_normalize(raw: &[f32]) -> Encoding {
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    let values = if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    };
    Encoding::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| image::Luma([((y * w + x) % 251) as u8]))
    }

    fn face(x: f32, y: f32, side: f32) -> BoundingBox {
        BoundingBox { x, y, width: side, height: side, confidence: 0.9, landmarks: None }
    }

    #[test]
    fn test_crop_face_output_size() {
        let face = BoundingBox { height: 60.0, ..face(40.0, 30.0, 50.0) };
        let crop = crop_face(&frame(160, 120), &face).unwrap();
        assert_eq!(crop.dimensions(), (INPUT_SIZE, INPUT_SIZE));
    }

    #[test]
    fn test_crop_face_at_edge_is_clamped() {
        assert!(crop_face(&frame(64, 64), &face(-20.0, -20.0, 40.0)).is_ok());
    }

    #[test]
    fn test_crop_face_outside_frame() {
        let err = crop_face(&frame(64, 64), &face(500.0, 500.0, 10.0)).unwrap_err();
        assert!(matches!(err, AnalyzerError::FaceOutsideFrame));
    }

    #[test]
    fn test_face_input_prefers_alignment() {
        let image = frame(200, 200);
        let region = BoundingBox {
            landmarks: Some([
                (80.0, 60.0),
                (120.0, 60.0),
                (100.0, 85.0),
                (85.0, 110.0),
                (115.0, 110.0),
            ]),
            ..face(60.0, 40.0, 80.0)
        };
        let expected = align::align(&image, region.landmarks.as_ref().unwrap()).unwrap();
        assert_eq!(face_input(&image, &region).unwrap(), expected);
    }

    #[test]
    fn test_face_input_without_landmarks_crops() {
        let image = frame(200, 200);
        let region = face(60.0, 40.0, 80.0);
        assert_eq!(face_input(&image, &region).unwrap(), crop_face(&image, &region).unwrap());
    }

    #[test]
    fn test_to_tensor_channels_identical() {
        let crop = GrayImage::from_pixel(INPUT_SIZE, INPUT_SIZE, image::Luma([200]));
        let t = to_tensor(&crop);
        assert_eq!(t.shape(), &[1, 3, 112, 112]);
        let expected = (200.0 - PIXEL_MEAN) / PIXEL_STD;
        for c in 0..3 {
            assert!((t[[0, c, 5, 7]] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_l2_normalize() {
        let e = l2_normalize(&[3.0, 4.0]);
        assert!((e.values[0] - 0.6).abs() < 1e-6);
        assert!((e.values[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(&[0.0, 0.0]).values, vec![0.0, 0.0]);
    }
}
