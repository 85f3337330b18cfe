use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::encoding::Encoding;

/// Five facial keypoints: left eye, right eye, nose, left and right mouth corner.
pub type Landmarks = [(f32, f32); 5];

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Present when the detector also predicts keypoints.
    #[serde(default)]
    pub landmarks: Option<Landmarks>,
}

impl BoundingBox {
    /// Clamp to integer pixel bounds `(left, top, right, bottom)` inside a
    /// `width` × `height` frame. Returns `None` for an empty intersection.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let left = self.x.max(0.0).floor() as u32;
        let top = self.y.max(0.0).floor() as u32;
        let right = ((self.x + self.width).ceil().max(0.0) as u32).min(width);
        let bottom = ((self.y + self.height).ceil().max(0.0) as u32).min(height);
        (left < right && top < bottom).then_some((left, top, right, bottom))
    }
}

/// A captured 8-bit grayscale camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
    pub is_dark: bool,
}

/// User-entered metadata for a person being enrolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub age: i64,
    pub email: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("email must not be empty")]
    EmptyEmail,
}

impl Identity {
    /// Reject blank names or emails.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.name.trim().is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if self.email.trim().is_empty() {
            return Err(IdentityError::EmptyEmail);
        }
        Ok(())
    }
}

/// A persisted identity with its reference encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub identity: Identity,
    pub reference_encoding: Encoding,
}

/// A face seen in one frame. Never persisted.
#[derive(Debug, Clone)]
pub struct Observation {
    pub region: BoundingBox,
    pub encoding: Encoding,
}

/// Outcome of matching one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Known(name) => Some(name),
            Label::Unknown => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Known(name) => f.write_str(name),
            Label::Unknown => f.write_str("Unknown"),
        }
    }
}

/// A labeled face region, ready for annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledFace {
    pub label: Label,
    pub region: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence: 1.0, landmarks: None }
    }

    #[test]
    fn test_pixel_bounds_inside() {
        assert_eq!(bbox(10.2, 20.7, 30.0, 40.0).pixel_bounds(640, 480), Some((10, 20, 41, 61)));
    }

    #[test]
    fn test_pixel_bounds_clamped() {
        assert_eq!(bbox(-5.0, -5.0, 20.0, 20.0).pixel_bounds(10, 10), Some((0, 0, 10, 10)));
    }

    #[test]
    fn test_pixel_bounds_outside() {
        assert_eq!(bbox(100.0, 100.0, 5.0, 5.0).pixel_bounds(50, 50), None);
    }

    #[test]
    fn test_identity_validate() {
        let ok = Identity { name: "Alice".into(), age: 30, email: "a@example.com".into() };
        assert!(ok.validate().is_ok());
        let blank = Identity { name: "  ".into(), ..ok.clone() };
        assert_eq!(blank.validate(), Err(IdentityError::EmptyName));
        let no_email = Identity { email: String::new(), ..ok };
        assert_eq!(no_email.validate(), Err(IdentityError::EmptyEmail));
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Known("Bob".into()).to_string(), "Bob");
        assert_eq!(Label::Unknown.to_string(), "Unknown");
        assert_eq!(Label::Unknown.name(), None);
    }
}
