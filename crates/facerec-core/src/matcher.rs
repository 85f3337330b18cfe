//! Match decisions between a reference encoding and a candidate.

use crate::encoding::Encoding;

/// Default Euclidean tolerance for 128-d dlib-style encodings.
pub const DEFAULT_DISTANCE_TOLERANCE: f32 = 0.6;
/// Default cosine threshold for L2-normalized ArcFace embeddings.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.40;

/// Boolean "same person" decision for one reference/candidate pair.
///
/// Encodings of different dimensionality never match.
pub trait Matcher {
    fn matches(&self, reference: &Encoding, candidate: &Encoding) -> bool;
}

/// Match when Euclidean distance is within `tolerance`.
#[derive(Debug, Clone, Copy)]
pub struct DistanceMatcher {
    pub tolerance: f32,
}

impl Default for DistanceMatcher {
    fn default() -> Self {
        Self { tolerance: DEFAULT_DISTANCE_TOLERANCE }
    }
}

impl Matcher for DistanceMatcher {
    fn matches(&self, reference: &Encoding, candidate: &Encoding) -> bool {
        reference
            .euclidean_distance(candidate)
            .is_some_and(|d| d <= self.tolerance)
    }
}

/// Match when cosine similarity reaches `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct CosineMatcher {
    pub threshold: f32,
}

impl Default for CosineMatcher {
    fn default() -> Self {
        Self { threshold: DEFAULT_SIMILARITY_THRESHOLD }
    }
}

impl Matcher for CosineMatcher {
    fn matches(&self, reference: &Encoding, candidate: &Encoding) -> bool {
        reference
            .similarity(candidate)
            .is_some_and(|s| s >= self.threshold)
    }
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn matches(&self, reference: &Encoding, candidate: &Encoding) -> bool {
        (**self).matches(reference, candidate)
    }
}
