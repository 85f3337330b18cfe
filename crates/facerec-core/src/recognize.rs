//! Live recognition: label every face in a frame against the cache.

use crate::analyzer::FaceAnalyzer;
use crate::cache::EncodingCache;
use crate::error::FaceRecError;
use crate::matcher::Matcher;
use crate::source::FrameSource;
use crate::types::{Frame, Label, LabeledFace, Observation};

/// Label each observation with the first cache entry that matches it.
///
/// This is first-match in cache order, not nearest-neighbour: when two
/// identities both fall within the matcher's threshold, the one inserted
/// into the cache earlier wins.
pub fn match_faces<M>(
    observations: &[Observation],
    cache: &EncodingCache,
    matcher: &M,
) -> Vec<LabeledFace>
where
    M: Matcher + ?Sized,
{
    observations
        .iter()
        .map(|obs| {
            let label = cache
                .iter()
                .find(|(_, reference)| matcher.matches(reference, &obs.encoding))
                .map(|(name, _)| Label::Known(name.to_string()))
                .unwrap_or(Label::Unknown);
            LabeledFace { label, region: obs.region.clone() }
        })
        .collect()
}

/// One processed frame and the faces found in it.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: Frame,
    pub faces: Vec<LabeledFace>,
}

/// Consecutive failed camera reads tolerated before a session gives up.
pub const DEFAULT_MAX_CAPTURE_FAILURES: u32 = 25;

/// A running recognition loop's state: the camera and the analyzer.
///
/// Each [`tick`](Self::tick) is one complete capture + match cycle. Dropping
/// the session releases the camera.
pub struct RecognitionSession<S, A> {
    source: S,
    analyzer: A,
    ticks: u64,
    dropped: u64,
    consecutive_failures: u32,
    max_capture_failures: u32,
}

impl<S: FrameSource, A: FaceAnalyzer> RecognitionSession<S, A> {
    pub fn new(source: S, analyzer: A) -> Self {
        Self {
            source,
            analyzer,
            ticks: 0,
            dropped: 0,
            consecutive_failures: 0,
            max_capture_failures: DEFAULT_MAX_CAPTURE_FAILURES,
        }
    }

    /// Fail the session after `limit` failed reads in a row (at least 1).
    pub fn with_max_capture_failures(mut self, limit: u32) -> Self {
        self.max_capture_failures = limit.max(1);
        self
    }

    /// Capture one frame and label the faces in it.
    ///
    /// A dropped frame or an analyzer failure skips the tick with `Ok(None)`.
    /// Once the camera has failed `max_capture_failures` times in a row the
    /// last [`CaptureError`](crate::CaptureError) is returned instead.
    pub fn tick<M>(
        &mut self,
        cache: &EncodingCache,
        matcher: &M,
    ) -> Result<Option<FrameReport>, FaceRecError>
    where
        M: Matcher + ?Sized,
    {
        self.ticks += 1;

        let frame = match self.source.capture() {
            Ok(frame) => {
                self.consecutive_failures = 0;
                frame
            }
            Err(e) => {
                self.dropped += 1;
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.max_capture_failures {
                    tracing::error!(
                        error = %e,
                        failures = self.consecutive_failures,
                        "recognize: camera stopped delivering frames"
                    );
                    return Err(FaceRecError::Capture(e));
                }
                tracing::warn!(
                    error = %e,
                    tick = self.ticks,
                    failures = self.consecutive_failures,
                    "recognize: dropped frame"
                );
                return Ok(None);
            }
        };

        let observations = match self.analyzer.analyze(&frame) {
            Ok(obs) => obs,
            Err(e) => {
                self.dropped += 1;
                tracing::warn!(error = %e, seq = frame.sequence, "recognize: analyzer failed");
                return Ok(None);
            }
        };

        let faces = match_faces(&observations, cache, matcher);
        for face in &faces {
            tracing::trace!(label = %face.label, x = face.region.x, y = face.region.y, "face");
        }

        Ok(Some(FrameReport { frame, faces }))
    }

    /// Ticks attempted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks that produced no report.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// End the session, handing back the collaborators.
    pub fn into_parts(self) -> (S, A) {
        (self.source, self.analyzer)
    }
}
