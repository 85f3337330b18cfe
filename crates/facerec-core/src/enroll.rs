//! Enrollment: capture a burst, average the usable samples, persist.

use crate::analyzer::FaceAnalyzer;
use crate::cache::EncodingCache;
use crate::encoding::Encoding;
use crate::error::FaceRecError;
use crate::source::{CaptureError, FrameSource};
use crate::store::EncodingStore;
use crate::types::Identity;

/// Frames captured per enrollment burst.
pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// Result of a successful enrollment.
#[derive(Debug, Clone)]
pub struct EnrollReport {
    pub name: String,
    pub frames_captured: usize,
    pub samples_used: usize,
    pub encoding: Encoding,
}

/// Encodings gathered from one capture burst.
#[derive(Debug, Default)]
pub struct SampleBurst {
    pub samples: Vec<Encoding>,
    pub frames_captured: usize,
    pub dark_skipped: usize,
}

/// Capture `count` frames and keep the first face's encoding from each.
///
/// Frames with no face (or where the analyzer fails) are skipped. A capture
/// failure aborts the whole burst.
pub fn collect_samples<S, A>(
    source: &mut S,
    analyzer: &mut A,
    count: usize,
) -> Result<SampleBurst, CaptureError>
where
    S: FrameSource + ?Sized,
    A: FaceAnalyzer + ?Sized,
{
    let mut burst = SampleBurst::default();

    for i in 0..count {
        let frame = source.capture()?;
        burst.frames_captured += 1;

        if frame.is_dark {
            burst.dark_skipped += 1;
            tracing::debug!(frame = i, seq = frame.sequence, "enroll: skipping dark frame");
            continue;
        }

        match analyzer.analyze(&frame) {
            Ok(faces) => match faces.into_iter().next() {
                Some(face) => burst.samples.push(face.encoding),
                None => tracing::debug!(frame = i, "enroll: no face in frame"),
            },
            Err(e) => {
                tracing::warn!(frame = i, error = %e, "enroll: analyzer failed, skipping frame");
            }
        }
    }

    Ok(burst)
}

/// Enroll `identity` from a burst of `sample_count` frames.
///
/// On success the averaged encoding is saved to `store` and written into
/// `cache` under the identity's name. On any error nothing is written.
pub fn enroll<S, A, St>(
    source: &mut S,
    analyzer: &mut A,
    store: &St,
    cache: &mut EncodingCache,
    identity: &Identity,
    sample_count: usize,
) -> Result<EnrollReport, FaceRecError>
where
    S: FrameSource + ?Sized,
    A: FaceAnalyzer + ?Sized,
    St: EncodingStore + ?Sized,
{
    identity.validate()?;

    let burst = collect_samples(source, analyzer, sample_count)?;
    tracing::debug!(
        captured = burst.frames_captured,
        usable = burst.samples.len(),
        dark_skipped = burst.dark_skipped,
        "enroll: burst complete"
    );

    if burst.samples.is_empty() {
        return Err(FaceRecError::NoFaceDetected);
    }

    let encoding = Encoding::mean(&burst.samples)?;
    store.save(identity, &encoding)?;
    cache.insert(identity.name.clone(), encoding.clone());

    tracing::info!(
        name = %identity.name,
        samples = burst.samples.len(),
        dim = encoding.dim(),
        "enrolled identity"
    );

    Ok(EnrollReport {
        name: identity.name.clone(),
        frames_captured: burst.frames_captured,
        samples_used: burst.samples.len(),
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{face, MemoryStore, ScriptedAnalyzer, ScriptedCamera};
    use crate::types::IdentityError;

    fn alice() -> Identity {
        Identity { name: "Alice".into(), age: 30, email: "alice@example.com".into() }
    }

    #[test]
    fn test_enroll_averages_only_detected_frames() {
        // Frames 1 and 3 have no face.
        let mut camera = ScriptedCamera::frames(5);
        let mut analyzer = ScriptedAnalyzer::new(vec![
            vec![face(&[1.0, 0.0])],
            vec![],
            vec![face(&[3.0, 6.0])],
            vec![],
            vec![face(&[2.0, 3.0])],
        ]);
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();

        let report = enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 5).unwrap();

        assert_eq!(report.frames_captured, 5);
        assert_eq!(report.samples_used, 3);
        assert_eq!(report.encoding.values, vec![2.0, 3.0]);
        assert_eq!(store.rows().len(), 1);
        assert_eq!(store.rows()[0].0.name, "Alice");
        assert_eq!(store.rows()[0].1.values, vec![2.0, 3.0]);
        assert_eq!(cache.get("Alice"), Some(&report.encoding));
    }

    #[test]
    fn test_enroll_no_face_never_writes() {
        let mut camera = ScriptedCamera::frames(5);
        let mut analyzer = ScriptedAnalyzer::new(vec![vec![]; 5]);
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();

        let err = enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 5).unwrap_err();

        assert!(matches!(err, FaceRecError::NoFaceDetected));
        assert!(store.rows().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_enroll_capture_failure_mid_burst_aborts() {
        let mut camera = ScriptedCamera::failing_after(2);
        let mut analyzer = ScriptedAnalyzer::new(vec![vec![face(&[1.0])]; 5]);
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();

        let err = enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 5).unwrap_err();

        assert!(matches!(err, FaceRecError::Capture(_)));
        assert!(store.rows().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_enroll_uses_first_face_per_frame() {
        let mut camera = ScriptedCamera::frames(1);
        let mut analyzer = ScriptedAnalyzer::new(vec![vec![face(&[1.0]), face(&[9.0])]]);
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();

        let report = enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 1).unwrap();
        assert_eq!(report.encoding.values, vec![1.0]);
    }

    #[test]
    fn test_enroll_skips_dark_and_failed_frames() {
        let mut camera = ScriptedCamera::frames(3).with_dark(&[0]);
        let mut analyzer = ScriptedAnalyzer::new(vec![
            vec![face(&[100.0])],
            vec![face(&[4.0])],
            vec![face(&[6.0])],
        ])
        .failing_on(&[2]);
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();

        let report = enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 3).unwrap();
        assert_eq!(report.samples_used, 1);
        assert_eq!(report.encoding.values, vec![4.0]);
    }

    #[test]
    fn test_enroll_overwrites_cache_entry() {
        let mut cache = EncodingCache::new();
        cache.insert("Alice".into(), Encoding::new(vec![0.0]));
        let store = MemoryStore::default();

        let mut camera = ScriptedCamera::frames(1);
        let mut analyzer = ScriptedAnalyzer::new(vec![vec![face(&[5.0])]]);
        enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 1).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Alice").unwrap().values, vec![5.0]);
    }

    #[test]
    fn test_enroll_rejects_blank_name() {
        let mut camera = ScriptedCamera::frames(1);
        let mut analyzer = ScriptedAnalyzer::new(vec![vec![face(&[1.0])]]);
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();
        let identity = Identity { name: String::new(), ..alice() };

        let err = enroll(&mut camera, &mut analyzer, &store, &mut cache, &identity, 1).unwrap_err();
        assert!(matches!(err, FaceRecError::InvalidIdentity(IdentityError::EmptyName)));
        assert_eq!(camera.captured(), 0);
    }

    #[test]
    fn test_enroll_store_failure_leaves_cache_untouched() {
        let mut camera = ScriptedCamera::frames(1);
        let mut analyzer = ScriptedAnalyzer::new(vec![vec![face(&[1.0])]]);
        let store = MemoryStore::read_only();
        let mut cache = EncodingCache::new();

        let err = enroll(&mut camera, &mut analyzer, &store, &mut cache, &alice(), 1).unwrap_err();
        assert!(matches!(err, FaceRecError::Storage(_)));
        assert!(cache.is_empty());
    }
}
