//! Scripted collaborators for deterministic flow tests.

use std::cell::RefCell;

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::encoding::Encoding;
use crate::error::StorageError;
use crate::source::{CaptureError, FrameSource};
use crate::store::EncodingStore;
use crate::types::{BoundingBox, Frame, Identity, Observation};

pub fn region(x: f32) -> BoundingBox {
    BoundingBox { x, y: 0.0, width: 10.0, height: 10.0, confidence: 0.9, landmarks: None }
}

pub fn face(values: &[f32]) -> Observation {
    Observation { region: region(0.0), encoding: Encoding::new(values.to_vec()) }
}

/// Camera that yields numbered frames, optionally failing after `fail_after`.
pub struct ScriptedCamera {
    total: usize,
    fail_after: Option<usize>,
    dark: Vec<usize>,
    drops: Vec<usize>,
    attempts: usize,
    captured: usize,
}

impl ScriptedCamera {
    pub fn frames(total: usize) -> Self {
        Self { total, fail_after: None, dark: Vec::new(), drops: Vec::new(), attempts: 0, captured: 0 }
    }

    pub fn failing_after(ok_frames: usize) -> Self {
        Self { fail_after: Some(ok_frames), ..Self::frames(usize::MAX) }
    }

    pub fn with_dark(mut self, indices: &[usize]) -> Self {
        self.dark = indices.to_vec();
        self
    }

    /// Fail the given capture attempts (counted from 0) without ending the stream.
    pub fn with_drops(mut self, attempts: &[usize]) -> Self {
        self.drops = attempts.to_vec();
        self
    }

    pub fn captured(&self) -> usize {
        self.captured
    }
}

impl FrameSource for ScriptedCamera {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.drops.contains(&attempt) {
            return Err(CaptureError::ReadFailed(format!("scripted drop at attempt {attempt}")));
        }
        let idx = self.captured;
        if self.fail_after.is_some_and(|n| idx >= n) || idx >= self.total {
            return Err(CaptureError::ReadFailed(format!("scripted failure at frame {idx}")));
        }
        self.captured += 1;
        Ok(Frame {
            data: vec![128; 16],
            width: 4,
            height: 4,
            sequence: idx as u32,
            is_dark: self.dark.contains(&idx),
        })
    }
}

/// Analyzer returning a fixed set of faces per frame sequence number.
pub struct ScriptedAnalyzer {
    per_frame: Vec<Vec<Observation>>,
    failing: Vec<usize>,
}

impl ScriptedAnalyzer {
    pub fn new(per_frame: Vec<Vec<Observation>>) -> Self {
        Self { per_frame, failing: Vec::new() }
    }

    pub fn failing_on(mut self, sequences: &[usize]) -> Self {
        self.failing = sequences.to_vec();
        self
    }
}

impl FaceAnalyzer for ScriptedAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Observation>, AnalyzerError> {
        let seq = frame.sequence as usize;
        if self.failing.contains(&seq) {
            return Err(AnalyzerError::InferenceFailed(format!("scripted failure at {seq}")));
        }
        Ok(self.per_frame.get(seq).cloned().unwrap_or_default())
    }
}

/// Store keeping rows in memory; `read_only` rejects every write.
#[derive(Default)]
pub struct MemoryStore {
    rows: RefCell<Vec<(Identity, Encoding)>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn read_only() -> Self {
        Self { rows: RefCell::default(), read_only: true }
    }

    pub fn rows(&self) -> Vec<(Identity, Encoding)> {
        self.rows.borrow().clone()
    }
}

impl EncodingStore for MemoryStore {
    fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, Encoding)>, StorageError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .map(|(id, enc)| (id.name.clone(), enc.clone()))
            .collect())
    }

    fn save(&self, identity: &Identity, encoding: &Encoding) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Backend("read-only store".into()));
        }
        self.rows.borrow_mut().push((identity.clone(), encoding.clone()));
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<usize, StorageError> {
        if self.read_only {
            return Err(StorageError::Backend("read-only store".into()));
        }
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|(id, _)| id.name != name);
        Ok(before - rows.len())
    }
}
