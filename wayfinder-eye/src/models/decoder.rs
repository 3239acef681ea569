//! Raw output tensor decoding
//!
//! A raw buffer is a flat run of rows `[cx, cy, w, h, objectness,
//! class_score_0 .. class_score_{K-1}]` in model-input pixels. Scores are
//! taken as-is; squashing them into [0, 1] is the engine's job.

use crate::error::VisionError;
use std::slice::ChunksExact;

/// Values per row ahead of the class scores
pub const BOX_FIELDS: usize = 5;

/// One inference pass worth of raw rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutputBuffer {
    data: Vec<f32>,
}

impl RawOutputBuffer {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Parse little-endian `f32` values
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, VisionError> {
        if bytes.len() % 4 != 0 {
            return Err(VisionError::MalformedOutput {
                len: bytes.len(),
                row_width: 4,
            });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self { data })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<f32>> for RawOutputBuffer {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// A decoded row, still in model-input pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub objectness: f32,
    pub class_index: usize,
    pub class_score: f32,
}

impl Candidate {
    /// Combined confidence
    pub fn score(&self) -> f32 {
        self.objectness * self.class_score
    }
}

/// Splits raw buffers into candidates
#[derive(Debug, Clone, Copy)]
pub struct TensorDecoder {
    num_classes: usize,
}

impl TensorDecoder {
    pub fn new(num_classes: usize) -> Result<Self, VisionError> {
        if num_classes == 0 {
            return Err(VisionError::Config("Decoder needs at least one class".to_string()));
        }
        Ok(Self { num_classes })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn row_width(&self) -> usize {
        BOX_FIELDS + self.num_classes
    }

    /// Number of rows in `buffer`, or `MalformedOutput` if it is ragged.
    pub fn rows(&self, buffer: &RawOutputBuffer) -> Result<usize, VisionError> {
        let row_width = self.row_width();
        if buffer.len() % row_width != 0 {
            return Err(VisionError::MalformedOutput {
                len: buffer.len(),
                row_width,
            });
        }
        Ok(buffer.len() / row_width)
    }

    /// Lazily decode every row of `buffer`.
    pub fn decode<'a>(&self, buffer: &'a RawOutputBuffer) -> Result<Candidates<'a>, VisionError> {
        self.rows(buffer)?;
        Ok(Candidates {
            rows: buffer.as_slice().chunks_exact(self.row_width()),
        })
    }
}

/// Iterator over the candidates of one buffer
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    rows: ChunksExact<'a, f32>,
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        self.rows.next().map(decode_row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Candidates<'_> {}

fn decode_row(row: &[f32]) -> Candidate {
    let scores = &row[BOX_FIELDS..];

    // Strict comparison keeps the lowest index on ties.
    let mut class_index = 0;
    let mut class_score = scores[0];
    for (j, &score) in scores.iter().enumerate().skip(1) {
        if score > class_score {
            class_index = j;
            class_score = score;
        }
    }

    Candidate {
        center_x: row[0],
        center_y: row[1],
        width: row[2],
        height: row[3],
        objectness: row[4],
        class_index,
        class_score,
    }
}
