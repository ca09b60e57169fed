//! Per-cycle trace batches and the records emitted from them

use serde::Serialize;
use std::time::SystemTime;

use super::Frame;

/// Frames decoded within a single read cycle.
///
/// Owned by the cycle that produced it and consumed by [`TraceBatch::into_record`];
/// nothing is retained across cycles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraceBatch {
    frames: Vec<Frame>,
}

impl TraceBatch {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// All samples of the first frame, then the second, and so on.
    pub fn flatten(&self) -> Vec<f32> {
        let total = self.frames.iter().map(Frame::point_count).sum();
        let mut samples = Vec::with_capacity(total);
        for frame in &self.frames {
            samples.extend_from_slice(&frame.samples);
        }
        samples
    }

    /// Stamp the batch and turn it into the record handed to the sink.
    pub fn into_record(self, captured_at: SystemTime) -> TraceRecord {
        let samples = self.flatten();
        let points_per_trace = self.frames.first().map(Frame::point_count).unwrap_or(0);
        let trace_numbers = self.frames.iter().map(|frame| frame.header.trace_number).collect();

        TraceRecord { captured_at, points_per_trace, trace_numbers, samples }
    }
}

/// Structured record republished downstream, one per productive read cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    /// Time of emission, not of the individual frames
    pub captured_at: SystemTime,
    pub points_per_trace: usize,
    /// Device trace counters of the batched frames, in order
    pub trace_numbers: Vec<u32>,
    /// Frame-after-frame flattened samples
    pub samples: Vec<f32>,
}

impl TraceRecord {
    pub fn trace_count(&self) -> usize {
        self.trace_numbers.len()
    }

    /// Samples of the `index`th trace in the record.
    pub fn trace(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.points_per_trace)?;
        let end = start.checked_add(self.points_per_trace)?;
        self.samples.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameHeader;

    fn frame(trace_number: u32, samples: &[f32]) -> Frame {
        Frame::new(
            FrameHeader {
                seconds: 0,
                nanoseconds: 0,
                trace_number,
                status: 0,
                stack_count: 1,
                header_size: 20,
            },
            samples.to_vec(),
        )
    }

    #[test]
    fn flatten_keeps_frame_order() {
        let batch = TraceBatch::new(vec![frame(1, &[1.0, 2.0, 3.0]), frame(2, &[4.0, 5.0, 6.0])]);
        assert_eq!(batch.flatten(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn record_carries_trace_numbers_and_slices() {
        let batch = TraceBatch::new(vec![frame(7, &[1.0, 2.0]), frame(8, &[3.0, 4.0])]);
        let record = batch.into_record(SystemTime::UNIX_EPOCH);

        assert_eq!(record.trace_numbers, vec![7, 8]);
        assert_eq!(record.points_per_trace, 2);
        assert_eq!(record.trace_count(), 2);
        assert_eq!(record.trace(1), Some(&[3.0, 4.0][..]));
        assert_eq!(record.trace(2), None);
    }

    #[test]
    fn empty_batch_flattens_to_nothing() {
        let batch = TraceBatch::default();
        assert!(batch.is_empty());
        assert!(batch.flatten().is_empty());
    }
}
