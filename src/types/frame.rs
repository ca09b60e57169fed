//! Decoded trace frames

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header preceding every trace on the data stream.
///
/// The device reports its own header size; it is only checked against the
/// session geometry and never used to re-derive frame boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Capture time, whole seconds
    pub seconds: u32,
    /// Capture time, sub-second part
    pub nanoseconds: u32,
    /// Device trace counter
    pub trace_number: u32,
    /// Device status word
    pub status: u32,
    /// Raw measurements averaged into this trace
    pub stack_count: u16,
    /// Header size as reported by the device
    pub header_size: u16,
}

impl FrameHeader {
    /// Device-side capture time as an offset from the device epoch.
    pub fn capture_time(&self) -> Duration {
        Duration::new(u64::from(self.seconds), self.nanoseconds)
    }
}

/// One complete trace: header plus `point_count` samples in acquisition order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    pub samples: Vec<f32>,
}

impl Frame {
    pub fn new(header: FrameHeader, samples: Vec<f32>) -> Self {
        Self { header, samples }
    }

    pub fn point_count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_time_combines_seconds_and_nanos() {
        let header = FrameHeader {
            seconds: 12,
            nanoseconds: 500_000_000,
            trace_number: 1,
            status: 0,
            stack_count: 4,
            header_size: 20,
        };
        assert_eq!(header.capture_time(), Duration::from_millis(12_500));
    }
}
