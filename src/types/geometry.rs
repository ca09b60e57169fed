//! Fixed byte layout of a trace frame

use serde::{Deserialize, Serialize};

use crate::config::MAX_POINTS_PER_TRACE;
use crate::{AcquisitionError, Result};

/// Size of the frame header on the wire.
pub const HEADER_SIZE_BYTES: usize = 20;

/// Size of one sample on the wire (IEEE-754 single precision).
pub const POINT_SIZE_BYTES: usize = 4;

/// Byte layout shared by every frame of a session.
///
/// Computed once from the configured points-per-trace and never changed for
/// the lifetime of a data connection. Header and point sizes are protocol
/// constants; only the point count varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFrameGeometry")]
pub struct FrameGeometry {
    point_count: usize,
}

#[derive(Deserialize)]
struct RawFrameGeometry {
    point_count: usize,
}

impl TryFrom<RawFrameGeometry> for FrameGeometry {
    type Error = AcquisitionError;

    fn try_from(raw: RawFrameGeometry) -> Result<Self> {
        FrameGeometry::new(raw.point_count)
    }
}

impl FrameGeometry {
    /// Create a geometry for `point_count` samples per frame.
    pub fn new(point_count: usize) -> Result<Self> {
        if point_count == 0 {
            return Err(AcquisitionError::config("frame geometry requires at least one point"));
        }
        if point_count > MAX_POINTS_PER_TRACE as usize {
            return Err(AcquisitionError::config(format!(
                "frame geometry allows at most {MAX_POINTS_PER_TRACE} points, got {point_count}"
            )));
        }
        Ok(Self { point_count })
    }

    pub const fn header_size_bytes(&self) -> usize {
        HEADER_SIZE_BYTES
    }

    pub const fn point_size_bytes(&self) -> usize {
        POINT_SIZE_BYTES
    }

    pub const fn point_count(&self) -> usize {
        self.point_count
    }

    /// Bytes occupied by the sample payload.
    pub const fn payload_size_bytes(&self) -> usize {
        self.point_count * POINT_SIZE_BYTES
    }

    /// Bytes occupied by one complete frame; always larger than the header.
    pub const fn frame_size_bytes(&self) -> usize {
        HEADER_SIZE_BYTES + self.payload_size_bytes()
    }
}
