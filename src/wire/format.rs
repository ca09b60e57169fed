//! Data stream frame format
//!
//! Every frame on the raw data connection is a fixed 20-byte header followed
//! by `point_count` samples, all little-endian, with no delimiters between
//! frames:
//!
//! ```text
//! offset  size  field
//!      0     4  seconds        (u32)
//!      4     4  nanoseconds    (u32)
//!      8     4  trace number   (u32)
//!     12     4  status         (u32)
//!     16     2  stack count    (u16)
//!     18     2  header size    (u16)
//!     20  4*N   samples        (f32 x N)
//! ```

use tracing::trace;

use crate::types::{Frame, FrameGeometry, FrameHeader, HEADER_SIZE_BYTES, POINT_SIZE_BYTES};
use crate::{AcquisitionError, Result};

impl FrameHeader {
    /// Size of the header structure in bytes
    pub const SIZE: usize = HEADER_SIZE_BYTES;

    /// Parse a header from the first [`FrameHeader::SIZE`] bytes of `data`.
    pub fn parse_from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AcquisitionError::decode(
                "frame header",
                format!("need {} bytes, have {}", Self::SIZE, data.len()),
            ));
        }

        Ok(Self {
            seconds: read_u32_le(data, 0),
            nanoseconds: read_u32_le(data, 4),
            trace_number: read_u32_le(data, 8),
            status: read_u32_le(data, 12),
            stack_count: read_u16_le(data, 16),
            header_size: read_u16_le(data, 18),
        })
    }

    /// Check the self-reported header size against the session geometry.
    ///
    /// A mismatch means the stream lost frame alignment.
    pub fn validate(&self, geometry: &FrameGeometry) -> Result<()> {
        let found = usize::from(self.header_size);
        if found != geometry.header_size_bytes() {
            return Err(AcquisitionError::DesyncDetected {
                expected: geometry.header_size_bytes(),
                found,
                trace_number: self.trace_number,
            });
        }
        Ok(())
    }

    pub fn to_le_bytes(&self) -> [u8; HEADER_SIZE_BYTES] {
        let mut bytes = [0u8; HEADER_SIZE_BYTES];
        bytes[0..4].copy_from_slice(&self.seconds.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.nanoseconds.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.trace_number.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.status.to_le_bytes());
        bytes[16..18].copy_from_slice(&self.stack_count.to_le_bytes());
        bytes[18..20].copy_from_slice(&self.header_size.to_le_bytes());
        bytes
    }
}

/// Parse one frame from exactly `geometry.frame_size_bytes()` bytes.
pub fn parse_frame(data: &[u8], geometry: &FrameGeometry) -> Result<Frame> {
    if data.len() != geometry.frame_size_bytes() {
        return Err(AcquisitionError::decode(
            "frame",
            format!("expected {} bytes, have {}", geometry.frame_size_bytes(), data.len()),
        ));
    }

    let header = FrameHeader::parse_from_bytes(data)?;
    header.validate(geometry)?;

    let samples = data[HEADER_SIZE_BYTES..]
        .chunks_exact(POINT_SIZE_BYTES)
        .map(|point| f32::from_le_bytes([point[0], point[1], point[2], point[3]]))
        .collect::<Vec<_>>();

    trace!(
        trace_number = header.trace_number,
        status = header.status,
        stacks = header.stack_count,
        "Parsed frame"
    );

    Ok(Frame::new(header, samples))
}

/// Serialize a header and its samples into wire layout.
pub fn encode_frame(header: &FrameHeader, samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE_BYTES + samples.len() * POINT_SIZE_BYTES);
    bytes.extend_from_slice(&header.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

// Callers have already checked the slice holds a full header.
fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(trace_number: u32) -> FrameHeader {
        FrameHeader {
            seconds: 1_700_000_000,
            nanoseconds: 250,
            trace_number,
            status: 0x0102_0304,
            stack_count: 4,
            header_size: 20,
        }
    }

    #[test]
    fn header_layout_is_little_endian() {
        let bytes = header(9).to_le_bytes();
        assert_eq!(&bytes[8..12], &[9, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[16..18], &[4, 0]);
        assert_eq!(&bytes[18..20], &[20, 0]);

        let parsed = FrameHeader::parse_from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header(9));
    }

    #[test]
    fn short_header_is_a_decode_error() {
        let result = FrameHeader::parse_from_bytes(&[0u8; 10]);
        assert!(matches!(result, Err(AcquisitionError::Decode { .. })));
    }

    #[test]
    fn frame_samples_follow_the_header() {
        let geometry = FrameGeometry::new(3).unwrap();
        let bytes = encode_frame(&header(1), &[1.5, -2.0, 0.25]);
        assert_eq!(bytes.len(), geometry.frame_size_bytes());

        let frame = parse_frame(&bytes, &geometry).unwrap();
        assert_eq!(frame.samples, vec![1.5, -2.0, 0.25]);
        assert_eq!(frame.header.trace_number, 1);
    }

    #[test]
    fn wrong_reported_header_size_is_desync() {
        let geometry = FrameGeometry::new(2).unwrap();
        let mut bad = header(42);
        bad.header_size = 24;
        let bytes = encode_frame(&bad, &[0.0, 0.0]);

        match parse_frame(&bytes, &geometry) {
            Err(AcquisitionError::DesyncDetected { expected, found, trace_number }) => {
                assert_eq!(expected, 20);
                assert_eq!(found, 24);
                assert_eq!(trace_number, 42);
            }
            other => panic!("Expected DesyncDetected, got {:?}", other),
        }
    }
}
