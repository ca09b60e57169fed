//! Frame boundary recovery over an accumulating byte buffer

use crate::Result;
use crate::types::{Frame, FrameGeometry};

use super::format::parse_frame;

/// Extract every complete frame from the front of `buffer`.
///
/// Returns the frames in stream order and the unconsumed tail, which is
/// always shorter than one frame. Pure: the same input gives the same output
/// and `buffer` is never modified. A buffer shorter than one frame yields no
/// frames and comes back whole as the remainder.
///
/// Fails with [`DesyncDetected`](crate::AcquisitionError::DesyncDetected) if
/// any header reports a size other than the fixed header size.
pub fn extract<'a>(buffer: &'a [u8], geometry: &FrameGeometry) -> Result<(Vec<Frame>, &'a [u8])> {
    let frame_size = geometry.frame_size_bytes();
    let mut frames = Vec::with_capacity(buffer.len() / frame_size);
    let mut cursor = buffer;

    while cursor.len() >= frame_size {
        let (frame_bytes, rest) = cursor.split_at(frame_size);
        frames.push(parse_frame(frame_bytes, geometry)?);
        cursor = rest;
    }

    Ok((frames, cursor))
}

/// [`extract`] bound to one session's geometry.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    geometry: FrameGeometry,
}

impl FrameDecoder {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn extract<'a>(&self, buffer: &'a [u8]) -> Result<(Vec<Frame>, &'a [u8])> {
        extract(buffer, &self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AcquisitionError;
    use crate::types::FrameHeader;
    use crate::wire::encode_frame;
    use proptest::prelude::*;

    fn header(trace_number: u32) -> FrameHeader {
        FrameHeader {
            seconds: trace_number / 5,
            nanoseconds: trace_number * 1000,
            trace_number,
            status: 0,
            stack_count: 4,
            header_size: 20,
        }
    }

    fn frames_for(count: u32, points: usize) -> Vec<Frame> {
        (0..count)
            .map(|n| {
                let samples = (0..points).map(|i| n as f32 * 1000.0 + i as f32).collect();
                Frame::new(header(n), samples)
            })
            .collect()
    }

    fn concat(frames: &[Frame]) -> Vec<u8> {
        frames.iter().flat_map(|frame| encode_frame(&frame.header, &frame.samples)).collect()
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        let geometry = FrameGeometry::new(200).unwrap();
        let (frames, remainder) = extract(&[], &geometry).unwrap();
        assert!(frames.is_empty());
        assert!(remainder.is_empty());
    }

    #[test]
    fn partial_frame_is_returned_untouched() {
        let geometry = FrameGeometry::new(3).unwrap();
        let bytes = concat(&frames_for(1, 3));
        let partial = &bytes[..bytes.len() - 1];

        let (frames, remainder) = extract(partial, &geometry).unwrap();
        assert!(frames.is_empty());
        assert_eq!(remainder, partial);
    }

    #[test]
    fn multiple_frames_and_a_tail() {
        let geometry = FrameGeometry::new(3).unwrap();
        let expected = frames_for(3, 3);
        let mut bytes = concat(&expected);
        bytes.extend_from_slice(&[0xAA; 5]);

        let (frames, remainder) = FrameDecoder::new(geometry).extract(&bytes).unwrap();
        assert_eq!(frames, expected);
        assert_eq!(remainder, &[0xAA; 5]);
    }

    #[test]
    fn desync_is_reported_not_skipped() {
        let geometry = FrameGeometry::new(2).unwrap();
        let mut bytes = concat(&frames_for(2, 2));
        // Drop one byte so the second header is read one byte early.
        bytes.remove(geometry.frame_size_bytes() - 1);
        bytes.push(0);

        let result = extract(&bytes, &geometry);
        assert!(matches!(result, Err(AcquisitionError::DesyncDetected { .. })));
    }

    proptest! {
        #[test]
        fn any_chunking_reassembles_the_original_frames(
            count in 1u32..12,
            points in 1usize..40,
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..30),
        ) {
            let geometry = FrameGeometry::new(points).unwrap();
            let expected = frames_for(count, points);
            let stream = concat(&expected);

            let mut boundaries: Vec<usize> = cuts.iter().map(|idx| idx.index(stream.len() + 1)).collect();
            boundaries.push(0);
            boundaries.push(stream.len());
            boundaries.sort_unstable();
            boundaries.dedup();

            let mut pending = Vec::new();
            let mut decoded = Vec::new();
            for window in boundaries.windows(2) {
                pending.extend_from_slice(&stream[window[0]..window[1]]);
                let (frames, remainder) = extract(&pending, &geometry).unwrap();
                prop_assert!(remainder.len() < geometry.frame_size_bytes());
                pending = remainder.to_vec();
                decoded.extend(frames);
            }

            prop_assert!(pending.is_empty());
            prop_assert_eq!(decoded, expected);
        }

        #[test]
        fn fewer_bytes_than_a_frame_never_decode(points in 1usize..64, len_seed in any::<prop::sample::Index>()) {
            let geometry = FrameGeometry::new(points).unwrap();
            let bytes = concat(&frames_for(1, points));
            let partial = &bytes[..len_seed.index(geometry.frame_size_bytes())];

            let (frames, remainder) = extract(partial, &geometry).unwrap();
            prop_assert!(frames.is_empty());
            prop_assert_eq!(remainder, partial);
        }
    }
}
