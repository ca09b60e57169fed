//! Raw data stream wire format and frame reassembly.

mod decoder;
mod format;

pub use decoder::{FrameDecoder, extract};
pub use format::{encode_frame, parse_frame};
