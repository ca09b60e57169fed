//! Core types for radar trace data.
//!
//! ## Architecture
//!
//! - [`FrameGeometry`] fixes the byte layout of every frame in a session
//! - [`FrameHeader`] and [`Frame`] hold one decoded trace
//! - [`TraceBatch`] groups the frames of one read cycle and becomes a
//!   [`TraceRecord`] when handed to the sink
//! - [`SessionState`] tracks the acquisition lifecycle
//!
//! ## Usage Example
//!
//! ```rust
//! use gprlink::types::{Frame, FrameGeometry, FrameHeader, TraceBatch};
//! use std::time::SystemTime;
//!
//! let geometry = FrameGeometry::new(200).unwrap();
//! assert_eq!(geometry.frame_size_bytes(), 820);
//!
//! let header = FrameHeader {
//!     seconds: 0,
//!     nanoseconds: 0,
//!     trace_number: 1,
//!     status: 0,
//!     stack_count: 4,
//!     header_size: 20,
//! };
//! let batch = TraceBatch::new(vec![Frame::new(header, vec![0.5; 200])]);
//! let record = batch.into_record(SystemTime::now());
//! assert_eq!(record.samples.len(), 200);
//! ```

mod batch;
mod frame;
mod geometry;
mod state;

pub use batch::{TraceBatch, TraceRecord};
pub use frame::{Frame, FrameHeader};
pub use geometry::{FrameGeometry, HEADER_SIZE_BYTES, POINT_SIZE_BYTES};
pub use state::SessionState;
