//! Acquisition library for network-attached ground-penetrating radars.
//!
//! gprlink drives a NIC-500 class radar through its two interfaces: the HTTP
//! control API, used to verify, power and configure the device, and the raw
//! data socket, which carries fixed-layout binary trace frames with no
//! delimiters. Frames are reassembled from arbitrary receive chunks and
//! republished as [`TraceRecord`]s.
//!
//! # Features
//!
//! - **Ordered setup**: every control step must succeed before the next runs
//! - **Symmetric teardown**: stop and power-off are attempted exactly once
//! - **Lossless reassembly**: partial receives never drop or duplicate samples
//! - **Back-pressure**: records go through a bounded channel
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gprlink::{AcquisitionConfig, GprLink};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> gprlink::Result<()> {
//!     let config = AcquisitionConfig::load("gprlink.yaml")?;
//!     let mut connection = GprLink::connect(config).await?;
//!
//!     let mut records = connection.records().expect("first call");
//!     while let Some(record) = records.next().await {
//!         println!("{} traces", record.trace_count());
//!     }
//!
//!     let report = connection.stop().await?;
//!     println!("Session {}", report.final_state);
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Device interfaces
pub mod control;
pub mod reader;
pub mod wire;

// Session orchestration
pub mod connection;
pub mod driver;
pub mod session;
pub mod sink;

// Core exports
pub use config::{AcquisitionConfig, DeviceConfig, SessionConfig, StreamConfig, TraceConfig};
pub use error::*;
pub use types::*;

pub use connection::AcquisitionConnection;
pub use control::{ControlClient, ControlTransport, Endpoint, HttpTransport};
pub use reader::StreamReader;
pub use session::{AcquisitionSession, SessionReport, TeardownReport, TeardownStep};
pub use sink::TraceSink;
pub use wire::{FrameDecoder, extract};

/// Unified entry point for radar connections.
///
/// # Examples
///
/// ```rust,no_run
/// use gprlink::{AcquisitionConfig, GprLink};
///
/// #[tokio::main]
/// async fn main() -> gprlink::Result<()> {
///     let connection = GprLink::connect(AcquisitionConfig::default()).await?;
///     // Use connection...
///     connection.stop().await?;
///     Ok(())
/// }
/// ```
pub struct GprLink;

impl GprLink {
    /// Connect to the radar described by `config` and start streaming.
    ///
    /// Runs the whole setup sequence before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The control API is unreachable or not in SDK mode
    /// - The device refuses a setup command
    /// - The data socket cannot be opened
    ///
    /// Teardown has already run when a setup error is returned.
    pub async fn connect(config: AcquisitionConfig) -> Result<AcquisitionConnection> {
        AcquisitionConnection::start(config).await
    }

    /// Connect using a custom control transport.
    pub async fn connect_with<T: ControlTransport>(
        transport: T,
        config: AcquisitionConfig,
    ) -> Result<AcquisitionConnection> {
        AcquisitionConnection::with_transport(transport, config).await
    }
}
