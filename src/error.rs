//! Error types for radar acquisition.
//!
//! Every failure the crate can report is a variant of [`AcquisitionError`].
//! The variants follow the two channels a session talks to:
//!
//! - **Control channel**: [`Network`](AcquisitionError::Network),
//!   [`Decode`](AcquisitionError::Decode) and
//!   [`DeviceRejected`](AcquisitionError::DeviceRejected). A rejection is a
//!   successful exchange carrying a refused command, so it keeps the device's
//!   own status code and message.
//! - **Data channel**: [`ConnectionClosed`](AcquisitionError::ConnectionClosed)
//!   marks the end of the byte stream, while
//!   [`DesyncDetected`](AcquisitionError::DesyncDetected) means frame
//!   alignment was lost and cannot be recovered.
//!
//! Setup failures are wrapped in [`Setup`](AcquisitionError::Setup), which
//! records the session state the failing step started from.
//!
//! ```rust
//! use gprlink::AcquisitionError;
//!
//! let error = AcquisitionError::device_rejected("/nic/power", 3, "GPR busy");
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::SessionState;

/// Result type alias for acquisition operations.
pub type Result<T, E = AcquisitionError> = std::result::Result<T, E>;

/// Main error type for acquisition operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AcquisitionError {
    #[error("Network failure ({context})")]
    Network {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Malformed response from {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Device rejected {endpoint} (status {status_code}): {message}")]
    DeviceRejected { endpoint: String, status_code: i64, message: String },

    #[error("Data connection closed ({pending_bytes} unassembled bytes pending)")]
    ConnectionClosed { pending_bytes: usize },

    #[error(
        "Stream desynchronized at trace {trace_number}: header reports {found} bytes, expected {expected}"
    )]
    DesyncDetected { expected: usize, found: usize, trace_number: u32 },

    #[error("Unexpected control plane: expected '{expected}', found '{found}'")]
    UnexpectedDevice { expected: String, found: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Trace sink closed")]
    SinkClosed,

    #[error("Setup failed while {state}")]
    Setup {
        state: SessionState,
        #[source]
        source: Box<AcquisitionError>,
    },
}

impl AcquisitionError {
    /// Returns whether this error is potentially recoverable by starting a new session.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquisitionError::Network { .. } => true,
            AcquisitionError::ConnectionClosed { .. } => true,
            AcquisitionError::DesyncDetected { .. } => true,
            AcquisitionError::Decode { .. } => false,
            AcquisitionError::DeviceRejected { .. } => false,
            AcquisitionError::UnexpectedDevice { .. } => false,
            AcquisitionError::Config { .. } => false,
            AcquisitionError::ConfigFile { .. } => false,
            AcquisitionError::SinkClosed => false,
            AcquisitionError::Setup { source, .. } => source.is_retryable(),
        }
    }

    /// Returns true when the error only marks the normal end of the data stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, AcquisitionError::ConnectionClosed { .. })
    }

    /// The innermost error, unwrapping any [`Setup`](AcquisitionError::Setup) layers.
    pub fn root_cause(&self) -> &AcquisitionError {
        match self {
            AcquisitionError::Setup { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AcquisitionError::Network { .. } => vec![
                "Check the device is powered and reachable on the network",
                "Verify the configured host and control port",
                "Check for firewalls between this host and the device",
            ],
            AcquisitionError::Decode { .. } => vec![
                "Verify the device is running the expected SDK firmware",
                "Check the configured API root path",
            ],
            AcquisitionError::DeviceRejected { .. } => vec![
                "Read the device message for the refusal reason",
                "Check trace parameters are within device limits",
                "Make sure no other client holds the device",
            ],
            AcquisitionError::ConnectionClosed { .. } => vec![
                "Check the device did not stop acquisition on its own",
                "Start a new session to resume streaming",
            ],
            AcquisitionError::DesyncDetected { .. } => vec![
                "Restart the session to realign the data stream",
                "Verify points_per_trace matches the device configuration",
            ],
            AcquisitionError::UnexpectedDevice { .. } => vec![
                "Switch the device into SDK mode",
                "Verify the configured host points at the radar",
            ],
            AcquisitionError::Config { .. } | AcquisitionError::ConfigFile { .. } => vec![
                "Check the configuration file syntax",
                "Check values against the documented ranges",
            ],
            AcquisitionError::SinkClosed => vec![
                "Keep the record stream alive for the duration of the session",
            ],
            AcquisitionError::Setup { source, .. } => source.recovery_suggestions(),
        }
    }

    /// Helper constructor for network errors.
    pub fn network(context: impl Into<String>) -> Self {
        AcquisitionError::Network { context: context.into(), source: None }
    }

    /// Helper constructor for network errors with source.
    pub fn network_with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AcquisitionError::Network { context: context.into(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for malformed responses.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        AcquisitionError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for refused commands.
    pub fn device_rejected(
        endpoint: impl Into<String>,
        status_code: i64,
        message: impl Into<String>,
    ) -> Self {
        AcquisitionError::DeviceRejected {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        AcquisitionError::Config { reason: reason.into() }
    }

    /// Wrap a setup step failure with the state the step started from.
    pub fn setup(state: SessionState, source: AcquisitionError) -> Self {
        AcquisitionError::Setup { state, source: Box::new(source) }
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::network_with_source("data channel", err)
    }
}
