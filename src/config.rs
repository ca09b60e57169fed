//! Acquisition configuration
//!
//! Loaded from YAML; every field has a default matching a NIC-500 radar in
//! SDK mode, so an empty document is a valid configuration:
//!
//! ```yaml
//! device:
//!   host: 192.168.20.221
//!   control_port: 8080
//! trace:
//!   points_per_trace: 200
//!   time_sampling_interval_ps: 100
//!   point_stacks: 4
//!   period_s: 0.2
//!   first_break_point: 20
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::types::FrameGeometry;
use crate::{AcquisitionError, Result};

/// Largest stack count the device accepts.
pub const MAX_POINT_STACKS: u32 = 32_768;

/// Largest trace length accepted; bounds the per-frame buffers.
pub const MAX_POINTS_PER_TRACE: u32 = 65_536;

/// Largest single receive, in frames.
pub const MAX_RECEIVE_FRAMES: usize = 1_024;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub device: DeviceConfig,
    pub trace: TraceConfig,
    pub stream: StreamConfig,
}

/// How to reach the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Address shared by the control API and the data socket
    pub host: String,
    pub control_port: u16,
    /// Path prefix of the control API
    pub api_root: String,
    /// Name the root descriptor must report
    pub expected_api_name: String,
    pub request_timeout_ms: u64,
    /// Power endpoint state value that turns the radar on
    pub power_on_state: u8,
    /// Power endpoint state value that turns the radar off
    pub power_off_state: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "192.168.20.221".to_string(),
            control_port: 8080,
            api_root: "/api".to_string(),
            expected_api_name: "NIC-500 SDK".to_string(),
            request_timeout_ms: 5_000,
            power_on_state: 2,
            power_off_state: 0,
        }
    }
}

impl DeviceConfig {
    pub fn api_base_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.control_port, self.api_root)
    }
}

/// Trace acquisition parameters pushed to the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub points_per_trace: u32,
    pub time_sampling_interval_ps: u32,
    /// Measurements averaged per trace; a power of two up to 32768
    pub point_stacks: u32,
    /// Trigger period in free-run mode
    pub period_s: f64,
    /// Sample index the first break is aligned to
    pub first_break_point: u32,
    /// Used when the device reports no time-shift reference
    pub default_window_time_shift_ps: i64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            points_per_trace: 200,
            time_sampling_interval_ps: 100,
            point_stacks: 4,
            period_s: 0.2,
            first_break_point: 20,
            default_window_time_shift_ps: -55_000,
        }
    }
}

/// Data stream and delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Upper bound of a single receive, in frames
    pub receive_frames: usize,
    /// Records buffered between the session task and the consumer
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { receive_frames: 1, channel_capacity: 64 }
    }
}

impl AcquisitionConfig {
    /// Load and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|e| AcquisitionError::ConfigFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml_ng::from_str(&text).map_err(|e| {
            AcquisitionError::ConfigFile { path: path.to_path_buf(), source: Box::new(e) }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(text)
            .map_err(|e| AcquisitionError::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.host.trim().is_empty() {
            return Err(AcquisitionError::config("device.host must not be empty"));
        }
        if self.device.request_timeout_ms == 0 {
            return Err(AcquisitionError::config("device.request_timeout_ms must be positive"));
        }

        let trace = &self.trace;
        if trace.points_per_trace == 0 || trace.points_per_trace > MAX_POINTS_PER_TRACE {
            return Err(AcquisitionError::config(format!(
                "trace.points_per_trace must be between 1 and {MAX_POINTS_PER_TRACE}, got {}",
                trace.points_per_trace
            )));
        }
        if trace.time_sampling_interval_ps == 0 {
            return Err(AcquisitionError::config(
                "trace.time_sampling_interval_ps must be positive",
            ));
        }
        if !trace.point_stacks.is_power_of_two() || trace.point_stacks > MAX_POINT_STACKS {
            return Err(AcquisitionError::config(format!(
                "trace.point_stacks must be a power of two between 1 and {MAX_POINT_STACKS}, got {}",
                trace.point_stacks
            )));
        }
        if !trace.period_s.is_finite() || trace.period_s <= 0.0 {
            return Err(AcquisitionError::config(format!(
                "trace.period_s must be a positive number of seconds, got {}",
                trace.period_s
            )));
        }

        if self.stream.receive_frames == 0 || self.stream.receive_frames > MAX_RECEIVE_FRAMES {
            return Err(AcquisitionError::config(format!(
                "stream.receive_frames must be between 1 and {MAX_RECEIVE_FRAMES}, got {}",
                self.stream.receive_frames
            )));
        }
        if self.stream.channel_capacity == 0 {
            return Err(AcquisitionError::config("stream.channel_capacity must be positive"));
        }

        Ok(())
    }

    /// Frame layout implied by the configured trace length.
    pub fn geometry(&self) -> Result<FrameGeometry> {
        FrameGeometry::new(self.trace.points_per_trace as usize)
    }
}

/// Parameters pushed to the device for one session.
///
/// Built once during setup, after the device has reported its time-shift
/// reference, and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub points_per_trace: u32,
    pub time_sampling_interval_ps: u32,
    pub point_stacks: u32,
    pub period_s: f64,
    pub window_time_shift_ps: i64,
}

impl SessionConfig {
    /// Derive the session parameters from `trace` and the device reference.
    ///
    /// The window is shifted so the first break lands `first_break_point`
    /// samples into the trace: `reference - first_break_point * interval`.
    /// A reference too large for that arithmetic is a
    /// [`Decode`](AcquisitionError::Decode) error.
    pub fn derive(trace: &TraceConfig, reference_ps: Option<i64>) -> Result<Self> {
        let window_time_shift_ps = match reference_ps {
            Some(reference) => i64::from(trace.first_break_point)
                .checked_mul(i64::from(trace.time_sampling_interval_ps))
                .and_then(|offset| reference.checked_sub(offset))
                .ok_or_else(|| {
                    AcquisitionError::decode(
                        "window time shift",
                        format!("reference {reference} ps out of range"),
                    )
                })?,
            None => trace.default_window_time_shift_ps,
        };

        Ok(Self {
            points_per_trace: trace.points_per_trace,
            time_sampling_interval_ps: trace.time_sampling_interval_ps,
            point_stacks: trace.point_stacks,
            period_s: trace.period_s,
            window_time_shift_ps,
        })
    }
}
