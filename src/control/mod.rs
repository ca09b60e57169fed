//! Device control surface.
//!
//! The control plane is a request/response API used only during setup and
//! teardown. [`ControlTransport`] is the seam to the wire (HTTP in
//! production, scripted in tests); [`ControlClient`] sits on top and turns a
//! non-zero device status on a write into
//! [`DeviceRejected`](crate::AcquisitionError::DeviceRejected).

mod client;
mod envelope;
mod payload;
mod transport;

pub use client::ControlClient;
pub use envelope::{Response, ResponseStatus};
pub use payload::{
    AcquisitionCommand, GprParameters, Parameters, PowerCommand, SetupCommand, TimerParameters,
};
pub use transport::{ControlTransport, HttpTransport};

use serde::{Deserialize, Serialize};

/// Control endpoints consumed by a session, relative to the API root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// API root descriptor, identifies the control-plane implementation
    Root,
    NicSystemInformation,
    GprSystemInformation,
    DataSocket,
    Version,
    Power,
    Setup,
    Acquisition,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Root => "",
            Endpoint::NicSystemInformation => "/nic/system_information",
            Endpoint::GprSystemInformation => "/nic/gpr/system_information",
            Endpoint::DataSocket => "/nic/gpr/data_socket",
            Endpoint::Version => "/nic/version",
            Endpoint::Power => "/nic/power",
            Endpoint::Setup => "/nic/setup",
            Endpoint::Acquisition => "/nic/acquisition",
        }
    }

    /// Path for messages; the root is shown as `/`.
    pub fn path_or_root(self) -> &'static str {
        match self {
            Endpoint::Root => "/",
            other => other.path(),
        }
    }

    /// Operator-facing command name.
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Root => "API",
            Endpoint::NicSystemInformation => "NIC System Information",
            Endpoint::GprSystemInformation => "GPR System Information",
            Endpoint::DataSocket => "GPR Data Socket",
            Endpoint::Version => "Version",
            Endpoint::Power => "Power",
            Endpoint::Setup => "Setup",
            Endpoint::Acquisition => "Acquisition",
        }
    }
}
