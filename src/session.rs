//! Acquisition session lifecycle
//!
//! An [`AcquisitionSession`] brings the radar from idle to streaming through
//! five ordered control steps, pumps decoded traces into a [`TraceSink`] and
//! tears everything down again. The state only ever moves forward:
//!
//! ```text
//! Idle -> ApiVerified -> PoweredOn -> Configured -> SocketConnected -> Streaming -> Stopped
//!   \__________\____________\____________\_______________\________________\-----> Aborted
//! ```
//!
//! Teardown runs at most once per session, from whatever state the session
//! reached, and never fails.

use serde::Serialize;
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{AcquisitionConfig, SessionConfig};
use crate::control::{
    AcquisitionCommand, ControlClient, ControlTransport, Endpoint, PowerCommand, SetupCommand,
};
use crate::reader::StreamReader;
use crate::sink::TraceSink;
use crate::types::{FrameGeometry, SessionState};
use crate::{AcquisitionError, Result};

const REFERENCE_POINTER: &str = "/gpr/window_time_shift_reference_ps";
const DATA_PORT_POINTER: &str = "/data_socket/port";

/// Outcome of a single teardown action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownStep {
    Done,
    /// Nothing to release
    Skipped,
    Failed(String),
}

impl TeardownStep {
    fn from_result<T>(action: &str, result: Result<T>) -> Self {
        match result {
            Ok(_) => TeardownStep::Done,
            Err(e) => {
                warn!("Teardown step '{}' failed: {}", action, e);
                TeardownStep::Failed(e.to_string())
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TeardownStep::Failed(_))
    }
}

/// What teardown managed to release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub stop_acquisition: TeardownStep,
    pub power_off: TeardownStep,
    pub data_connection: TeardownStep,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        !(self.stop_acquisition.is_failed()
            || self.power_off.is_failed()
            || self.data_connection.is_failed())
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub final_state: SessionState,
    pub frames_decoded: u64,
    pub records_emitted: u64,
    pub teardown: TeardownReport,
}

/// One radar acquisition session, from handshake to teardown.
///
/// Owns the control client, the data connection and the pending byte buffer;
/// nothing in it is shared with other sessions.
pub struct AcquisitionSession<T> {
    control: ControlClient<T>,
    config: AcquisitionConfig,
    geometry: FrameGeometry,
    state: watch::Sender<SessionState>,
    session_config: Option<SessionConfig>,
    data_port: Option<u16>,
    reader: Option<StreamReader<TcpStream>>,
    frames_decoded: u64,
    records_emitted: u64,
    torn_down: bool,
}

impl<T: ControlTransport> AcquisitionSession<T> {
    /// Create an idle session. Fails only on an invalid configuration.
    pub fn new(transport: T, config: AcquisitionConfig) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        let (state, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            control: ControlClient::new(transport),
            config,
            geometry,
            state,
            session_config: None,
            data_port: None,
            reader: None,
            frames_decoded: 0,
            records_emitted: 0,
            torn_down: false,
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions as they happen.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Parameters sent to the device, once derived during setup.
    pub fn session_config(&self) -> Option<&SessionConfig> {
        self.session_config.as_ref()
    }

    pub fn data_port(&self) -> Option<u16> {
        self.data_port
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn records_emitted(&self) -> u64 {
        self.records_emitted
    }

    pub fn control(&self) -> &ControlClient<T> {
        &self.control
    }

    /// Run the setup sequence from `Idle` to `Streaming`.
    ///
    /// Each step advances the state only once it succeeded. On the first
    /// failure the session is `Aborted` and the error is returned wrapped in
    /// [`Setup`](AcquisitionError::Setup) with the state the step started
    /// from. Teardown is left to the caller.
    pub async fn start(&mut self) -> Result<()> {
        let current = self.state();
        if current != SessionState::Idle {
            return Err(AcquisitionError::config(format!(
                "session can only start from idle, currently {current}"
            )));
        }

        info!("Starting acquisition session with {}", self.config.device.host);

        while let Some(next) = self.state().next_setup_state() {
            let from = self.state();
            let outcome = match from {
                SessionState::Idle => self.verify_api().await,
                SessionState::ApiVerified => self.power_on().await,
                SessionState::PoweredOn => self.prepare_session().await,
                SessionState::Configured => self.connect_data_socket().await,
                SessionState::SocketConnected => self.start_acquisition().await,
                SessionState::Streaming | SessionState::Stopped | SessionState::Aborted => break,
            };

            if let Err(e) = outcome {
                error!("Setup step '{}' failed while {}: {}", setup_step_name(from), from, e);
                self.transition(SessionState::Aborted);
                return Err(AcquisitionError::setup(from, e));
            }
            self.transition(next);
        }

        info!("Acquisition running, streaming from port {}", self.data_port.unwrap_or_default());
        Ok(())
    }

    /// Pump records from the data connection into `sink` until the stream
    /// ends or `cancel` fires.
    ///
    /// End of stream, cancellation and a consumer that went away finish in
    /// `Stopped` and return `Ok`. Desync and receive failures abort the session.
    pub async fn stream<S>(&mut self, sink: &mut S, cancel: &CancellationToken) -> Result<()>
    where
        S: TraceSink + ?Sized,
    {
        let current = self.state();
        if current != SessionState::Streaming {
            return Err(AcquisitionError::config(format!(
                "session is not streaming, currently {current}"
            )));
        }
        let Some(reader) = self.reader.as_mut() else {
            return Err(AcquisitionError::network("data connection is not open"));
        };

        loop {
            let cycle = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stop requested, ending stream");
                    break;
                }
                cycle = reader.read_cycle() => cycle,
            };

            match cycle {
                Ok(Some(batch)) => {
                    self.frames_decoded += batch.len() as u64;
                    let record = batch.into_record(SystemTime::now());
                    trace!(traces = record.trace_count(), "Emitting record");

                    // Emission stays outside the select so a record is never half-delivered.
                    match sink.emit(record).await {
                        Ok(()) => self.records_emitted += 1,
                        Err(AcquisitionError::SinkClosed) => {
                            info!("Record consumer dropped, ending stream");
                            break;
                        }
                        Err(e) => {
                            error!("Record sink failed: {}", e);
                            self.transition(SessionState::Aborted);
                            return Err(e);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_end_of_stream() => {
                    info!("Data stream ended: {}", e);
                    break;
                }
                Err(e) => {
                    error!("Streaming failed: {}", e);
                    self.transition(SessionState::Aborted);
                    return Err(e);
                }
            }
        }

        self.transition(SessionState::Stopped);
        Ok(())
    }

    /// Stop acquisition, power the radar off and close the data connection.
    ///
    /// Runs once per session; later calls return `None` without touching the
    /// device. Every action is attempted even if an earlier one failed, and
    /// failures are only logged and reported.
    pub async fn teardown(&mut self) -> Option<TeardownReport> {
        if self.torn_down {
            debug!("Teardown already ran");
            return None;
        }
        self.torn_down = true;

        info!("Tearing down session ({})", self.state());

        let stop_acquisition = TeardownStep::from_result(
            "stop acquisition",
            self.control.configure(Endpoint::Acquisition, &AcquisitionCommand::STOP).await,
        );

        let power_off = PowerCommand { state: self.config.device.power_off_state };
        let power_off = TeardownStep::from_result(
            "power off",
            self.control.configure(Endpoint::Power, &power_off).await,
        );

        let data_connection = match self.reader.take() {
            Some(reader) => {
                let mut stream = reader.into_inner();
                let closed = stream.shutdown().await.map_err(AcquisitionError::from);
                TeardownStep::from_result("close data connection", closed)
            }
            None => TeardownStep::Skipped,
        };

        if !self.state().is_terminal() {
            self.transition(SessionState::Stopped);
        }

        let report = TeardownReport { stop_acquisition, power_off, data_connection };
        if report.is_clean() {
            info!("GPR shut down");
        } else {
            warn!("GPR shut down with errors: {:?}", report);
        }
        Some(report)
    }

    /// Start, stream until done, then tear down.
    ///
    /// Teardown runs whatever happened before it. Cancelling during setup
    /// stops the handshake where it is and counts as a normal stop.
    pub async fn run<S>(mut self, sink: &mut S, cancel: CancellationToken) -> Result<SessionReport>
    where
        S: TraceSink + ?Sized,
    {
        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Stop requested during setup");
                Ok(false)
            }
            started = self.start() => started.map(|()| true),
        };

        let outcome = match started {
            Ok(true) => self.stream(sink, &cancel).await,
            Ok(false) => {
                self.transition(SessionState::Stopped);
                Ok(())
            }
            Err(e) => Err(e),
        };

        let teardown = self.teardown().await;
        outcome?;

        Ok(SessionReport {
            final_state: self.state(),
            frames_decoded: self.frames_decoded,
            records_emitted: self.records_emitted,
            teardown: teardown.unwrap_or(TeardownReport {
                stop_acquisition: TeardownStep::Skipped,
                power_off: TeardownStep::Skipped,
                data_connection: TeardownStep::Skipped,
            }),
        })
    }

    async fn verify_api(&self) -> Result<()> {
        let response = self.control.query(Endpoint::Root).await?;
        let found = response.str_field(Endpoint::Root.label(), "/name")?;
        let expected = &self.config.device.expected_api_name;

        if found != expected.as_str() {
            warn!("Not in NIC SDK mode, control plane reports '{}'", found);
            return Err(AcquisitionError::UnexpectedDevice {
                expected: expected.clone(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    async fn power_on(&self) -> Result<()> {
        let command = PowerCommand { state: self.config.device.power_on_state };
        self.control.configure(Endpoint::Power, &command).await?;
        Ok(())
    }

    async fn prepare_session(&mut self) -> Result<()> {
        let info = self.control.query(Endpoint::GprSystemInformation).await?;
        let reference =
            info.optional_i64_field(Endpoint::GprSystemInformation.label(), REFERENCE_POINTER)?;
        if reference.is_none() {
            debug!("No time-shift reference reported, keeping the configured default");
        }
        let session_config = SessionConfig::derive(&self.config.trace, reference)?;
        debug!(
            window_time_shift_ps = session_config.window_time_shift_ps,
            "Derived session parameters"
        );

        let socket = self.control.query(Endpoint::DataSocket).await?;
        let port = socket.u64_field(Endpoint::DataSocket.label(), DATA_PORT_POINTER)?;
        let port = u16::try_from(port).map_err(|_| {
            AcquisitionError::decode(
                Endpoint::DataSocket.label(),
                format!("data port {port} out of range"),
            )
        })?;

        self.session_config = Some(session_config);
        self.data_port = Some(port);
        Ok(())
    }

    async fn connect_data_socket(&mut self) -> Result<()> {
        let port = self
            .data_port
            .ok_or_else(|| AcquisitionError::network("data port unknown"))?;
        let host = self.config.device.host.as_str();

        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            AcquisitionError::network_with_source(format!("data socket {host}:{port}"), e)
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY on data socket: {}", e);
        }
        info!("Data socket connected to {}:{}", host, port);

        self.reader = Some(
            StreamReader::new(stream, self.geometry)
                .with_receive_frames(self.config.stream.receive_frames),
        );
        Ok(())
    }

    async fn start_acquisition(&self) -> Result<()> {
        let session_config = self
            .session_config
            .as_ref()
            .ok_or_else(|| AcquisitionError::config("session parameters not derived"))?;

        self.control.configure(Endpoint::Setup, &SetupCommand::from(session_config)).await?;
        self.control.configure(Endpoint::Acquisition, &AcquisitionCommand::START).await?;
        Ok(())
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        debug!("Session state: {} -> {}", previous, next);
    }
}

impl<T> Drop for AcquisitionSession<T> {
    fn drop(&mut self) {
        if !self.torn_down {
            warn!("Acquisition session dropped without teardown; the radar may still be powered");
        }
    }
}

fn setup_step_name(from: SessionState) -> &'static str {
    match from {
        SessionState::Idle => "verify API",
        SessionState::ApiVerified => "power on",
        SessionState::PoweredOn => "prepare session",
        SessionState::Configured => "connect data socket",
        SessionState::SocketConnected => "start acquisition",
        SessionState::Streaming | SessionState::Stopped | SessionState::Aborted => "none",
    }
}
