//! Live connection to a radar

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AcquisitionConfig;
use crate::control::{ControlTransport, HttpTransport};
use crate::driver::Driver;
use crate::session::{AcquisitionSession, SessionReport};
use crate::types::{SessionState, TraceRecord};
use crate::{AcquisitionError, Result};

/// Running acquisition, backed by a session task
pub struct AcquisitionConnection {
    /// Record receiver, until handed out by [`records`](Self::records)
    records: Option<mpsc::Receiver<TraceRecord>>,

    /// Session state watch receiver
    states: watch::Receiver<SessionState>,

    /// Cancellation token for stopping the session task
    cancel: CancellationToken,

    /// Session task, until joined by [`stop`](Self::stop)
    handle: Option<JoinHandle<Result<SessionReport>>>,
}

impl AcquisitionConnection {
    /// Connect to the radar over HTTP and start streaming.
    pub async fn start(config: AcquisitionConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.device)?;
        Self::with_transport(transport, config).await
    }

    /// Start a session over any control transport.
    ///
    /// Returns once the session is streaming. If setup fails, teardown has
    /// already run by the time the setup error is returned.
    pub async fn with_transport<T>(transport: T, config: AcquisitionConfig) -> Result<Self>
    where
        T: ControlTransport,
    {
        info!("Connecting to radar at {}", config.device.api_base_url());

        let capacity = config.stream.channel_capacity;
        let session = AcquisitionSession::new(transport, config)?;
        let channels = Driver::spawn(session, capacity);

        // A short stream can end before the Streaming state is observed.
        let mut states = channels.states.clone();
        let reached = states
            .wait_for(|state| *state == SessionState::Streaming || state.is_terminal())
            .await
            .map(|state| *state);

        match reached {
            Ok(SessionState::Aborted) | Err(_) => {
                return Err(match join(channels.handle).await {
                    Err(e) => e,
                    Ok(report) => {
                        AcquisitionError::network(format!("session ended {}", report.final_state))
                    }
                });
            }
            Ok(state) => info!("Radar connection established ({})", state),
        }

        Ok(Self {
            records: Some(channels.records),
            states: channels.states,
            cancel: channels.cancel,
            handle: Some(channels.handle),
        })
    }

    /// Take the record stream.
    ///
    /// Yields one record per productive read cycle and ends after the session
    /// stops. Only the first call returns a stream; dropping it ends the
    /// session.
    pub fn records(&mut self) -> Option<ReceiverStream<TraceRecord>> {
        self.records.take().map(ReceiverStream::new)
    }

    /// Receive the next record, unless the stream was taken with
    /// [`records`](Self::records).
    pub async fn next_record(&mut self) -> Option<TraceRecord> {
        self.records.as_mut()?.recv().await
    }

    /// Session state changes, starting with the current state.
    pub fn state_updates(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.states.clone())
    }

    pub fn current_state(&self) -> SessionState {
        *self.states.borrow()
    }

    /// Stop streaming, wait for teardown and report how the session went.
    ///
    /// Records not yet consumed from an un-taken receiver are discarded.
    pub async fn stop(mut self) -> Result<SessionReport> {
        info!("Stopping radar connection");
        self.cancel.cancel();
        self.records.take();

        match self.handle.take() {
            Some(handle) => join(handle).await,
            None => Err(AcquisitionError::network("session task already joined")),
        }
    }
}

impl Drop for AcquisitionConnection {
    fn drop(&mut self) {
        debug!("Dropping radar connection");
        if self.handle.is_some() {
            // The task still tears down on its own after cancellation.
            warn!("Radar connection dropped without stop(), cancelling session");
        }
        self.cancel.cancel();
    }
}

async fn join(handle: JoinHandle<Result<SessionReport>>) -> Result<SessionReport> {
    handle.await.map_err(|e| AcquisitionError::network_with_source("session task", e))?
}
