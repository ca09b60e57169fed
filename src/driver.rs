//! Driver spawns and manages the acquisition task

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;
use crate::control::ControlTransport;
use crate::session::{AcquisitionSession, SessionReport};
use crate::types::{SessionState, TraceRecord};

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Receiver for trace records, in emission order
    pub records: mpsc::Receiver<TraceRecord>,
    /// Receiver for session state transitions
    pub states: watch::Receiver<SessionState>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// Session outcome, available once teardown has run
    pub handle: JoinHandle<Result<SessionReport>>,
}

/// Driver runs one session in its own task
///
/// The task owns the session for its whole life: setup, the read loop and
/// teardown all happen there, one after the other. Records go out over a
/// bounded channel, so a slow consumer holds back the reader instead of
/// losing traces.
pub struct Driver;

impl Driver {
    /// Spawn the session task
    ///
    /// `capacity` bounds the number of records buffered for the consumer.
    pub fn spawn<T>(session: AcquisitionSession<T>, capacity: usize) -> DriverChannels
    where
        T: ControlTransport,
    {
        let (record_tx, record_rx) = mpsc::channel(capacity.max(1));
        let states = session.subscribe_state();
        let cancel = CancellationToken::new();

        let cancel_task = cancel.clone();
        let handle = tokio::spawn(async move {
            Self::session_task(session, record_tx, cancel_task).await
        });

        DriverChannels { records: record_rx, states, cancel, handle }
    }

    async fn session_task<T>(
        session: AcquisitionSession<T>,
        mut record_tx: mpsc::Sender<TraceRecord>,
        cancel: CancellationToken,
    ) -> Result<SessionReport>
    where
        T: ControlTransport,
    {
        info!("Session task started");

        let result = session.run(&mut record_tx, cancel).await;
        match &result {
            Ok(report) => info!(
                "Session task ended {} ({} records, {} frames)",
                report.final_state, report.records_emitted, report.frames_decoded
            ),
            Err(e) => error!("Session task failed: {}", e),
        }
        result
    }
}
