//! Destinations for emitted trace records

use tokio::sync::mpsc;

use crate::types::TraceRecord;
use crate::{AcquisitionError, Result};

/// Consumer of trace records, called once per productive read cycle.
///
/// The session awaits `emit` before the next receive, so a slow sink applies
/// back-pressure to the data connection instead of dropping records.
#[async_trait::async_trait]
pub trait TraceSink: Send {
    async fn emit(&mut self, record: TraceRecord) -> Result<()>;
}

#[async_trait::async_trait]
impl TraceSink for mpsc::Sender<TraceRecord> {
    async fn emit(&mut self, record: TraceRecord) -> Result<()> {
        self.send(record).await.map_err(|_| AcquisitionError::SinkClosed)
    }
}

/// Collects records in memory.
#[async_trait::async_trait]
impl TraceSink for Vec<TraceRecord> {
    async fn emit(&mut self, record: TraceRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn record(trace: u32) -> TraceRecord {
        TraceRecord {
            captured_at: SystemTime::UNIX_EPOCH,
            points_per_trace: 1,
            trace_numbers: vec![trace],
            samples: vec![trace as f32],
        }
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (mut tx, mut rx) = mpsc::channel(4);
        tx.emit(record(1)).await.unwrap();
        tx.emit(record(2)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().trace_numbers, vec![1]);
        assert_eq!(rx.recv().await.unwrap().trace_numbers, vec![2]);
    }

    #[tokio::test]
    async fn dropped_receiver_closes_the_sink() {
        let (mut tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(matches!(tx.emit(record(1)).await, Err(AcquisitionError::SinkClosed)));
    }
}
