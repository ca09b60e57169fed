//! Integration tests for the connection layer
//!
//! These run a whole session against the scripted control plane and a
//! loopback data server, and check what a consumer of the connection sees.

use super::*;
use crate::config::AcquisitionConfig;
use crate::control::Endpoint;
use crate::test_utils::{
    AfterSend, MockTransport, encode_stream, spawn_data_server, split_uneven, test_frames,
};
use crate::types::{SessionState, TraceRecord};
use crate::AcquisitionError;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tracing::info;

fn local_config(points: u32) -> AcquisitionConfig {
    let mut config = AcquisitionConfig::default();
    config.device.host = "127.0.0.1".to_string();
    config.trace.points_per_trace = points;
    config
}

#[tokio::test]
async fn records_stream_until_the_device_closes() {
    let _ = tracing_subscriber::fmt::try_init();

    let frames = test_frames(20, 8);
    let chunks = split_uneven(&encode_stream(&frames), &[13, 52, 1, 100, 7]);
    let port = spawn_data_server(chunks, AfterSend::Close).await;
    let transport = MockTransport::new(port);

    let mut connection =
        AcquisitionConnection::with_transport(transport.clone(), local_config(8)).await.unwrap();
    let records: Vec<TraceRecord> = tokio::time::timeout(
        Duration::from_secs(5),
        connection.records().expect("records not taken yet").collect(),
    )
    .await
    .expect("stream should end with the data connection");

    let traces: Vec<u32> = records.iter().flat_map(|r| r.trace_numbers.clone()).collect();
    assert_eq!(traces, (0..20).collect::<Vec<_>>());
    for record in &records {
        assert_eq!(record.points_per_trace, 8);
        assert_eq!(record.samples.len(), 8 * record.trace_count());
    }
    info!("Received {} records", records.len());

    let report = connection.stop().await.unwrap();
    assert_eq!(report.final_state, SessionState::Stopped);
    assert_eq!(report.frames_decoded, 20);
    assert_eq!(report.records_emitted, records.len() as u64);
    assert_eq!(transport.put_payloads(Endpoint::Acquisition).last(), Some(&json!({"state": 0})));
}

#[tokio::test]
async fn records_are_taken_only_once() {
    let port = spawn_data_server(Vec::new(), AfterSend::HoldOpen).await;
    let mut connection =
        AcquisitionConnection::with_transport(MockTransport::new(port), local_config(200))
            .await
            .unwrap();

    assert!(connection.records().is_some());
    assert!(connection.records().is_none());
    assert!(connection.next_record().await.is_none());
    connection.stop().await.unwrap();
}

#[tokio::test]
async fn setup_failure_surfaces_from_connect() {
    let transport = MockTransport::new(1).reject(Endpoint::Power, 2, "interlock open");

    let error = AcquisitionConnection::with_transport(transport.clone(), local_config(200))
        .await
        .err()
        .expect("setup should fail");

    match error {
        AcquisitionError::Setup { state, source } => {
            assert_eq!(state, SessionState::ApiVerified);
            match *source {
                AcquisitionError::DeviceRejected { message, .. } => {
                    assert_eq!(message, "interlock open")
                }
                other => panic!("Expected DeviceRejected, got {:?}", other),
            }
        }
        other => panic!("Expected Setup error, got {:?}", other),
    }

    // Teardown already ran: one stop, one power-off attempt.
    assert_eq!(transport.put_count(Endpoint::Acquisition), 1);
    assert_eq!(
        transport.put_payloads(Endpoint::Power),
        vec![json!({"state": 2}), json!({"state": 0})]
    );
}

#[tokio::test]
async fn stop_ends_a_silent_stream() {
    let port = spawn_data_server(Vec::new(), AfterSend::HoldOpen).await;
    let transport = MockTransport::new(port);
    let connection =
        AcquisitionConnection::with_transport(transport.clone(), local_config(200)).await.unwrap();
    assert_eq!(connection.current_state(), SessionState::Streaming);

    let report = tokio::time::timeout(Duration::from_secs(5), connection.stop())
        .await
        .expect("stop should not hang")
        .unwrap();

    assert_eq!(report.final_state, SessionState::Stopped);
    assert_eq!(report.records_emitted, 0);
    assert!(report.teardown.is_clean());
    assert_eq!(transport.put_count(Endpoint::Power), 2);
}

#[tokio::test]
async fn state_updates_follow_the_session() {
    let frames = test_frames(2, 4);
    let port = spawn_data_server(vec![encode_stream(&frames)], AfterSend::Close).await;
    let mut connection =
        AcquisitionConnection::with_transport(MockTransport::new(port), local_config(4))
            .await
            .unwrap();

    let mut states = connection.state_updates();
    let mut records = connection.records().unwrap();
    while records.next().await.is_some() {}

    let last = tokio::time::timeout(Duration::from_secs(5), async {
        let mut last = None;
        while let Some(state) = states.next().await {
            last = Some(state);
            if state.is_terminal() {
                break;
            }
        }
        last
    })
    .await
    .unwrap();

    assert_eq!(last, Some(SessionState::Stopped));
    connection.stop().await.unwrap();
}

#[tokio::test]
async fn dropping_the_record_stream_ends_the_session() {
    let frames = test_frames(50, 4);
    let port = spawn_data_server(split_uneven(&encode_stream(&frames), &[36]), AfterSend::HoldOpen)
        .await;
    let transport = MockTransport::new(port);

    let mut config = local_config(4);
    config.stream.channel_capacity = 1;
    let mut connection = AcquisitionConnection::with_transport(transport.clone(), config)
        .await
        .unwrap();

    let mut records = connection.records().unwrap();
    assert!(records.next().await.is_some());
    drop(records);

    let mut states = connection.state_updates();
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(state) = states.next().await {
            if state.is_terminal() {
                return state;
            }
        }
        connection.current_state()
    })
    .await
    .unwrap();
    assert_eq!(ended, SessionState::Stopped);

    let report = connection.stop().await.unwrap();
    assert!(report.records_emitted >= 1);
    assert_eq!(transport.put_payloads(Endpoint::Acquisition).last(), Some(&json!({"state": 0})));
}
