//! Ingest driver
//!
//! Drains the packet channel fed by the UDP listener: classify each envelope,
//! apply the matching store mutation, then publish the matching event. The
//! order is strict - mutate first, publish a snapshot taken after the
//! mutation - so every broadcast reflects the update that triggered it.

use crate::broadcaster::EventBroadcaster;
use crate::link_state::LinkStateStore;
use crate::telemetry::{classify, Classification, ReceivedPacket};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Timestamp format used in viewer-facing log lines
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn run(
    mut rx: mpsc::Receiver<ReceivedPacket>,
    store: Arc<LinkStateStore>,
    broadcaster: EventBroadcaster,
) {
    info!("Ingest driver started");
    while let Some(packet) = rx.recv().await {
        handle_packet(&packet, &store, &broadcaster);
    }
    warn!("Packet channel closed, ingest driver stopping");
}

/// Process one received packet: log line, classification, store update,
/// broadcast. Unrecognized packets are dropped silently.
fn handle_packet(packet: &ReceivedPacket, store: &LinkStateStore, broadcaster: &EventBroadcaster) {
    let timestamp = packet.received_at.format(LOG_TIME_FORMAT).to_string();

    // Viewer packet log, minus the suppressed categories
    if let Some(summary) = packet.envelope.summary() {
        broadcaster.publish(
            "log_event",
            &json!({
                "timestamp": timestamp,
                "msg": summary,
            }),
        );
    }

    match classify(&packet.envelope) {
        Classification::Status(status) => {
            debug!(
                "Link status: {:.3} MHz, {:.1} dBm",
                status.frequency, status.rssi
            );
            store.apply_status(status);
            broadcaster.publish("lora_event", &store.snapshot_link_state());
        }

        Classification::PayloadTelemetry {
            payload_id,
            telemetry,
            quality,
        } => {
            debug!(
                "Payload {} telemetry: ({:.5}, {:.5}) at {}m, frame {:.1} dBm / {:.1} dB",
                payload_id,
                telemetry.latitude,
                telemetry.longitude,
                telemetry.altitude,
                quality.rssi,
                quality.snr
            );
            store.apply_payload_telemetry(&payload_id, telemetry, quality);
            broadcaster.publish("lora_event", &store.snapshot_link_state());
        }

        Classification::WenetText { id, text } => {
            broadcaster.publish(
                "wenet_event",
                &json!({
                    "timestamp": timestamp,
                    "msg": format!("Debug {}: {}", id, text),
                }),
            );
        }

        Classification::WenetGps(gps) => {
            broadcaster.publish("wenet_gps", &json!({ "data": gps.to_string() }));
        }

        Classification::PositionReport {
            source,
            latitude,
            longitude,
            altitude,
        } => {
            store.apply_position_report(&source, latitude, longitude, altitude);
            broadcaster.publish("ozimux_event", &store.snapshot_position_sources());
        }

        Classification::Unrecognized => {
            debug!("Dropping unrecognized packet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::payload::TELEMETRY_FRAME_LEN;
    use crate::telemetry::PacketEnvelope;
    use serde_json::Value;
    use tokio::sync::broadcast::error::TryRecvError;

    fn setup() -> (Arc<LinkStateStore>, EventBroadcaster) {
        (Arc::new(LinkStateStore::new()), EventBroadcaster::new(64))
    }

    fn received(json: &str) -> ReceivedPacket {
        ReceivedPacket::new(serde_json::from_str::<PacketEnvelope>(json).unwrap())
    }

    fn next_frame(rx: &mut tokio::sync::broadcast::Receiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_status_packet_updates_store_and_broadcasts() {
        let (store, broadcaster) = setup();
        let mut rx = broadcaster.subscribe();

        handle_packet(
            &received(r#"{"type": "STATUS", "frequency": 434.2, "rssi": -91}"#),
            &store,
            &broadcaster,
        );

        // Status packets are logged, then the aggregate is pushed
        let log = next_frame(&mut rx);
        assert_eq!(log["event"], "log_event");
        assert!(log["data"]["msg"].as_str().unwrap().contains("LoRa Status"));

        let lora = next_frame(&mut rx);
        assert_eq!(lora["event"], "lora_event");
        assert_eq!(lora["data"]["frequency"], 434.2);
        assert_eq!(lora["data"]["rssi"], -91.0);

        let snapshot = store.snapshot_link_state();
        assert_eq!(snapshot.status.frequency, 434.2);
        assert_eq!(snapshot.status.rssi, -91.0);
    }

    #[test]
    fn test_rx_packet_sequence_last_write_wins() {
        let (store, broadcaster) = setup();

        let mut payload = vec![0u8; TELEMETRY_FRAME_LEN];
        payload[2] = 3;
        let first = ReceivedPacket::new(PacketEnvelope::RxPacket {
            rssi: -80.0,
            snr: 9.0,
            payload: payload.clone(),
        });
        payload[3] = 1; // bump the counter in the second frame
        let second = ReceivedPacket::new(PacketEnvelope::RxPacket {
            rssi: -75.0,
            snr: 8.5,
            payload,
        });

        handle_packet(&first, &store, &broadcaster);
        handle_packet(&second, &store, &broadcaster);

        let record = &store.snapshot_link_state().payloads["3"];
        assert_eq!(record.counter, 1);
        assert_eq!(record.pkt_rssi, -75.0);
        assert_eq!(record.pkt_snr, 8.5);
    }

    #[test]
    fn test_position_reports_broadcast_full_mapping() {
        let (store, broadcaster) = setup();
        let mut rx = broadcaster.subscribe();

        handle_packet(
            &received(
                r#"{"type": "OZIMUX", "source_name": "chase1", "latitude": 10.0, "longitude": 20.0, "altitude": 100.0}"#,
            ),
            &store,
            &broadcaster,
        );
        let first = next_frame(&mut rx);
        assert_eq!(first["event"], "ozimux_event");
        assert_eq!(first["data"].as_object().unwrap().len(), 1);

        handle_packet(
            &received(
                r#"{"type": "OZIMUX", "source_name": "chase2", "latitude": -35.0, "longitude": 138.0, "altitude": 50.0}"#,
            ),
            &store,
            &broadcaster,
        );
        let second = next_frame(&mut rx);
        // Each push carries the whole mapping, both entries after the second
        assert_eq!(second["data"].as_object().unwrap().len(), 2);
        assert_eq!(second["data"]["chase1"]["latitude"], 10.0);
        assert_eq!(second["data"]["chase2"]["source"], "chase2");
    }

    #[test]
    fn test_wenet_text_broadcasts_debug_message() {
        let (store, broadcaster) = setup();
        let mut rx = broadcaster.subscribe();

        let mut packet = vec![0x00, 5];
        packet.extend_from_slice(b"camera ok");
        handle_packet(
            &ReceivedPacket::new(PacketEnvelope::Wenet { packet }),
            &store,
            &broadcaster,
        );

        // No log_event for wenet traffic, just the wenet_event itself
        let frame = next_frame(&mut rx);
        assert_eq!(frame["event"], "wenet_event");
        assert_eq!(frame["data"]["msg"], "Debug 5: camera ok");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_unrecognized_packet_is_silent() {
        let (store, broadcaster) = setup();
        let mut rx = broadcaster.subscribe();

        handle_packet(
            &received(r#"{"type": "GHOST", "payload": [1, 2, 3]}"#),
            &store,
            &broadcaster,
        );
        handle_packet(
            &received(r#"{"type": "LOWPRIORITY", "payload": [9]}"#),
            &store,
            &broadcaster,
        );

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(store.snapshot_link_state().payloads.is_empty());
        assert!(store.snapshot_position_sources().is_empty());
    }
}
