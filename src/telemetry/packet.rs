//! Telemetry packet envelopes and classification
//!
//! Models the JSON datagrams broadcast by the local receiver daemons and
//! classifies each into the action the ingest driver should take.
//! Classification is pure; all mutation happens downstream.

use super::payload::{self, PayloadType};
use super::wenet::{self, GpsTelemetry, WenetPacketType};
use crate::link_state::{FrameQuality, LinkStatus, PayloadTelemetry};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One decoded UDP datagram, tagged by its `"type"` field. Unknown extra
/// fields are ignored; unknown type tags collapse into `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PacketEnvelope {
    /// LoRa receiver status report
    #[serde(rename = "STATUS")]
    Status { frequency: f64, rssi: f64 },

    /// Received LoRa frame with its payload bytes and reception quality
    #[serde(rename = "RXPKT")]
    RxPacket {
        rssi: f64,
        snr: f64,
        payload: Vec<u8>,
    },

    /// Nested Wenet sub-protocol packet
    #[serde(rename = "WENET")]
    Wenet { packet: Vec<u8> },

    /// Position report from an external feed
    #[serde(rename = "OZIMUX")]
    Ozimux {
        source_name: String,
        latitude: f64,
        longitude: f64,
        altitude: f64,
    },

    /// Low-priority chatter; content is ignored
    #[serde(rename = "LOWPRIORITY")]
    LowPriority,

    #[serde(other)]
    Other,
}

/// An envelope stamped with local receive time by the transport
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub envelope: PacketEnvelope,
    pub received_at: DateTime<Utc>,
}

impl ReceivedPacket {
    pub fn new(envelope: PacketEnvelope) -> Self {
        Self {
            envelope,
            received_at: Utc::now(),
        }
    }
}

/// Result of classifying one envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Status(LinkStatus),
    PayloadTelemetry {
        payload_id: String,
        telemetry: PayloadTelemetry,
        quality: FrameQuality,
    },
    WenetText { id: u8, text: String },
    WenetGps(GpsTelemetry),
    PositionReport {
        source: String,
        latitude: f64,
        longitude: f64,
        altitude: f64,
    },
    /// No state change, no broadcast
    Unrecognized,
}

/// Classify one envelope. Unknown categories, unknown sub-types and
/// undecodable payloads all classify to `Unrecognized`; the transport is
/// lossy and the protocol evolves independently of this service.
pub fn classify(envelope: &PacketEnvelope) -> Classification {
    match envelope {
        PacketEnvelope::Status { frequency, rssi } => Classification::Status(LinkStatus {
            frequency: *frequency,
            rssi: *rssi,
        }),

        PacketEnvelope::RxPacket { rssi, snr, payload } => {
            match PayloadType::from_raw(payload) {
                PayloadType::Telemetry => match payload::decode_payload_telemetry(payload) {
                    Ok(telemetry) => Classification::PayloadTelemetry {
                        payload_id: telemetry.payload_id.to_string(),
                        telemetry,
                        quality: FrameQuality {
                            rssi: *rssi,
                            snr: *snr,
                        },
                    },
                    Err(_) => Classification::Unrecognized,
                },
                PayloadType::Unknown(_) => Classification::Unrecognized,
            }
        }

        PacketEnvelope::Wenet { packet } => match WenetPacketType::from_raw(packet) {
            WenetPacketType::TextMessage => match wenet::decode_text_message(packet) {
                Ok(msg) => Classification::WenetText {
                    id: msg.id,
                    text: msg.text,
                },
                Err(_) => Classification::Unrecognized,
            },
            WenetPacketType::GpsTelemetry => match wenet::decode_gps_telemetry(packet) {
                Ok(gps) => Classification::WenetGps(gps),
                Err(_) => Classification::Unrecognized,
            },
            WenetPacketType::Unknown(_) => Classification::Unrecognized,
        },

        PacketEnvelope::Ozimux {
            source_name,
            latitude,
            longitude,
            altitude,
        } => Classification::PositionReport {
            source: source_name.clone(),
            latitude: *latitude,
            longitude: *longitude,
            altitude: *altitude,
        },

        PacketEnvelope::LowPriority | PacketEnvelope::Other => Classification::Unrecognized,
    }
}

impl PacketEnvelope {
    /// Human-readable one-line summary for the viewer packet log, or `None`
    /// for categories excluded from the log (high-volume imagery, external
    /// position feeds, low-priority chatter and anything unrecognized).
    pub fn summary(&self) -> Option<String> {
        match self {
            PacketEnvelope::Status { frequency, rssi } => Some(format!(
                "LoRa Status - Freq: {:.3} MHz, RSSI: {:.1} dBm",
                frequency, rssi
            )),
            PacketEnvelope::RxPacket { rssi, snr, payload } => Some(format!(
                "LoRa RX Packet - RSSI: {:.1} dBm, SNR: {:.1} dB, {} bytes",
                rssi,
                snr,
                payload.len()
            )),
            PacketEnvelope::Wenet { .. }
            | PacketEnvelope::Ozimux { .. }
            | PacketEnvelope::LowPriority
            | PacketEnvelope::Other => None,
        }
    }
}
