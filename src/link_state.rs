//! Link state store
//!
//! Holds the latest known state per telemetry source: the LoRa link status,
//! one record per payload id, and one entry per external position feed.
//! Every mutation is last-write-wins and replaces whole values; reads return
//! independent copies so a snapshot never observes a half-applied update.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Sentinel RSSI reported before any status packet has been received
pub const RSSI_UNKNOWN: f64 = -300.0;

/// LoRa receiver status
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkStatus {
    /// Receiver centre frequency in MHz
    pub frequency: f64,
    /// Current RSSI in dBm
    pub rssi: f64,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            rssi: RSSI_UNKNOWN,
        }
    }
}

/// Reception quality of the frame that carried a payload telemetry record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameQuality {
    pub rssi: f64,
    pub snr: f64,
}

/// Latest decoded telemetry for one payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PayloadTelemetry {
    pub payload_id: u8,
    pub payload_flags: u8,
    pub counter: u16,
    /// Payload GNSS time of day, "HH:MM:SS"
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in metres
    pub altitude: u16,
    /// Ground speed in km/h
    pub speed: f64,
    pub sats: u8,
    /// Internal temperature in degrees C
    pub temp: i8,
    pub batt_voltage: f64,
    pub pyro_voltage: f64,
    /// Packets received by the payload on the uplink
    pub rx_pkt_count: u8,
    /// Uplink RSSI as reported by the payload, dBm
    pub rssi: f64,
    /// RSSI of the frame that carried this record, dBm
    pub pkt_rssi: f64,
    /// SNR of the frame that carried this record, dB
    pub pkt_snr: f64,
}

/// External position feed entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PositionSource {
    pub source: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Local receive time of the last report. Consumers derive age from this
    /// at query time; upstream timestamps are not trusted.
    pub last_update: DateTime<Utc>,
}

/// Aggregate link state: receiver status plus latest record per payload id.
/// Serialized wholesale on every broadcast and snapshot query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkState {
    #[serde(flatten)]
    pub status: LinkStatus,
    pub payloads: HashMap<String, PayloadTelemetry>,
}

#[derive(Default)]
struct StoreInner {
    link: LinkState,
    positions: HashMap<String, PositionSource>,
}

/// Shared state store. The ingest driver is the only writer; snapshot
/// queries and WebSocket connects read concurrently via copies.
#[derive(Default)]
pub struct LinkStateStore {
    inner: RwLock<StoreInner>,
}

impl LinkStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the link status unconditionally. Packets may arrive out of
    /// order; no reordering is attempted.
    pub fn apply_status(&self, status: LinkStatus) {
        let mut inner = self.write();
        inner.link.status = status;
    }

    /// Replace the record for `id` wholesale, then patch the reception
    /// quality fields from the carrying frame. The frame quality always wins
    /// over anything the payload itself reported.
    pub fn apply_payload_telemetry(
        &self,
        id: &str,
        telemetry: PayloadTelemetry,
        quality: FrameQuality,
    ) {
        let mut inner = self.write();
        let mut record = telemetry;
        record.pkt_rssi = quality.rssi;
        record.pkt_snr = quality.snr;
        inner.link.payloads.insert(id.to_string(), record);
    }

    /// Create or update the named position feed, stamped with local receive
    /// time. Entries for different names never merge.
    pub fn apply_position_report(&self, source: &str, latitude: f64, longitude: f64, altitude: f64) {
        let mut inner = self.write();
        inner.positions.insert(
            source.to_string(),
            PositionSource {
                source: source.to_string(),
                latitude,
                longitude,
                altitude,
                last_update: Utc::now(),
            },
        );
    }

    /// Point-in-time copy of the aggregate link state
    pub fn snapshot_link_state(&self) -> LinkState {
        self.read().link.clone()
    }

    /// Point-in-time copy of the position feed mapping
    pub fn snapshot_position_sources(&self) -> HashMap<String, PositionSource> {
        self.read().positions.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
