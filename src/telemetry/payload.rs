//! Binary payload telemetry frame decoder
//!
//! Decodes the fixed-layout telemetry frame carried inside RXPKT envelopes.
//! The frame is 26 bytes, little-endian, produced by the payload firmware.

use crate::link_state::PayloadTelemetry;
use thiserror::Error;

/// Expected length of a payload telemetry frame
pub const TELEMETRY_FRAME_LEN: usize = 26;

/// Offset applied to the raw RSSI byte to recover dBm
const RSSI_OFFSET: f64 = 164.0;

/// Payload packet type, taken from the first byte of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    Telemetry,
    Unknown(u8),
}

impl PayloadType {
    pub fn from_raw(raw: &[u8]) -> Self {
        match raw.first() {
            Some(0x00) => Self::Telemetry,
            Some(&other) => Self::Unknown(other),
            None => Self::Unknown(0xFF),
        }
    }
}

/// Decode error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated frame: got {got} bytes, expected {expected}")]
    Truncated { got: usize, expected: usize },

    #[error("unexpected packet type {0:#04x}")]
    WrongType(u8),
}

/// Decode a payload telemetry frame.
///
/// Layout (little-endian):
/// ```text
/// [0]      packet type (0x00)
/// [1]      payload flags
/// [2]      payload id
/// [3..5]   frame counter (u16)
/// [5..8]   time of day: hour, minute, second
/// [8..12]  latitude (f32, degrees)
/// [12..16] longitude (f32, degrees)
/// [16..18] altitude (u16, metres)
/// [18]     ground speed (km/h)
/// [19]     GNSS satellites used
/// [20]     temperature (i8, degC)
/// [21]     battery ADC (volts = 0.5 + 1.5 * raw / 255)
/// [22]     pyro ADC (volts = 5.0 * raw / 255)
/// [23]     packets received by payload
/// [24]     uplink RSSI (dBm = raw - 164)
/// [25]     uplink slot flags
/// ```
pub fn decode_payload_telemetry(raw: &[u8]) -> Result<PayloadTelemetry, DecodeError> {
    if raw.len() < TELEMETRY_FRAME_LEN {
        return Err(DecodeError::Truncated {
            got: raw.len(),
            expected: TELEMETRY_FRAME_LEN,
        });
    }
    if raw[0] != 0x00 {
        return Err(DecodeError::WrongType(raw[0]));
    }

    let latitude = f32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as f64;
    let longitude = f32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]) as f64;

    Ok(PayloadTelemetry {
        payload_flags: raw[1],
        payload_id: raw[2],
        counter: u16::from_le_bytes([raw[3], raw[4]]),
        time: format!("{:02}:{:02}:{:02}", raw[5], raw[6], raw[7]),
        latitude,
        longitude,
        altitude: u16::from_le_bytes([raw[16], raw[17]]),
        speed: raw[18] as f64,
        sats: raw[19],
        temp: raw[20] as i8,
        batt_voltage: 0.5 + 1.5 * raw[21] as f64 / 255.0,
        pyro_voltage: 5.0 * raw[22] as f64 / 255.0,
        rx_pkt_count: raw[23],
        rssi: raw[24] as f64 - RSSI_OFFSET,
        pkt_rssi: 0.0,
        pkt_snr: 0.0,
    })
}
