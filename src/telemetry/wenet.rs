//! Wenet sub-protocol packet decoder
//!
//! Wenet packets arrive nested inside WENET envelopes. Only the text message
//! and GPS telemetry types are surfaced to viewers; the high-volume imagery
//! types are ignored upstream of this module.

use super::payload::DecodeError;
use std::fmt;

/// Minimum length of a GPS telemetry packet
const GPS_TELEMETRY_LEN: usize = 22;

/// Wenet packet type, taken from the first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WenetPacketType {
    TextMessage,
    GpsTelemetry,
    Unknown(u8),
}

impl WenetPacketType {
    pub fn from_raw(raw: &[u8]) -> Self {
        match raw.first() {
            Some(0x00) => Self::TextMessage,
            Some(0x01) => Self::GpsTelemetry,
            Some(&other) => Self::Unknown(other),
            None => Self::Unknown(0xFF),
        }
    }
}

/// Decoded debug text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub id: u8,
    pub text: String,
}

/// Decode a text message packet: `[0]` type, `[1]` message id, `[2..]` UTF-8 text.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_text_message(raw: &[u8]) -> Result<TextMessage, DecodeError> {
    if raw.len() < 2 {
        return Err(DecodeError::Truncated {
            got: raw.len(),
            expected: 2,
        });
    }
    if raw[0] != 0x00 {
        return Err(DecodeError::WrongType(raw[0]));
    }
    Ok(TextMessage {
        id: raw[1],
        text: String::from_utf8_lossy(&raw[2..]).into_owned(),
    })
}

/// Decoded GPS telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct GpsTelemetry {
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub ground_speed: f64,
    pub sats: u8,
    pub fix_type: u8,
}

impl GpsTelemetry {
    fn fix_str(&self) -> &'static str {
        match self.fix_type {
            0 => "None",
            2 => "2D",
            3 => "3D",
            _ => "?",
        }
    }
}

impl fmt::Display for GpsTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Lat: {:.5} Lon: {:.5} Alt: {:.0}m Spd: {:.1}kph Sats: {} Fix: {}",
            self.time,
            self.latitude,
            self.longitude,
            self.altitude,
            self.ground_speed,
            self.sats,
            self.fix_str()
        )
    }
}

/// Decode a GPS telemetry packet (22 bytes, little-endian):
/// `[0]` type, `[1..4]` hour/minute/second, `[4..8]` lat f32, `[8..12]` lon f32,
/// `[12..16]` alt f32, `[16..20]` ground speed f32 (km/h), `[20]` sats, `[21]` fix type.
pub fn decode_gps_telemetry(raw: &[u8]) -> Result<GpsTelemetry, DecodeError> {
    if raw.len() < GPS_TELEMETRY_LEN {
        return Err(DecodeError::Truncated {
            got: raw.len(),
            expected: GPS_TELEMETRY_LEN,
        });
    }
    if raw[0] != 0x01 {
        return Err(DecodeError::WrongType(raw[0]));
    }
    Ok(GpsTelemetry {
        time: format!("{:02}:{:02}:{:02}", raw[1], raw[2], raw[3]),
        latitude: f32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as f64,
        longitude: f32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as f64,
        altitude: f32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]) as f64,
        ground_speed: f32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]) as f64,
        sats: raw[20],
        fix_type: raw[21],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_message() {
        let mut raw = vec![0x00, 42];
        raw.extend_from_slice(b"SSDV uplink active");
        let msg = decode_text_message(&raw).unwrap();
        assert_eq!(msg.id, 42);
        assert_eq!(msg.text, "SSDV uplink active");
    }

    #[test]
    fn test_decode_text_message_truncated() {
        assert!(decode_text_message(&[0x00]).is_err());
    }

    #[test]
    fn test_decode_gps_telemetry() {
        let mut raw = vec![0x01, 11, 5, 59];
        raw.extend_from_slice(&(-34.5_f32).to_le_bytes());
        raw.extend_from_slice(&138.75_f32.to_le_bytes());
        raw.extend_from_slice(&10023.0_f32.to_le_bytes());
        raw.extend_from_slice(&51.2_f32.to_le_bytes());
        raw.extend_from_slice(&[9, 3]);

        let gps = decode_gps_telemetry(&raw).unwrap();
        assert_eq!(gps.time, "11:05:59");
        assert!((gps.latitude - -34.5).abs() < 1e-4);
        assert_eq!(gps.sats, 9);
        assert_eq!(
            gps.to_string(),
            "11:05:59 Lat: -34.50000 Lon: 138.75000 Alt: 10023m Spd: 51.2kph Sats: 9 Fix: 3D"
        );
    }

    #[test]
    fn test_packet_type() {
        assert_eq!(WenetPacketType::from_raw(&[0x00]), WenetPacketType::TextMessage);
        assert_eq!(WenetPacketType::from_raw(&[0x01]), WenetPacketType::GpsTelemetry);
        assert_eq!(WenetPacketType::from_raw(&[0x55]), WenetPacketType::Unknown(0x55));
    }
}
