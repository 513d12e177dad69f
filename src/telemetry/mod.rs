//! Telemetry wire formats: UDP packet envelopes, classification and the
//! payload-level codecs nested inside them.

pub mod packet;
pub mod payload;
pub mod wenet;

pub use packet::{classify, Classification, PacketEnvelope, ReceivedPacket};
