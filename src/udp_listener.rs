//! UDP listener for telemetry datagrams
//!
//! Transport adapter between the local receiver daemons and the ingest
//! driver. One JSON envelope per datagram; malformed datagrams are dropped
//! here so the ingest path only ever sees well-formed envelopes.

use crate::telemetry::{PacketEnvelope, ReceivedPacket};
use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Largest datagram we accept; Wenet packets are the biggest on this network
const MAX_DATAGRAM: usize = 65536;

pub async fn run(port: u16, tx: mpsc::Sender<ReceivedPacket>) -> Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    info!("Listening for telemetry on UDP port {}", port);

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, addr) = socket.recv_from(&mut buf).await?;

        match serde_json::from_slice::<PacketEnvelope>(&buf[..len]) {
            Ok(envelope) => {
                // Stamp receive time here; everything downstream derives
                // age and log timestamps from it.
                if tx.send(ReceivedPacket::new(envelope)).await.is_err() {
                    warn!("Packet channel closed, stopping UDP listener");
                    return Ok(());
                }
            }
            Err(e) => {
                debug!("Dropping malformed datagram from {}: {}", addr, e);
            }
        }
    }
}
