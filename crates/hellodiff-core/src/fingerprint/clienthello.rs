use std::net::IpAddr;

use tracing::info;

use crate::capture::DecodedCapture;
use crate::error::FingerprintError;
use crate::fingerprint::types::HelloClientRecord;

/// Every handshake-bearing packet sent to `target`, in capture order.
///
/// A packet with several handshake records yields one record per handshake.
pub fn hello_clients(
    capture: &DecodedCapture,
    target: IpAddr,
) -> impl Iterator<Item = HelloClientRecord> + '_ {
    capture.packets().iter().flat_map(move |packet| {
        let matched = match packet.destination() {
            Some((dst, net)) if dst == target => Some((net, packet.handshakes())),
            _ => None,
        };
        matched
            .into_iter()
            .flat_map(move |(net, handshakes)| {
                handshakes.into_iter().map(move |handshake| HelloClientRecord {
                    ip: net.clone(),
                    handshake: handshake.clone(),
                    frame: packet.frame_number(),
                })
            })
    })
}

/// The first handshake sent to `target`.
///
/// Only this one is fingerprinted; later connections to the same address
/// are ignored.
pub fn get_hello_client(
    capture: &DecodedCapture,
    target: IpAddr,
) -> Result<HelloClientRecord, FingerprintError> {
    let record = hello_clients(capture, target)
        .next()
        .ok_or(FingerprintError::HandshakeNotFound(target))?;

    match record.frame {
        Some(frame) => info!("Found ClientHello to {} in frame {}", target, frame),
        None => info!("Found ClientHello to {}", target),
    }
    Ok(record)
}
