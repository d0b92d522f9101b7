//! Boundary with the external protocol analyzer.
//!
//! The analyzer turns a capture file into a JSON decode tree, one object per
//! packet, shaped like `tshark -T json` output:
//!
//! ```text
//! [{ "_source": { "layers": {
//!     "frame": { "frame.number": "4", ... },
//!     "ip":    { "ip.dst": "93.184.216.34", ... },
//!     "tls":   { "tls.record": { "tls.handshake": { ... } } }
//! } } }, ...]
//! ```
//!
//! A key that repeats inside one object (a second TLS record, every cipher
//! suite) is expected as a JSON array. Both the single and the array shape
//! are accepted everywhere.

mod dir;
pub mod tshark;

use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::Path;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{PcapBlockOwned, PcapError};
use serde_json::{Map, Value};

use crate::digest::DigestRecord;
use crate::error::CaptureError;

pub use dir::CaptureDir;
pub use tshark::TsharkAdapter;

/// JSON object as produced by the decoder.
pub type Object = Map<String, Value>;

/// Produces decode trees and pre-computed digests from capture files.
pub trait DecodeAdapter {
    /// Decode every packet of the capture, in file order.
    fn decode(&self, path: &Path) -> Result<DecodedCapture, CaptureError>;

    /// Per-ClientHello JA3 strings and digests computed by the decoder.
    fn digests(&self, path: &Path) -> Result<Vec<DigestRecord>, CaptureError>;
}

/// All decoded packets of one capture file.
#[derive(Debug, Clone, Default)]
pub struct DecodedCapture {
    packets: Vec<DecodedPacket>,
}

impl DecodedCapture {
    /// Parse the decoder's JSON output: a top-level array of packets.
    pub fn from_json(raw: &[u8]) -> Result<Self, CaptureError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| CaptureError::MalformedOutput(e.to_string()))?;
        match value {
            Value::Array(packets) => Ok(Self::from_packets(packets)),
            other => Err(CaptureError::MalformedOutput(format!(
                "expected an array of packets, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_packets(packets: Vec<Value>) -> Self {
        Self {
            packets: packets.into_iter().map(DecodedPacket).collect(),
        }
    }

    pub fn packets(&self) -> &[DecodedPacket] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

/// One decoded packet.
#[derive(Debug, Clone)]
pub struct DecodedPacket(Value);

impl DecodedPacket {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Protocol layers keyed by name.
    pub fn layers(&self) -> Option<&Object> {
        self.0.get("_source")?.get("layers")?.as_object()
    }

    /// Every occurrence of a layer (tunnels and multi-PDU frames repeat them).
    pub fn layer(&self, name: &str) -> Vec<&Object> {
        self.layers()
            .and_then(|layers| layers.get(name))
            .map(|v| objects(v).collect())
            .unwrap_or_default()
    }

    /// Frame number assigned by the decoder, starting at 1.
    pub fn frame_number(&self) -> Option<u64> {
        self.layer("frame")
            .first()
            .and_then(|frame| frame.get("frame.number"))
            .and_then(Value::as_str)
            .and_then(|n| n.parse().ok())
    }

    /// Destination address and the network layer it was read from.
    pub fn destination(&self) -> Option<(IpAddr, &Object)> {
        for (layer, key) in [("ip", "ip.dst"), ("ipv6", "ipv6.dst")] {
            if let Some(net) = self.layer(layer).into_iter().next() {
                let addr = net
                    .get(key)
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<IpAddr>().ok());
                if let Some(addr) = addr {
                    return Some((addr, net));
                }
            }
        }
        None
    }

    /// Non-empty handshake sub-trees of every TLS record in the packet.
    pub fn handshakes(&self) -> Vec<&Object> {
        self.layer("tls")
            .into_iter()
            .filter_map(|tls| tls.get("tls.record"))
            .flat_map(|records| objects(records))
            .filter_map(|record| record.get("tls.handshake"))
            .flat_map(|handshakes| objects(handshakes))
            .filter(|handshake| !handshake.is_empty())
            .collect()
    }
}

/// Iterate a value that is either one object or an array of objects.
pub(crate) fn objects(value: &Value) -> impl Iterator<Item = &Object> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    items.iter().filter_map(Value::as_object)
}

/// Collect a value that is either one string or an array of strings.
pub(crate) fn strings(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// On-disk container of a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Pcap,
    PcapNg,
}

const SNIFF_BUFFER: usize = 65536;

/// Identify the capture container by parsing its file header.
///
/// A pcap global header or pcapng section header block must parse in
/// full; a bare magic number or a truncated header is rejected.
pub fn sniff_format(path: &Path) -> Result<CaptureFormat, CaptureError> {
    let unsupported = |reason: String| CaptureError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path)?;
    let mut reader = match pcap_parser::create_reader(SNIFF_BUFFER, BufReader::new(file)) {
        Ok(reader) => reader,
        Err(PcapError::Eof) => return Err(unsupported("empty file".to_string())),
        Err(e) => return Err(unsupported(format!("{:?}", e))),
    };

    match reader.next() {
        Ok((_, PcapBlockOwned::LegacyHeader(_) | PcapBlockOwned::Legacy(_))) => {
            Ok(CaptureFormat::Pcap)
        }
        Ok((_, PcapBlockOwned::NG(_))) => Ok(CaptureFormat::PcapNg),
        Err(e) => Err(unsupported(format!("{:?}", e))),
    }
}
