//! Decode-tree builders for unit tests.

use serde_json::{json, Map, Value};

use crate::capture::DecodedCapture;

/// Little-endian microsecond pcap global header, Ethernet link type.
pub(crate) const PCAP_HEADER: [u8; 24] = [
    0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xff, 0xff, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
];

/// Little-endian pcapng section header block without options.
pub(crate) const PCAPNG_SECTION_HEADER: [u8; 28] = [
    0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0x00, 0x00, 0x00, 0x4d, 0x3c, 0x2b, 0x1a, 0x01, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x1c, 0x00, 0x00, 0x00,
];

/// Shape of a synthetic ClientHello.
#[derive(Debug, Clone)]
pub(crate) struct Hello {
    pub version: &'static str,
    pub ciphers: Vec<&'static str>,
    pub extensions: Vec<u16>,
    pub groups: Vec<&'static str>,
    pub formats: Vec<&'static str>,
}

impl Default for Hello {
    fn default() -> Self {
        Self {
            version: "0x0303",
            ciphers: vec!["0x1301", "0x1302", "0x1303", "0xc02b", "0xc02f"],
            extensions: vec![0x0000, 0x0017, 0x000a, 0x000b, 0x000d],
            groups: vec!["0x001d", "0x0017", "0x0018"],
            formats: vec!["0"],
        }
    }
}

impl Hello {
    pub fn handshake(&self) -> Value {
        let mut handshake = Map::new();
        handshake.insert("tls.handshake.type".into(), json!("1"));
        handshake.insert("tls.handshake.version".into(), json!(self.version));
        handshake.insert(
            "tls.handshake.ciphersuites".into(),
            json!({ "tls.handshake.ciphersuite": self.ciphers }),
        );

        for code in &self.extensions {
            let mut ext = Map::new();
            ext.insert("tls.handshake.extension.type".into(), json!(code.to_string()));
            match *code {
                0x000a => {
                    ext.insert(
                        "tls.handshake.extensions_supported_groups".into(),
                        json!({ "tls.handshake.extensions_supported_group": self.groups }),
                    );
                }
                0x000b => {
                    ext.insert(
                        "tls.handshake.extensions_ec_point_formats".into(),
                        json!({ "tls.handshake.extensions_ec_point_format": self.formats }),
                    );
                }
                _ => {}
            }
            handshake.insert(format!("Extension: type {} (len=0)", code), Value::Object(ext));
        }
        Value::Object(handshake)
    }

    /// Packet carrying this ClientHello from 10.0.0.2 to `dst`.
    pub fn packet(&self, frame: u64, dst: &str) -> Value {
        json!({ "_source": { "layers": {
            "frame": { "frame.number": frame.to_string() },
            "ip": { "ip.src": "10.0.0.2", "ip.dst": dst },
            "tcp": { "tcp.dstport": "443" },
            "tls": { "tls.record": { "tls.handshake": self.handshake() } }
        } } })
    }
}

/// Packet without any TLS layer.
pub(crate) fn tcp_packet(frame: u64, dst: &str) -> Value {
    json!({ "_source": { "layers": {
        "frame": { "frame.number": frame.to_string() },
        "ip": { "ip.src": "10.0.0.2", "ip.dst": dst },
        "tcp": { "tcp.dstport": "443" }
    } } })
}

pub(crate) fn capture(packets: Vec<Value>) -> DecodedCapture {
    DecodedCapture::from_packets(packets)
}
