#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use hellodiff_core::{CaptureError, DecodeAdapter, DecodedCapture, DigestRecord};
use serde_json::{json, Map, Value};

pub const TARGET: &str = "93.184.216.34";

/// Serves canned decode trees keyed by capture path.
#[derive(Default)]
pub struct FakeAdapter {
    captures: HashMap<PathBuf, Vec<Value>>,
    digests: HashMap<PathBuf, Vec<DigestRecord>>,
}

impl FakeAdapter {
    pub fn with_capture(mut self, path: &str, packets: Vec<Value>) -> Self {
        self.captures.insert(PathBuf::from(path), packets);
        self
    }

    pub fn with_digests(mut self, path: &str, records: Vec<DigestRecord>) -> Self {
        self.digests.insert(PathBuf::from(path), records);
        self
    }
}

impl DecodeAdapter for FakeAdapter {
    fn decode(&self, path: &Path) -> Result<DecodedCapture, CaptureError> {
        match self.captures.get(path) {
            Some(packets) => Ok(DecodedCapture::from_packets(packets.clone())),
            None => Err(CaptureError::MalformedOutput(format!(
                "no such capture: {}",
                path.display()
            ))),
        }
    }

    fn digests(&self, path: &Path) -> Result<Vec<DigestRecord>, CaptureError> {
        Ok(self.digests.get(path).cloned().unwrap_or_default())
    }
}

/// ClientHello field lists as the decoder prints them.
#[derive(Clone)]
pub struct ClientHello {
    pub version: String,
    pub ciphers: Vec<String>,
    pub extensions: Vec<u16>,
    pub groups: Vec<String>,
    pub formats: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ClientHello {
    /// A Chrome-like hello.
    pub fn browser() -> Self {
        Self {
            version: "0x0303".to_string(),
            ciphers: owned(&[
                "0x1301", "0x1302", "0x1303", "0xc02b", "0xc02f", "0xc02c", "0xc030", "0xcca9",
                "0xcca8",
            ]),
            extensions: vec![0, 23, 65281, 10, 11, 35, 16, 5, 13, 18, 51, 45, 43],
            groups: owned(&["0x001d", "0x0017", "0x0018"]),
            formats: owned(&["0"]),
        }
    }

    pub fn with_ciphers(mut self, extra: &[&str]) -> Self {
        self.ciphers.extend(owned(extra));
        self
    }

    fn handshake(&self) -> Value {
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
            if *code == 10 {
                ext.insert(
                    "tls.handshake.extensions_supported_groups".into(),
                    json!({ "tls.handshake.extensions_supported_group": self.groups }),
                );
            }
            if *code == 11 {
                ext.insert(
                    "tls.handshake.extensions_ec_point_formats".into(),
                    json!({ "tls.handshake.extensions_ec_point_format": self.formats }),
                );
            }
            handshake.insert(format!("Extension: type {}", code), Value::Object(ext));
        }
        Value::Object(handshake)
    }

    pub fn packet(&self, frame: u64, dst: &str) -> Value {
        json!({ "_source": { "layers": {
            "frame": { "frame.number": frame.to_string() },
            "ip": { "ip.src": "192.168.1.20", "ip.dst": dst },
            "tcp": { "tcp.dstport": "443" },
            "tls": { "tls.record": { "tls.handshake": self.handshake() } }
        } } })
    }
}

/// A DNS query followed by a TCP handshake, then the hello.
pub fn session(hello: &ClientHello) -> Vec<Value> {
    vec![
        json!({ "_source": { "layers": {
            "frame": { "frame.number": "1" },
            "ip": { "ip.src": "192.168.1.20", "ip.dst": "192.168.1.1" },
            "udp": { "udp.dstport": "53" }
        } } }),
        json!({ "_source": { "layers": {
            "frame": { "frame.number": "2" },
            "ip": { "ip.src": "192.168.1.20", "ip.dst": TARGET },
            "tcp": { "tcp.flags.syn": "1" }
        } } }),
        hello.packet(3, TARGET),
    ]
}
