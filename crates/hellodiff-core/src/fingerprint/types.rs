use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::canon::{ExtensionId, HexCode, TlsVersion};
use crate::capture::Object;

/// The first handshake a capture shows being sent to the target address.
#[derive(Debug, Clone, PartialEq)]
pub struct HelloClientRecord {
    /// Network layer of the carrying packet (`ip` or `ipv6`)
    pub ip: Object,
    /// Decoded `tls.handshake` sub-tree
    pub handshake: Object,
    /// Frame number of the carrying packet, when the decoder reports one
    pub frame: Option<u64>,
}

impl HelloClientRecord {
    pub fn is_client_hello(&self) -> bool {
        self.handshake.get("tls.handshake.type").and_then(Value::as_str) == Some("1")
    }
}

/// Extension type to its decoded payload.
pub type ExtensionMap = BTreeMap<ExtensionId, Value>;

/// Canonical ClientHello fields used for comparison.
///
/// Lists are held as sets: ordering is not compared. GREASE ciphers and
/// groups are dropped; GREASE extension types collapse onto the single
/// [`crate::canon::Canonical::Grease`] member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ja3RawPayload {
    pub tls_version: TlsVersion,
    pub ciphers: BTreeSet<HexCode>,
    pub extensions: BTreeSet<ExtensionId>,
    pub elliptic_curves: BTreeSet<HexCode>,
    /// Point format codes as the decoder printed them
    pub elliptic_curve_formats: BTreeSet<String>,
}
