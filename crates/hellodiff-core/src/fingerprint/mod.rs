//! Locating the ClientHello in a decode tree and canonicalizing it.

pub mod clienthello;
pub mod ja3;
pub mod types;

pub use clienthello::{get_hello_client, hello_clients};
pub use ja3::{build_ja3_payload, extract_extensions, extract_payload};
pub use types::{ExtensionMap, HelloClientRecord, Ja3RawPayload};
