//! TLS ClientHello fingerprint extraction and N-way comparison over packet
//! captures.

pub mod canon;
pub mod capture;
pub mod compare;
pub mod digest;
pub mod error;
pub mod fingerprint;

#[cfg(test)]
mod testing;

pub use capture::{CaptureDir, DecodeAdapter, DecodedCapture, TsharkAdapter};
pub use compare::{compare_payloads, compare_raw, ComparisonReport, FieldReport, FIELDS};
pub use digest::{group_digests_by_ip, DigestConsistency, DigestRecord};
pub use error::{CaptureError, CompareError, FingerprintError};
pub use fingerprint::{extract_payload, Ja3RawPayload};
