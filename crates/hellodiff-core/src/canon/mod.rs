//! Canonicalization tables for the ClientHello code spaces.
//!
//! Each code space (cipher suites, extension types, named groups) has one
//! lookup function returning a [`Canonical`] value. GREASE is checked before
//! the registry so every reserved code collapses onto the same token.

pub mod grease;
mod tables;
pub mod version;

use std::fmt;

use serde::{Serialize, Serializer};

pub use grease::{is_grease, GREASE_NAME};
pub use version::TlsVersion;

/// Result of resolving a code point against a registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Canonical<R> {
    /// Registered code point, by IANA name.
    Known(&'static str),
    /// Any RFC 8701 reserved value.
    Grease,
    /// Code absent from the registry, kept as the adapter reported it.
    Raw(R),
}

impl<R> Canonical<R> {
    pub fn is_grease(&self) -> bool {
        matches!(self, Self::Grease)
    }

    fn resolve(table: &'static [(u16, &'static str)], code: u16, raw: R) -> Self {
        if is_grease(code) {
            return Self::Grease;
        }
        match tables::lookup(table, code) {
            Some(name) => Self::Known(name),
            None => Self::Raw(raw),
        }
    }
}

impl<R: fmt::Display> fmt::Display for Canonical<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => f.write_str(name),
            Self::Grease => f.write_str(GREASE_NAME),
            Self::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

impl<R: fmt::Display> Serialize for Canonical<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Cipher suite or named group whose unknown form is the raw hex string.
pub type HexCode = Canonical<String>;

/// Extension type whose unknown form is the numeric code.
pub type ExtensionId = Canonical<u16>;

/// Resolve a cipher suite code. `raw` is kept verbatim when unknown.
pub fn cipher_suite(code: u16, raw: &str) -> HexCode {
    Canonical::resolve(tables::CIPHER_SUITES, code, raw.to_string())
}

/// Resolve an extension type code.
pub fn extension_type(code: u16) -> ExtensionId {
    Canonical::resolve(tables::EXTENSION_TYPES, code, code)
}

/// Resolve a supported-groups (elliptic curve) code.
pub fn named_group(code: u16, raw: &str) -> HexCode {
    Canonical::resolve(tables::NAMED_GROUPS, code, raw.to_string())
}

/// Extension type code of `supported_groups`.
pub const SUPPORTED_GROUPS: u16 = 0x000a;
/// Extension type code of `ec_point_formats`.
pub const EC_POINT_FORMATS: u16 = 0x000b;

/// Parse a hex code as printed by protocol analyzers (`0x1301`, `1301`).
pub fn parse_hex_code(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}
