use std::fmt;

use serde::Serialize;

use super::parse_hex_code;

/// Protocol revision advertised in the ClientHello `legacy_version` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TlsVersion {
    #[serde(rename = "SSL 3.0")]
    Ssl30,
    #[serde(rename = "TLS 1.0")]
    Tls10,
    #[serde(rename = "TLS 1.1")]
    Tls11,
    #[serde(rename = "TLS 1.2")]
    Tls12,
    #[serde(rename = "TLS 1.3")]
    Tls13,
}

impl TlsVersion {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0300 => Some(Self::Ssl30),
            0x0301 => Some(Self::Tls10),
            0x0302 => Some(Self::Tls11),
            0x0303 => Some(Self::Tls12),
            0x0304 => Some(Self::Tls13),
            _ => None,
        }
    }

    /// Parse a hex string such as `0x0303`. `None` if the text is not hex
    /// or the code is not a known revision.
    pub fn parse_hex(raw: &str) -> Option<Self> {
        parse_hex_code(raw).and_then(Self::from_code)
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Ssl30 => 0x0300,
            Self::Tls10 => 0x0301,
            Self::Tls11 => 0x0302,
            Self::Tls12 => 0x0303,
            Self::Tls13 => 0x0304,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ssl30 => "SSL 3.0",
            Self::Tls10 => "TLS 1.0",
            Self::Tls11 => "TLS 1.1",
            Self::Tls12 => "TLS 1.2",
            Self::Tls13 => "TLS 1.3",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_versions() {
        assert_eq!(TlsVersion::parse_hex("0x0303"), Some(TlsVersion::Tls12));
        assert_eq!(TlsVersion::parse_hex("0x0304"), Some(TlsVersion::Tls13));
        assert_eq!(TlsVersion::parse_hex("0301"), Some(TlsVersion::Tls10));
    }

    #[test]
    fn reject_unknown_versions() {
        assert_eq!(TlsVersion::parse_hex("0x0305"), None);
        assert_eq!(TlsVersion::parse_hex("0x7f1c"), None);
        assert_eq!(TlsVersion::parse_hex("tls"), None);
    }

    #[test]
    fn code_round_trips_through_table() {
        for v in [
            TlsVersion::Ssl30,
            TlsVersion::Tls10,
            TlsVersion::Tls11,
            TlsVersion::Tls12,
            TlsVersion::Tls13,
        ] {
            assert_eq!(TlsVersion::from_code(v.code()), Some(v));
        }
        assert_eq!(TlsVersion::Tls12.to_string(), "TLS 1.2");
    }
}
