use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::canon::grease::count_grease;
use crate::canon::{
    self, cipher_suite, extension_type, named_group, parse_hex_code, TlsVersion,
};
use crate::capture::{objects, strings, DecodeAdapter, Object};
use crate::error::FingerprintError;
use crate::fingerprint::clienthello::{get_hello_client, hello_clients};
use crate::fingerprint::types::{ExtensionMap, HelloClientRecord, Ja3RawPayload};

const EXTENSION_TYPE: &str = "tls.handshake.extension.type";

/// Map every extension in the handshake to its decoded payload.
///
/// Any handshake entry carrying an extension type discriminator is an
/// extension. Codes missing from the registry are kept as raw integers.
/// When a type appears twice (GREASE, usually) the first payload is kept.
pub fn extract_extensions(record: &HelloClientRecord) -> ExtensionMap {
    let mut extensions = ExtensionMap::new();
    for value in record.handshake.values() {
        for entry in objects(value) {
            let Some(raw) = entry.get(EXTENSION_TYPE) else {
                continue;
            };
            let code = match raw {
                Value::String(s) => s.trim().parse::<u16>().ok(),
                Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
                _ => None,
            };
            let Some(code) = code else {
                debug!("skipping extension with type {}", raw);
                continue;
            };
            extensions
                .entry(extension_type(code))
                .or_insert_with(|| Value::Object(entry.clone()));
        }
    }
    extensions
}

/// Build the canonical fingerprint payload of a located ClientHello.
///
/// GREASE ciphers and groups are left out of their sets, so injected
/// reserved values never change the fingerprint.
///
/// Fails without a partial result when the version is not a known TLS
/// revision, when a required field is missing, or when the supported groups
/// or EC point formats extension is absent.
pub fn build_ja3_payload(record: &HelloClientRecord) -> Result<Ja3RawPayload, FingerprintError> {
    let handshake = &record.handshake;

    let raw_version = handshake
        .get("tls.handshake.version")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing tls.handshake.version"))?;
    let version_code = parse_hex_code(raw_version)
        .ok_or_else(|| malformed(format!("version is not hex: {}", raw_version)))?;
    let tls_version = TlsVersion::from_code(version_code)
        .ok_or_else(|| FingerprintError::UnsupportedVersion(raw_version.to_string()))?;

    let raw_ciphers = nested_strings(
        handshake,
        "tls.handshake.ciphersuites",
        "tls.handshake.ciphersuite",
    )
    .ok_or_else(|| malformed("missing cipher suite list"))?;
    let cipher_codes = parse_codes(&raw_ciphers, "cipher suite")?;
    let ciphers: BTreeSet<_> = raw_ciphers
        .iter()
        .zip(&cipher_codes)
        .map(|(raw, code)| cipher_suite(*code, raw))
        .filter(|cipher| !cipher.is_grease())
        .collect();

    let extension_map = extract_extensions(record);
    let extensions: BTreeSet<_> = extension_map.keys().cloned().collect();

    let groups = extension_map
        .get(&extension_type(canon::SUPPORTED_GROUPS))
        .and_then(Value::as_object)
        .ok_or(FingerprintError::IncompatibleHandshake {
            missing: "supported_groups",
        })?;
    let point_formats = extension_map
        .get(&extension_type(canon::EC_POINT_FORMATS))
        .and_then(Value::as_object)
        .ok_or(FingerprintError::IncompatibleHandshake {
            missing: "ec_point_formats",
        })?;

    let raw_curves = nested_strings(
        groups,
        "tls.handshake.extensions_supported_groups",
        "tls.handshake.extensions_supported_group",
    )
    .ok_or_else(|| malformed("supported_groups extension has no group list"))?;
    let curve_codes = parse_codes(&raw_curves, "supported group")?;
    let elliptic_curves: BTreeSet<_> = raw_curves
        .iter()
        .zip(&curve_codes)
        .map(|(raw, code)| named_group(*code, raw))
        .filter(|group| !group.is_grease())
        .collect();

    let elliptic_curve_formats: BTreeSet<String> = nested_strings(
        point_formats,
        "tls.handshake.extensions_ec_point_formats",
        "tls.handshake.extensions_ec_point_format",
    )
    .ok_or_else(|| malformed("ec_point_formats extension has no format list"))?
    .into_iter()
    .map(str::to_string)
    .collect();

    debug!(
        "{}: {} ciphers ({} GREASE), {} extensions, {} groups ({} GREASE)",
        tls_version,
        cipher_codes.len(),
        count_grease(&cipher_codes),
        extensions.len(),
        curve_codes.len(),
        count_grease(&curve_codes),
    );

    Ok(Ja3RawPayload {
        tls_version,
        ciphers,
        extensions,
        elliptic_curves,
        elliptic_curve_formats,
    })
}

/// Decode a capture and fingerprint the first ClientHello sent to `target`.
pub fn extract_payload<A>(
    adapter: &A,
    path: &Path,
    target: IpAddr,
) -> Result<Ja3RawPayload, FingerprintError>
where
    A: DecodeAdapter + ?Sized,
{
    let capture = adapter.decode(path)?;
    let record = get_hello_client(&capture, target)?;

    let hellos = hello_clients(&capture, target)
        .filter(HelloClientRecord::is_client_hello)
        .count();
    if hellos > 1 {
        warn!(
            "{}: {} ClientHellos to {}; only the first is fingerprinted",
            path.display(),
            hellos,
            target
        );
    }

    build_ja3_payload(&record)
}

/// Strings under `outer.inner`, where `outer` may repeat.
fn nested_strings<'a>(obj: &'a Object, outer: &str, inner: &str) -> Option<Vec<&'a str>> {
    let outer = obj.get(outer)?;
    let mut found = false;
    let mut values = Vec::new();
    for entry in objects(outer) {
        if let Some(list) = entry.get(inner) {
            found = true;
            values.extend(strings(list));
        }
    }
    found.then_some(values)
}

fn parse_codes(raw: &[&str], what: &str) -> Result<Vec<u16>, FingerprintError> {
    raw.iter()
        .map(|s| parse_hex_code(s).ok_or_else(|| malformed(format!("{} is not hex: {}", what, s))))
        .collect()
}

fn malformed(msg: impl Into<String>) -> FingerprintError {
    FingerprintError::MalformedHandshake(msg.into())
}
