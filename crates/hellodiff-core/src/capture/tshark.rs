use std::ffi::OsStr;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rtshark::{Metadata, Packet, RTSharkBuilder};
use tracing::{debug, info};

use super::{sniff_format, DecodeAdapter, DecodedCapture};
use crate::digest::DigestRecord;
use crate::error::CaptureError;

/// Decode adapter backed by Wireshark's `tshark`.
///
/// JA3 fields require tshark 3.7 or later; earlier releases did not ignore
/// GREASE values when computing them.
#[derive(Debug, Clone)]
pub struct TsharkAdapter {
    binary: PathBuf,
}

impl Default for TsharkAdapter {
    fn default() -> Self {
        Self::new("tshark")
    }
}

impl TsharkAdapter {
    const CLIENT_HELLO_FILTER: &'static str = "tls.handshake.type == 1";
    const IP_DST: &'static str = "ip.dst";
    const IPV6_DST: &'static str = "ipv6.dst";
    const JA3_STR: &'static str = "tls.handshake.ja3_full";
    const JA3_HASH: &'static str = "tls.handshake.ja3";

    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, args: &[&OsStr]) -> Result<Vec<u8>, CaptureError> {
        debug!("{} {:?}", self.binary.display(), args);
        let Output {
            status,
            stdout,
            stderr,
        } = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| self.spawn_error(source))?;

        if !status.success() {
            return Err(CaptureError::AdapterFailed {
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        Ok(stdout)
    }

    /// rtshark always launches `tshark` and only lets the caller replace
    /// the `PATH` it is searched on.
    fn search_dir(&self) -> Result<Option<&str>, CaptureError> {
        if self.binary.file_stem() != Some(OsStr::new("tshark")) {
            return Err(self.spawn_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "digest streaming needs an executable named tshark",
            )));
        }
        match self.binary.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir
                .to_str()
                .map(Some)
                .ok_or_else(|| CaptureError::NonUtf8Path(dir.to_path_buf())),
            _ => Ok(None),
        }
    }

    fn spawn_error(&self, source: io::Error) -> CaptureError {
        CaptureError::Spawn {
            program: self.binary.display().to_string(),
            source,
        }
    }
}

impl DecodeAdapter for TsharkAdapter {
    fn decode(&self, path: &Path) -> Result<DecodedCapture, CaptureError> {
        let format = sniff_format(path)?;
        // Without --no-duplicate-keys the JSON writer folds repeated keys and
        // every cipher suite but the last is lost.
        let stdout = self.run(&[
            OsStr::new("-r"),
            path.as_os_str(),
            OsStr::new("-T"),
            OsStr::new("json"),
            OsStr::new("--no-duplicate-keys"),
        ])?;
        let capture = DecodedCapture::from_json(&stdout)?;
        info!(
            "Decoded {} packets from {} ({:?})",
            capture.len(),
            path.display(),
            format
        );
        Ok(capture)
    }

    fn digests(&self, path: &Path) -> Result<Vec<DigestRecord>, CaptureError> {
        sniff_format(path)?;
        let file = path
            .to_str()
            .ok_or_else(|| CaptureError::NonUtf8Path(path.to_path_buf()))?;
        let search_dir = self.search_dir()?;

        let mut builder = RTSharkBuilder::builder().input_path(file);
        if let Some(dir) = search_dir {
            builder = builder.env_path(dir);
        }
        let mut tshark = builder
            .display_filter(Self::CLIENT_HELLO_FILTER)
            .metadata_whitelist(Self::IP_DST)
            .metadata_whitelist(Self::IPV6_DST)
            .metadata_whitelist(Self::JA3_STR)
            .metadata_whitelist(Self::JA3_HASH)
            .spawn()
            .map_err(|source| self.spawn_error(source))?;

        let mut records = Vec::new();
        loop {
            match tshark.read() {
                Ok(Some(packet)) => match digest_record(&packet) {
                    Some(record) => records.push(record),
                    None => debug!("ClientHello without address or JA3 digest skipped"),
                },
                Ok(None) => break,
                Err(e) => return Err(CaptureError::Decoder(e)),
            }
        }

        info!("Read {} JA3 digests from {}", records.len(), path.display());
        Ok(records)
    }
}

fn get_metadata<'a>(packet: &'a Packet, key: &str) -> Option<&'a str> {
    let (layer_name, _) = key.split_once('.')?;
    packet
        .layer_name(layer_name)
        .and_then(|layer| layer.metadata(key))
        .map(Metadata::value)
}

fn digest_record(packet: &Packet) -> Option<DigestRecord> {
    digest_from_fields(
        get_metadata(packet, TsharkAdapter::IP_DST),
        get_metadata(packet, TsharkAdapter::IPV6_DST),
        get_metadata(packet, TsharkAdapter::JA3_STR),
        get_metadata(packet, TsharkAdapter::JA3_HASH),
    )
}

/// Build a record from the decoder's fields; the first parsable address
/// wins and a digest is required.
pub fn digest_from_fields(
    ip_dst: Option<&str>,
    ipv6_dst: Option<&str>,
    raw: Option<&str>,
    digest: Option<&str>,
) -> Option<DigestRecord> {
    let ip = [ip_dst, ipv6_dst]
        .into_iter()
        .flatten()
        .find_map(|s| s.trim().parse::<IpAddr>().ok())?;
    let digest = digest.map(str::trim).filter(|d| !d.is_empty())?;

    Some(DigestRecord {
        ip,
        raw: raw.map(str::trim).unwrap_or_default().to_string(),
        digest: digest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PCAPNG_SECTION_HEADER, PCAP_HEADER};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn capture_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn digest_fields_prefer_ipv4_then_ipv6() {
        let v4 = digest_from_fields(
            Some("93.184.216.34"),
            None,
            Some("771,4865-4866,0-10-11,29-23,0"),
            Some("abc123"),
        )
        .unwrap();
        assert_eq!(v4.ip, "93.184.216.34".parse::<IpAddr>().unwrap());
        assert_eq!(v4.raw, "771,4865-4866,0-10-11,29-23,0");
        assert_eq!(v4.digest, "abc123");

        let v6 = digest_from_fields(None, Some("2001:db8::1"), Some("771,4865,0,29,0"), Some("def"))
            .unwrap();
        assert_eq!(v6.ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn digest_fields_require_address_and_digest() {
        assert!(digest_from_fields(Some("10.0.0.1"), None, Some("771,,,,"), Some(" ")).is_none());
        assert!(digest_from_fields(Some("10.0.0.1"), None, Some("771,,,,"), None).is_none());
        assert!(digest_from_fields(None, None, Some("771,,,,"), Some("abc")).is_none());
        assert!(digest_from_fields(Some("not-an-ip"), None, None, Some("abc")).is_none());
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let file = capture_with(&PCAPNG_SECTION_HEADER);

        let adapter = TsharkAdapter::new("/nonexistent/hellodiff-tshark");
        let err = adapter.decode(file.path()).unwrap_err();
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_adapter_failure() {
        let file = capture_with(&PCAP_HEADER);

        let adapter = TsharkAdapter::new("false");
        let err = adapter.decode(file.path()).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::AdapterFailed { status, .. } if !status.success()
        ));
    }

    #[test]
    fn digests_need_a_binary_named_tshark() {
        let file = capture_with(&PCAPNG_SECTION_HEADER);

        let adapter = TsharkAdapter::new("/opt/wireshark/bin/tshark-4.2");
        assert!(matches!(
            adapter.digests(file.path()),
            Err(CaptureError::Spawn { source, .. }) if source.kind() == io::ErrorKind::InvalidInput
        ));

        assert_eq!(TsharkAdapter::default().search_dir().unwrap(), None);
        assert_eq!(
            TsharkAdapter::new("/opt/wireshark/bin/tshark").search_dir().unwrap(),
            Some("/opt/wireshark/bin")
        );
    }

    #[test]
    fn bad_format_rejected_before_spawn() {
        let file = capture_with(b"not a capture");

        let adapter = TsharkAdapter::new("/nonexistent/hellodiff-tshark");
        assert!(matches!(
            adapter.digests(file.path()),
            Err(CaptureError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            adapter.decode(file.path()),
            Err(CaptureError::UnsupportedFormat { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_reaches_decoder_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"capture-\xff.pcap"));
        std::fs::write(&path, PCAP_HEADER).unwrap();

        // `true` accepts any argument; an empty stdout is not a JSON array.
        let adapter = TsharkAdapter::new("true");
        assert!(matches!(
            adapter.decode(&path),
            Err(CaptureError::MalformedOutput(_))
        ));
        assert!(matches!(
            adapter.digests(&path),
            Err(CaptureError::NonUtf8Path(p)) if p == path
        ));
    }
}
