use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures while turning a capture file into a decode tree or digest list.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{}: not a pcap or pcapng capture ({reason})", .path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },
    #[error("{}: path is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("failed to launch decoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("decoder exited with {status}: {stderr}")]
    AdapterFailed { status: ExitStatus, stderr: String },
    #[error("decoder failed while streaming packets: {0}")]
    Decoder(#[source] std::io::Error),
    #[error("decoder produced malformed output: {0}")]
    MalformedOutput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while locating or canonicalizing a ClientHello.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("no TLS handshake sent to {0} in capture")]
    HandshakeNotFound(IpAddr),
    #[error("handshake cannot be fingerprinted: missing {missing} extension")]
    IncompatibleHandshake { missing: &'static str },
    #[error("unsupported TLS version {0}")]
    UnsupportedVersion(String),
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// A capture in an N-way comparison failed; the comparison is abandoned.
#[derive(Debug, Error)]
#[error("capture '{label}' ({}) failed: {source}", .path.display())]
pub struct CompareError {
    pub label: String,
    pub path: PathBuf,
    #[source]
    pub source: FingerprintError,
}
