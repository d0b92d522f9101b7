use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

/// Directory holding the capture files of one comparison run.
///
/// The scratch variant owns a temporary directory that is removed when the
/// value is dropped, whichever way the run ends. The persistent variant
/// leaves its files in place for later inspection.
#[derive(Debug)]
pub enum CaptureDir {
    Scratch(TempDir),
    Persistent(PathBuf),
}

impl CaptureDir {
    pub fn scratch() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("hellodiff-").tempdir()?;
        debug!("scratch capture dir: {}", dir.path().display());
        Ok(Self::Scratch(dir))
    }

    /// Use `dir` (created if missing) and keep its contents.
    pub fn persistent(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self::Persistent(dir.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Scratch(dir) => dir.path(),
            Self::Persistent(dir) => dir,
        }
    }

    /// Capture file path for a label, e.g. `no-proxy` -> `<dir>/no-proxy.pcap`.
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.path().join(format!("{}.pcap", file_stem(label)))
    }

    /// Copy a capture stream into the directory under `label`.
    pub fn spool<R: Read>(&self, label: &str, reader: &mut R) -> io::Result<PathBuf> {
        let path = self.path_for(label);
        let mut file = File::create(&path)?;
        let written = io::copy(reader, &mut file)?;
        debug!("spooled {} bytes to {}", written, path.display());
        Ok(path)
    }
}

fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "capture".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_removed_on_drop() {
        let dir = CaptureDir::scratch().unwrap();
        let path = dir.spool("baseline", &mut &b"\x0a\x0d\x0d\x0a"[..]).unwrap();
        let root = dir.path().to_path_buf();
        assert!(path.exists());
        drop(dir);
        assert!(!root.exists());
    }

    #[test]
    fn scratch_dir_removed_on_error_path() {
        fn failing_run(dir: &CaptureDir) -> io::Result<()> {
            dir.spool("proxy", &mut &b"data"[..])?;
            Err(io::Error::new(io::ErrorKind::Other, "extraction failed"))
        }

        let dir = CaptureDir::scratch().unwrap();
        let root = dir.path().to_path_buf();
        let result = failing_run(&dir);
        drop(dir);
        assert!(result.is_err());
        assert!(!root.exists());
    }

    #[test]
    fn persistent_dir_is_kept() {
        let parent = tempfile::tempdir().unwrap();
        let target = parent.path().join("captures");
        let dir = CaptureDir::persistent(&target).unwrap();
        let path = dir.spool("goproxy mimic", &mut &b"data"[..]).unwrap();
        drop(dir);
        assert!(path.exists());
        assert_eq!(path, target.join("goproxy_mimic.pcap"));
    }

    #[test]
    fn labels_become_safe_file_names() {
        assert_eq!(file_stem("no-proxy"), "no-proxy");
        assert_eq!(file_stem("../etc/passwd"), "_etc_passwd");
        assert_eq!(file_stem(""), "capture");
        assert_eq!(file_stem(".."), "capture");
    }
}
