//! Capture arguments given as `[LABEL=]PATH`.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use hellodiff_core::CaptureDir;

/// Path argument meaning "read the capture from stdin".
pub const STDIN: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArg {
    pub label: String,
    pub path: PathBuf,
}

impl CaptureArg {
    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == STDIN
    }
}

/// clap value parser for `--file`.
///
/// Text before the first `=` is a label only when it holds no path
/// separator and the whole argument is not an existing file.
pub fn parse_capture_arg(s: &str) -> Result<CaptureArg, String> {
    let (label, path) = split_label(s, |p| p.is_file());
    if label.is_empty() {
        return Err(format!("empty label in '{}'", s));
    }
    if path.is_empty() {
        return Err(format!("empty path in '{}'", s));
    }
    Ok(CaptureArg {
        label,
        path: PathBuf::from(path),
    })
}

fn split_label<'a>(s: &'a str, is_file: impl Fn(&Path) -> bool) -> (String, &'a str) {
    let labelled = s
        .split_once('=')
        .filter(|(label, _)| !label.contains(['/', '\\']))
        .filter(|_| !is_file(Path::new(s)));
    match labelled {
        Some((label, path)) => (label.trim().to_string(), path),
        None => (default_label(Path::new(s)), s),
    }
}

fn default_label(path: &Path) -> String {
    if path.as_os_str() == STDIN {
        return "stdin".to_string();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Labels must be unique and at most one capture may come from stdin.
pub fn validate(args: &[CaptureArg]) -> Result<()> {
    let mut seen = HashSet::new();
    for arg in args {
        if !seen.insert(arg.label.as_str()) {
            anyhow::bail!("Duplicate capture label '{}'", arg.label);
        }
    }
    if args.iter().filter(|a| a.is_stdin()).count() > 1 {
        anyhow::bail!("Only one capture can be read from stdin");
    }
    Ok(())
}

/// Resolve arguments to on-disk paths, spooling stdin into `dir`.
///
/// `dir` is only created when a stdin capture is present.
pub fn materialize<R, F>(
    args: &[CaptureArg],
    stdin: &mut R,
    dir: F,
) -> Result<(Vec<(String, PathBuf)>, Option<CaptureDir>)>
where
    R: Read,
    F: FnOnce() -> std::io::Result<CaptureDir>,
{
    validate(args)?;

    let mut spool_dir = None;
    let mut dir = Some(dir);
    let mut resolved = Vec::with_capacity(args.len());
    for arg in args {
        let path = if arg.is_stdin() {
            let make = dir.take().context("stdin capture already spooled")?;
            let captures = make().context("Failed to create capture directory")?;
            let path = captures
                .spool(&arg.label, stdin)
                .with_context(|| format!("Failed to spool stdin capture '{}'", arg.label))?;
            tracing::info!("Spooled stdin capture to {}", path.display());
            spool_dir = Some(captures);
            path
        } else {
            arg.path.clone()
        };
        resolved.push((arg.label.clone(), path));
    }
    Ok((resolved, spool_dir))
}
