//! TOML configuration for hellodiff.
//!
//! The file is optional; CLI arguments override file settings.

use std::net::{IpAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub adapter: AdapterConfig,
    pub target: TargetConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults when no file is given; a given file must load.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.adapter.tshark.as_os_str().is_empty() {
            anyhow::bail!("adapter.tshark must not be empty");
        }
        if self.target.ip.is_some() && self.target.host.is_some() {
            anyhow::bail!("target.ip and target.host are mutually exclusive");
        }
        if matches!(&self.target.host, Some(h) if h.trim().is_empty()) {
            anyhow::bail!("target.host must not be empty");
        }
        Ok(())
    }

    /// Apply command-line values on top of the file.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(tshark) = overrides.tshark {
            self.adapter.tshark = tshark;
        }
        if overrides.target_ip.is_some() || overrides.target_host.is_some() {
            self.target = TargetConfig {
                ip: overrides.target_ip,
                host: overrides.target_host,
            };
        }
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        self.output.verbose |= overrides.verbose;
    }
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub tshark: Option<PathBuf>,
    pub target_ip: Option<IpAddr>,
    pub target_host: Option<String>,
    pub format: Option<OutputFormat>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// tshark executable, looked up on PATH when not absolute
    pub tshark: PathBuf,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            tshark: PathBuf::from("tshark"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    pub ip: Option<IpAddr>,
    pub host: Option<String>,
}

impl TargetConfig {
    /// The target address, resolving `host` through the system resolver.
    ///
    /// The first IPv4 address wins, else the first address of any family.
    pub fn resolve(&self) -> Result<Option<IpAddr>> {
        if let Some(ip) = self.ip {
            return Ok(Some(ip));
        }
        let Some(host) = &self.host else {
            return Ok(None);
        };

        let addrs: Vec<IpAddr> = (host.as_str(), 0)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve host '{}'", host))?
            .map(|sa| sa.ip())
            .collect();
        let ip = addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .with_context(|| format!("Host '{}' resolved to no addresses", host))?;

        tracing::info!("Resolved {} to {}", host, ip);
        Ok(Some(ip))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Debug logging and raw JA3 strings
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.adapter.tshark, PathBuf::from("tshark"));
        assert!(config.target.ip.is_none());
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[adapter]
tshark = "/opt/wireshark/bin/tshark"

[target]
ip = "93.184.216.34"

[output]
format = "json"
verbose = true
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.adapter.tshark,
            PathBuf::from("/opt/wireshark/bin/tshark")
        );
        assert_eq!(config.target.ip, Some("93.184.216.34".parse().unwrap()));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[output]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.adapter.tshark, PathBuf::from("tshark"));
        assert!(!config.output.verbose);
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        config.target.ip = Some("10.0.0.1".parse().unwrap());
        config.target.host = Some("example.com".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.adapter.tshark = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[target]\nhost = \"localhost\"").unwrap();
        let config = Config::load_optional(Some(file.path())).unwrap();
        assert_eq!(config.target.host.as_deref(), Some("localhost"));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[output]\nformat = \"yaml\"").unwrap();
        assert!(Config::load(bad.path()).is_err());

        assert!(Config::load(Path::new("/nonexistent/hellodiff.toml")).is_err());
        assert!(Config::load_optional(None).is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str(
            "[adapter]\ntshark = \"/usr/bin/tshark\"\n[target]\nhost = \"example.com\"\n",
        )
        .unwrap();

        config.apply(Overrides {
            target_ip: Some("1.2.3.4".parse().unwrap()),
            format: Some(OutputFormat::Json),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(config.adapter.tshark, PathBuf::from("/usr/bin/tshark"));
        assert_eq!(config.target.ip, Some("1.2.3.4".parse().unwrap()));
        assert!(config.target.host.is_none());
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_target() {
        let target = TargetConfig {
            ip: Some("10.1.1.1".parse().unwrap()),
            host: None,
        };
        assert_eq!(target.resolve().unwrap(), Some("10.1.1.1".parse().unwrap()));

        assert_eq!(TargetConfig::default().resolve().unwrap(), None);

        let literal = TargetConfig {
            ip: None,
            host: Some("127.0.0.1".to_string()),
        };
        assert_eq!(literal.resolve().unwrap(), Some("127.0.0.1".parse().unwrap()));
    }
}
