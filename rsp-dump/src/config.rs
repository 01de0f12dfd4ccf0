//! Relay configuration
//!
//! Settings come from a JSON file, with a few command line overrides:
//!
//! ```json
//! {
//!     "listen": "localhost:33000",
//!     "homepage_url": "https://example.com/rsp-dump/",
//!     "host_pattern": "^(?P<issuer>[a-f0-9]{6,40})\\.rsp\\.",
//!     "registry_file": "rsp-registry.json",
//!     "report_dir": "reports",
//!     "upstream_timeout_secs": 30,
//!     "max_body_bytes": 1048576,
//!     "openssl_path": "openssl",
//!     "log_file": "rsp-report.log"
//! }
//! ```
//!
//! Every key is optional.

use clap::Parser;
use regex::Regex;
use rsp_core::{RspError, RspResult};
use rsp_server::listener::DEFAULT_MAX_BODY_BYTES;
use rsp_server::router::DEFAULT_HOST_PATTERN;
use rsp_server::{
    HttpUpstream, IssuerRegistry, IssuerRouter, OpensslRenderer, Relay, ReportWriter, ServerListener,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "rsp-dump", version, about = "SM-DP+ relay that dumps eUICC information")]
pub struct Args {
    /// Configuration file path
    #[arg(long, value_name = "FILE", default_value = "rsp-config.json")]
    pub config_file: PathBuf,

    /// Address to listen on, overrides `listen`
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Issuer registry path, overrides `registry_file`
    #[arg(long, value_name = "FILE")]
    pub registry_file: Option<PathBuf>,
}

impl Args {
    /// Load the configuration file and apply the overrides
    pub fn load_config(&self) -> RspResult<Config> {
        let mut config = Config::load(&self.config_file)?;
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(registry_file) = &self.registry_file {
            config.registry_file = registry_file.clone();
        }
        Ok(config)
    }
}

/// Relay settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to listen on
    pub listen: String,
    /// Where requests outside the RSP endpoints are redirected
    pub homepage_url: Option<String>,
    /// SM-DP+ address pattern with an `issuer` group; empty disables it
    pub host_pattern: String,
    /// Issuer registry JSON file
    pub registry_file: PathBuf,
    /// Directory reports are written to
    pub report_dir: PathBuf,
    /// Timeout of one upstream request
    pub upstream_timeout_secs: u64,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// `openssl` binary used to render certificates
    pub openssl_path: PathBuf,
    /// File log lines are appended to besides stdout; empty disables it
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "localhost:33000".to_string(),
            homepage_url: None,
            host_pattern: DEFAULT_HOST_PATTERN.to_string(),
            registry_file: PathBuf::from("rsp-registry.json"),
            report_dir: PathBuf::from("reports"),
            upstream_timeout_secs: 30,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            openssl_path: PathBuf::from("openssl"),
            log_file: PathBuf::from("rsp-report.log"),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> RspResult<Self> {
        serde_json::from_str(json).map_err(|e| RspError::Config(format!("invalid configuration: {}", e)))
    }

    /// Load a configuration file
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns `Config` if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> RspResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("{} not found, using default configuration", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(RspError::Config(format!("cannot read {}: {}", path.display(), e))),
        }
    }

    /// Log file path, `None` when disabled
    pub fn log_file(&self) -> Option<&Path> {
        (!self.log_file.as_os_str().is_empty()).then_some(self.log_file.as_path())
    }

    /// Compiled host pattern, `None` when disabled
    pub fn host_pattern(&self) -> RspResult<Option<Regex>> {
        if self.host_pattern.is_empty() {
            return Ok(None);
        }
        Regex::new(&self.host_pattern)
            .map(Some)
            .map_err(|e| RspError::Config(format!("invalid host_pattern: {}", e)))
    }

    /// Build the relay with its registry, upstream client and report writer
    pub fn build_relay(&self) -> RspResult<Relay> {
        let registry = Arc::new(IssuerRegistry::load(&self.registry_file)?);
        let mut router = IssuerRouter::new(registry);
        if let Some(pattern) = self.host_pattern()? {
            router = router.with_host_pattern(pattern)?;
        }
        let upstream = HttpUpstream::new(Duration::from_secs(self.upstream_timeout_secs))?;
        let writer = ReportWriter::new(
            &self.report_dir,
            Arc::new(OpensslRenderer::new(&self.openssl_path)),
        );
        let relay = Relay::new(router, Arc::new(upstream), Arc::new(writer));
        Ok(match &self.homepage_url {
            Some(url) => relay.with_homepage(url.clone()),
            None => relay,
        })
    }

    /// Build the listener serving `relay`
    pub fn build_listener(&self, relay: Relay) -> ServerListener {
        ServerListener::new(relay, self.listen.clone()).with_max_body_bytes(self.max_body_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listen, "localhost:33000");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        let pattern = config.host_pattern().unwrap().unwrap();
        assert_eq!(&pattern.captures("f54172.rsp.example.com").unwrap()["issuer"], "f54172");
        assert_eq!(config.log_file(), Some(Path::new("rsp-report.log")));
    }

    #[test]
    fn test_log_file() {
        let config = Config::from_json(r#"{"log_file": "/var/log/rsp-dump.log"}"#).unwrap();
        assert_eq!(config.log_file(), Some(Path::new("/var/log/rsp-dump.log")));
        let config = Config::from_json(r#"{"log_file": ""}"#).unwrap();
        assert_eq!(config.log_file(), None);
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(
            r#"{"listen": "0.0.0.0:443", "homepage_url": "https://example.com/", "host_pattern": "", "upstream_timeout_secs": 5}"#,
        )
        .unwrap();
        assert_eq!(config.listen, "0.0.0.0:443");
        assert_eq!(config.homepage_url.as_deref(), Some("https://example.com/"));
        assert!(config.host_pattern().unwrap().is_none());
        assert_eq!(config.upstream_timeout_secs, 5);
        assert_eq!(config.report_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::from_json(r#"{"listen": 33000}"#), Err(RspError::Config(_))));
        let config = Config {
            host_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.host_pattern(), Err(RspError::Config(_))));
    }

    #[test]
    fn test_args_override() {
        let args = Args::parse_from([
            "rsp-dump",
            "--config-file",
            "/nonexistent/rsp-config.json",
            "--listen",
            "127.0.0.1:8443",
            "--registry-file",
            "issuers.json",
        ]);
        let config = args.load_config().unwrap();
        assert_eq!(config.listen, "127.0.0.1:8443");
        assert_eq!(config.registry_file, PathBuf::from("issuers.json"));
    }

    #[test]
    fn test_build_relay_needs_registry() {
        let config = Config {
            registry_file: PathBuf::from("/nonexistent/rsp-registry.json"),
            ..Default::default()
        };
        assert!(matches!(config.build_relay(), Err(RspError::Config(_))));
    }
}
