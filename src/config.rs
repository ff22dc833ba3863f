/*!
 * Probe Configuration
 *
 * `ProbeConfig` is built from the parsed command line (with `PROBE_KEY_DIR`
 * already folded in by clap) or from the builder in tests, then validated
 * before any kernel object is touched.
 */

use crate::cli::Cli;
use crate::core::errors::{ProbeError, ProbeResult};
use crate::core::limits::{
    DEFAULT_CLIENT_MESSAGE, DEFAULT_KEY_DIR, MAX_PAYLOAD_SIZE, MAX_PROBE_TIMEOUT_SECS,
};
use crate::core::types::BackendKind;
use crate::ipc::key::resolve_name;
use crate::ipc::CapacityHints;
use std::path::PathBuf;
use std::time::Duration;

/// Validated settings for one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub backend: BackendKind,
    /// Object name as given, before per-backend normalization
    pub name: String,
    pub timeout: Duration,
    pub message: String,
    pub key_dir: PathBuf,
    pub hints: CapacityHints,
}

impl ProbeConfig {
    pub fn builder(backend: BackendKind) -> ProbeConfigBuilder {
        ProbeConfigBuilder::new(backend)
    }

    /// Apply defaults to the parsed command line and validate
    pub fn from_cli(cli: Cli) -> ProbeResult<Self> {
        let mut builder = Self::builder(cli.backend);
        if let Some(name) = cli.name {
            builder = builder.name(name);
        }
        if let Some(raw) = cli.timeout.as_deref() {
            builder = builder.timeout(parse_timeout(raw)?);
        }
        if let Some(message) = cli.message {
            builder = builder.message(message);
        }
        if let Some(dir) = cli.key_dir {
            builder = builder.key_dir(dir);
        }
        builder.build()
    }

    pub fn validate(&self) -> ProbeResult<()> {
        resolve_name(self.backend, &self.name).map_err(|e| ProbeError::usage(e.to_string()))?;

        if self.timeout.is_zero() || self.timeout.as_secs() > MAX_PROBE_TIMEOUT_SECS {
            return Err(ProbeError::usage(format!(
                "timeout must be between 1 and {} seconds",
                MAX_PROBE_TIMEOUT_SECS
            )));
        }
        if self.message.len() > MAX_PAYLOAD_SIZE {
            return Err(ProbeError::usage(format!(
                "message is {} bytes, at most {} allowed",
                self.message.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        if self.backend.needs_key_file() && !self.key_dir.is_dir() {
            return Err(ProbeError::usage(format!(
                "key directory {} does not exist",
                self.key_dir.display()
            )));
        }
        Ok(())
    }
}

/// Builder for `ProbeConfig` starting from per-backend defaults
#[derive(Debug, Clone)]
pub struct ProbeConfigBuilder {
    config: ProbeConfig,
}

impl ProbeConfigBuilder {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            config: ProbeConfig {
                backend,
                name: backend.default_name().to_string(),
                timeout: backend.default_timeout(),
                message: DEFAULT_CLIENT_MESSAGE.to_string(),
                key_dir: default_key_dir(),
                hints: CapacityHints::default(),
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.config.message = message.into();
        self
    }

    pub fn key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.key_dir = dir.into();
        self
    }

    pub fn hints(mut self, hints: CapacityHints) -> Self {
        self.config.hints = hints;
        self
    }

    pub fn build(self) -> ProbeResult<ProbeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Marker directory when neither `--key-dir` nor `PROBE_KEY_DIR` is given
///
/// Both sides must see the same directory for `ftok` to agree.
pub fn default_key_dir() -> PathBuf {
    PathBuf::from(DEFAULT_KEY_DIR)
}

/// Parse a timeout given in whole seconds
///
/// Anything but a positive integer no larger than `MAX_PROBE_TIMEOUT_SECS` is
/// a usage error.
pub fn parse_timeout(raw: &str) -> ProbeResult<Duration> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ProbeError::usage(format!("invalid timeout '{}': not a number", raw)))?;
    if secs <= 0 {
        return Err(ProbeError::usage(format!(
            "invalid timeout '{}': must be positive",
            raw
        )));
    }
    if secs as u64 > MAX_PROBE_TIMEOUT_SECS {
        return Err(ProbeError::usage(format!(
            "invalid timeout '{}': at most {} seconds",
            raw, MAX_PROBE_TIMEOUT_SECS
        )));
    }
    Ok(Duration::from_secs(secs as u64))
}
