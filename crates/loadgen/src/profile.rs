//! Endpoint profiles: one configured destination plus its delivery policy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::error::ConfigError;
use crate::source;

/// Section holding run-wide settings such as `RUN_TESTCASE`.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Suffix of the companion section carrying an endpoint's delivery policy.
pub const LOADER_SUFFIX: &str = "_LOADER";

pub const DEFAULT_PORT: u16 = 22;

/// Unit applied to an endpoint's throttle interval.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum DelayUnit {
    #[default]
    #[strum(to_string = "Seconds")]
    Seconds,
    #[strum(to_string = "MilliSeconds")]
    Milliseconds,
    #[strum(to_string = "MicroSeconds")]
    Microseconds,
    #[strum(to_string = "NanoSeconds")]
    Nanoseconds,
}

/// Mandatory wait after each attempt against an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub interval: u64,
    pub unit: DelayUnit,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            interval: 1,
            unit: DelayUnit::Seconds,
        }
    }
}

impl Throttle {
    pub fn new(interval: u64, unit: DelayUnit) -> Self {
        Self { interval, unit }
    }

    /// The interval converted to its unit.
    pub fn duration(&self) -> Duration {
        match self.unit {
            DelayUnit::Seconds => Duration::from_secs(self.interval),
            DelayUnit::Milliseconds => Duration::from_millis(self.interval),
            DelayUnit::Microseconds => Duration::from_micros(self.interval),
            DelayUnit::Nanoseconds => Duration::from_nanos(self.interval),
        }
    }
}

/// The active authentication method of an endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    /// PEM-encoded private key material, never empty.
    PrivateKey {
        key: String,
        passphrase: Option<String>,
    },
}

impl Credential {
    pub fn uses_key(&self) -> bool {
        matches!(self, Self::PrivateKey { .. })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::PrivateKey { .. } => f.write_str("PrivateKey(<redacted>)"),
        }
    }
}

/// How the remote host identity is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTrust {
    /// Accept whatever host key the server presents. Only suitable for
    /// controlled dry runs.
    AcceptAny,
    /// Require the server key to match an entry in an OpenSSH known_hosts file.
    KnownHosts(PathBuf),
}

impl HostTrust {
    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::AcceptAny)
    }
}

/// Naming convention for generated remote filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    pub prefix: String,
    pub suffix: String,
    pub extension: String,
    /// Naming stem placed between the prefix and the timestamp.
    pub stem: String,
    /// Remote destination directory.
    pub path: String,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            extension: String::new(),
            stem: String::new(),
            path: ".".to_string(),
        }
    }
}

/// One configured destination plus its delivery policy.
///
/// Profiles are immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointProfile {
    /// Section name the endpoint was loaded from.
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
    pub host_trust: HostTrust,
    pub naming: NamingPolicy,
    pub throttle: Throttle,
    /// Candidate local files. `None` means the fixed placeholder payload is sent.
    sources: Option<Vec<PathBuf>>,
}

impl EndpointProfile {
    /// Host keys are checked against `~/.ssh/known_hosts` until overridden
    /// with [`EndpointProfile::with_host_trust`].
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            username: username.into(),
            credential,
            host_trust: HostTrust::KnownHosts(default_known_hosts()),
            naming: NamingPolicy::default(),
            throttle: Throttle::default(),
            sources: None,
        }
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_host_trust(mut self, host_trust: HostTrust) -> Self {
        self.host_trust = host_trust;
        self
    }

    /// Set the candidate source files. An empty list is the same as none.
    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = if sources.is_empty() {
            None
        } else {
            Some(sources)
        };
        self
    }

    pub fn sources(&self) -> Option<&[PathBuf]> {
        self.sources.as_deref()
    }

    /// `host:port`, used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Options that influence profile loading beyond the configuration store.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Comma-separated endpoint section names overriding `RUN_TESTCASE`.
    pub testcases: Option<String>,
    /// Accept any host key for every endpoint.
    pub insecure_host_trust: bool,
}

/// Build the ordered, immutable list of endpoint profiles.
///
/// Identity errors are fatal. Endpoints with an invalid throttle are skipped.
pub fn load_profiles(
    store: &impl ConfigStore,
    options: &LoadOptions,
) -> Result<Vec<EndpointProfile>, ConfigError> {
    let testcases = options
        .testcases
        .clone()
        .filter(|tc| !tc.trim().is_empty())
        .or_else(|| store.get_field(DEFAULT_SECTION, "RUN_TESTCASE"))
        .unwrap_or_default();

    let mut profiles = Vec::new();
    for name in testcases.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        info!(testcase = %name, "Reading test case");
        if let Some(profile) = load_profile(store, name, options)? {
            profiles.push(profile);
        }
    }
    Ok(profiles)
}

fn load_profile(
    store: &impl ConfigStore,
    name: &str,
    options: &LoadOptions,
) -> Result<Option<EndpointProfile>, ConfigError> {
    if !store.has_section(name) {
        return Err(ConfigError::MissingSection {
            section: name.to_string(),
        });
    }

    let host = required(store, name, "HOST")?;
    let username = required(store, name, "USERNAME")?;
    let port = match store.get_field(name, "PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::invalid_field(name, "PORT", &raw, e.to_string()))?,
        None => DEFAULT_PORT,
    };

    let loader = format!("{name}{LOADER_SUFFIX}");
    let Some(throttle) = read_throttle(store, name, &loader) else {
        return Ok(None);
    };

    let credential = read_credential(store, name);
    let host_trust = read_host_trust(store, name, options)?;
    if host_trust.is_insecure() {
        warn!(
            testcase = %name,
            "Host key verification disabled; any server identity will be accepted"
        );
    }

    let field = |key: &str| store.get_field(&loader, key).unwrap_or_default();
    let naming = NamingPolicy {
        prefix: field("FILE_PREFIX"),
        suffix: field("FILE_SUFFIX"),
        extension: field("FILE_EXTENSION"),
        stem: field("FILE_NAME"),
        path: store
            .get_field(&loader, "PATH")
            .unwrap_or_else(|| ".".to_string()),
    };

    let sources = match store.get_field(&loader, "DATADIR") {
        Some(dir) => match source::list_source_files(Path::new(&dir)) {
            Ok(files) => files,
            Err(e) => {
                warn!(testcase = %name, datadir = %dir, error = %e, "Error occurred while retrieving files list");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok(Some(
        EndpointProfile::new(name, host, port, username, credential)
            .with_host_trust(host_trust)
            .with_naming(naming)
            .with_throttle(throttle)
            .with_sources(sources),
    ))
}

fn required(store: &impl ConfigStore, section: &str, key: &str) -> Result<String, ConfigError> {
    store
        .get_field(section, key)
        .ok_or_else(|| ConfigError::missing_field(section, key))
}

/// Read `DELAY`/`DELAY_UNITS`. `None` means the endpoint must be skipped.
fn read_throttle(store: &impl ConfigStore, name: &str, loader: &str) -> Option<Throttle> {
    let interval = match store.get_field(loader, "DELAY") {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(interval) => interval,
            Err(_) => {
                warn!(testcase = %name, value = %raw, "Invalid value for DELAY, skipping test case");
                return None;
            }
        },
        None => 1,
    };

    let unit = match store.get_field(loader, "DELAY_UNITS") {
        Some(raw) => match DelayUnit::from_str(raw.trim()) {
            Ok(unit) => unit,
            Err(_) => {
                warn!(testcase = %name, value = %raw, "Unknown DELAY_UNITS, skipping test case");
                return None;
            }
        },
        None => DelayUnit::Seconds,
    };

    Some(Throttle::new(interval, unit))
}

/// Prefer key auth when the key file is readable, otherwise fall back to the password.
fn read_credential(store: &impl ConfigStore, name: &str) -> Credential {
    if let Some(key_path) = store.get_field(name, "PRIVATEKEY") {
        match std::fs::read_to_string(&key_path) {
            Ok(key) if !key.trim().is_empty() => {
                return Credential::PrivateKey {
                    key,
                    passphrase: store.get_field(name, "PRIVATEKEY_PASSPHRASE"),
                };
            }
            Ok(_) => {
                warn!(testcase = %name, path = %key_path, "Private key file is empty, using password authentication");
            }
            Err(e) => {
                warn!(testcase = %name, path = %key_path, error = %e, "Unable to read private key, using password authentication");
            }
        }
    }
    Credential::Password(store.get_field(name, "PASSWORD").unwrap_or_default())
}

fn read_host_trust(
    store: &impl ConfigStore,
    name: &str,
    options: &LoadOptions,
) -> Result<HostTrust, ConfigError> {
    let mut insecure = options.insecure_host_trust;
    for section in [DEFAULT_SECTION, name] {
        if let Some(raw) = store.get_field(section, "INSECURE_HOST_TRUST") {
            insecure |= parse_bool(&raw).ok_or_else(|| {
                ConfigError::invalid_field(section, "INSECURE_HOST_TRUST", &raw, "expected a boolean")
            })?;
        }
    }
    if insecure {
        return Ok(HostTrust::AcceptAny);
    }

    let path = store
        .get_field(name, "KNOWN_HOSTS")
        .map(PathBuf::from)
        .unwrap_or_else(default_known_hosts);
    Ok(HostTrust::KnownHosts(path))
}

fn default_known_hosts() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("known_hosts"))
        .unwrap_or_else(|| PathBuf::from("known_hosts"))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
