//! Configuration-driven SFTP delivery engine for load and dry-run testing.
//!
//! Profiles are loaded once from a [`ConfigStore`], then a
//! [`DeliveryScheduler`] sweeps them round-robin, writing one synthesized file
//! per attempt through a [`Transport`] and throttling after each attempt.

pub mod config;
pub mod error;
pub mod naming;
pub mod profile;
pub mod scheduler;
pub mod source;
pub mod transport;

pub use config::{ConfigStore, IniStore, ProfileStore, TomlStore};
pub use error::{ConfigError, DeliveryError, TransportError};
pub use profile::{
    Credential, DelayUnit, EndpointProfile, HostTrust, LoadOptions, NamingPolicy, Throttle,
    load_profiles,
};
pub use scheduler::{DeliveryCounters, DeliveryReport, DeliveryScheduler, EndpointTally, RunTarget};
pub use transport::{
    ConnectTarget, DeliveryOutcome, PLACEHOLDER_PAYLOAD, RemoteFile, Session, SshTransport,
    Transport, deliver,
};
