use std::path::PathBuf;

/// Fatal errors raised while building endpoint profiles from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {reason}")]
    Parse { reason: String },

    #[error("section `{section}` is not defined")]
    MissingSection { section: String },

    #[error("required field `{key}` is missing from section `{section}`")]
    MissingField { section: String, key: String },

    #[error("invalid value `{value}` for `{key}` in section `{section}`: {reason}")]
    InvalidField {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing_field(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingField {
            section: section.into(),
            key: key.into(),
        }
    }

    pub fn invalid_field(
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by a transport while opening a session or writing a file.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH handshake with {addr} failed: {reason}")]
    Handshake { addr: String, reason: String },

    #[error("host key for {addr} rejected: {reason}")]
    HostKey { addr: String, reason: String },

    #[error("authentication as `{username}` failed: {reason}")]
    Authentication { username: String, reason: String },

    #[error("SFTP error: {reason}")]
    Sftp { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn sftp(reason: impl Into<String>) -> Self {
        Self::Sftp {
            reason: reason.into(),
        }
    }
}

/// The first error encountered during a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to open source file `{path}`: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create remote file `{path}`: {source}")]
    RemoteCreate {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("transfer to `{path}` failed after {written} bytes: {source}")]
    Transfer {
        path: String,
        written: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("delivery task aborted: {reason}")]
    Aborted { reason: String },
}
