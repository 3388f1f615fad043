//! Transport boundary and the single delivery attempt built on top of it.
//!
//! A transport opens a session to one endpoint; a session creates remote files.
//! All calls block. Every attempt opens a fresh session and closes it before
//! returning: the tool models cold-connection delivery load, not
//! persistent-connection throughput.

mod ssh;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::{DeliveryError, TransportError};
use crate::profile::{Credential, EndpointProfile, HostTrust};
use crate::source;

pub use ssh::SshTransport;

/// Written when an endpoint has no source files configured.
pub const PLACEHOLDER_PAYLOAD: &[u8] = b"This is just for testing";

/// Everything a transport needs to open a session to one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ConnectTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    pub username: &'a str,
    pub credential: &'a Credential,
    pub host_trust: &'a HostTrust,
}

impl<'a> From<&'a EndpointProfile> for ConnectTarget<'a> {
    fn from(profile: &'a EndpointProfile) -> Self {
        Self {
            host: &profile.host,
            port: profile.port,
            username: &profile.username,
            credential: &profile.credential,
            host_trust: &profile.host_trust,
        }
    }
}

/// Opens authenticated sessions.
pub trait Transport: Send + Sync {
    fn open(&self, target: &ConnectTarget<'_>) -> Result<Box<dyn Session>, TransportError>;
}

/// A connected session capable of creating remote files.
pub trait Session {
    /// Create (or truncate) `remote_path` for writing.
    fn create(&mut self, remote_path: &str) -> Result<Box<dyn RemoteFile + '_>, TransportError>;

    fn close(self: Box<Self>) -> Result<(), TransportError>;
}

/// A writable remote file handle.
pub trait RemoteFile: Write {
    fn close(self: Box<Self>) -> Result<(), TransportError>;
}

/// What a successful attempt transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub remote_path: String,
    /// Local file that was copied, `None` for the placeholder payload.
    pub source: Option<PathBuf>,
    pub bytes: u64,
}

/// Perform one delivery attempt against `profile`.
///
/// The session is closed on every path once opened. A failed transfer may leave
/// a truncated remote file behind; no cleanup is attempted.
pub fn deliver(
    transport: &dyn Transport,
    profile: &EndpointProfile,
    remote_path: &str,
) -> Result<DeliveryOutcome, DeliveryError> {
    if profile.credential.uses_key() {
        info!(endpoint = %profile.name, "Connecting with private key");
    } else {
        info!(endpoint = %profile.name, "Connecting with password");
    }
    let mut session = transport.open(&ConnectTarget::from(profile))?;

    let result = upload(session.as_mut(), profile, remote_path);

    if let Err(e) = session.close() {
        warn!(endpoint = %profile.name, error = %e, "Failed to close session cleanly");
    }
    result
}

fn upload(
    session: &mut dyn Session,
    profile: &EndpointProfile,
    remote_path: &str,
) -> Result<DeliveryOutcome, DeliveryError> {
    // The local source is opened before anything is created remotely.
    let source = match profile.sources().and_then(source::pick) {
        Some(path) => {
            info!(endpoint = %profile.name, source = %path.display(), "Uploading source file");
            let file = File::open(path).map_err(|e| DeliveryError::SourceOpen {
                path: path.to_path_buf(),
                source: e,
            })?;
            Some((path.to_path_buf(), file))
        }
        None => None,
    };

    let mut remote = session
        .create(remote_path)
        .map_err(|e| DeliveryError::RemoteCreate {
            path: remote_path.to_string(),
            source: e,
        })?;

    let mut writer = CountingWriter::new(&mut *remote);
    let copied = match &source {
        Some((_, file)) => {
            let mut reader = file;
            io::copy(&mut reader, &mut writer).map(|_| ())
        }
        None => writer.write_all(PLACEHOLDER_PAYLOAD),
    };
    let bytes = writer.written;

    // The remote handle is closed whether or not the copy succeeded.
    if let Err(e) = remote.close() {
        warn!(endpoint = %profile.name, file = %remote_path, error = %e, "Failed to close remote file cleanly");
    }

    copied.map_err(|e| DeliveryError::Transfer {
        path: remote_path.to_string(),
        written: bytes,
        source: e,
    })?;

    Ok(DeliveryOutcome {
        remote_path: remote_path.to_string(),
        source: source.map(|(path, _)| path),
        bytes,
    })
}

/// Tracks how many bytes reached the remote side, including on failure.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
