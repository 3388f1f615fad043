//! SFTP over SSH, via libssh2.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use ssh2::{CheckResult, KnownHostFileKind, Sftp};
use tracing::debug;

use super::{ConnectTarget, RemoteFile, Session, Transport};
use crate::error::TransportError;
use crate::profile::{Credential, HostTrust};

/// Opens a fresh SSH connection and SFTP subsystem for every session.
#[derive(Debug, Clone, Default)]
pub struct SshTransport {
    /// Applied to the TCP connect and to every blocking libssh2 call.
    /// `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl SshTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    fn connect_tcp(&self, addr: &str) -> Result<TcpStream, TransportError> {
        let connect_err = |source: io::Error| TransportError::Connect {
            addr: addr.to_string(),
            source,
        };

        let Some(timeout) = self.timeout else {
            return TcpStream::connect(addr).map_err(connect_err);
        };

        let mut last_err = None;
        for socket_addr in addr.to_socket_addrs().map_err(connect_err)? {
            match TcpStream::connect_timeout(&socket_addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")
        })))
    }
}

impl Transport for SshTransport {
    fn open(&self, target: &ConnectTarget<'_>) -> Result<Box<dyn Session>, TransportError> {
        let addr = format!("{}:{}", target.host, target.port);
        let tcp = self.connect_tcp(&addr)?;
        debug!(%addr, "TCP connection established");

        let handshake_err = |e: ssh2::Error| TransportError::Handshake {
            addr: addr.clone(),
            reason: e.to_string(),
        };
        let mut session = ssh2::Session::new().map_err(handshake_err)?;
        if let Some(timeout) = self.timeout {
            session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }
        session.set_tcp_stream(tcp);
        session.handshake().map_err(handshake_err)?;

        verify_host_key(&session, target, &addr)?;
        authenticate(&session, target)?;

        let sftp = session
            .sftp()
            .map_err(|e| TransportError::sftp(format!("failed to start subsystem: {e}")))?;

        Ok(Box::new(SshSession { session, sftp }))
    }
}

fn verify_host_key(
    session: &ssh2::Session,
    target: &ConnectTarget<'_>,
    addr: &str,
) -> Result<(), TransportError> {
    let path = match target.host_trust {
        HostTrust::AcceptAny => return Ok(()),
        HostTrust::KnownHosts(path) => path,
    };
    let reject = |reason: String| TransportError::HostKey {
        addr: addr.to_string(),
        reason,
    };

    let (key, _) = session
        .host_key()
        .ok_or_else(|| reject("server presented no host key".to_string()))?;
    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| reject(e.to_string()))?;
    known_hosts
        .read_file(Path::new(path), KnownHostFileKind::OpenSSH)
        .map_err(|e| reject(format!("cannot read {}: {e}", path.display())))?;

    match known_hosts.check_port(target.host, target.port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(reject("key does not match known_hosts entry".to_string())),
        CheckResult::NotFound => Err(reject(format!("no entry in {}", path.display()))),
        CheckResult::Failure => Err(reject("known_hosts check failed".to_string())),
    }
}

fn authenticate(session: &ssh2::Session, target: &ConnectTarget<'_>) -> Result<(), TransportError> {
    let result = match target.credential {
        Credential::Password(password) => session.userauth_password(target.username, password),
        Credential::PrivateKey { key, passphrase } => session.userauth_pubkey_memory(
            target.username,
            None,
            key,
            passphrase.as_deref(),
        ),
    };
    let auth_err = |reason: String| TransportError::Authentication {
        username: target.username.to_string(),
        reason,
    };
    result.map_err(|e| auth_err(e.to_string()))?;

    if session.authenticated() {
        Ok(())
    } else {
        Err(auth_err("server did not accept credentials".to_string()))
    }
}

struct SshSession {
    session: ssh2::Session,
    sftp: Sftp,
}

impl Session for SshSession {
    fn create(&mut self, remote_path: &str) -> Result<Box<dyn RemoteFile + '_>, TransportError> {
        let file = self
            .sftp
            .create(Path::new(remote_path))
            .map_err(|e| TransportError::sftp(e.to_string()))?;
        Ok(Box::new(SshFile { inner: file }))
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        let Self { session, sftp } = *self;
        drop(sftp);
        session
            .disconnect(None, "delivery complete", None)
            .map_err(|e| TransportError::sftp(format!("disconnect failed: {e}")))
    }
}

struct SshFile {
    inner: ssh2::File,
}

impl Write for SshFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl RemoteFile for SshFile {
    fn close(mut self: Box<Self>) -> Result<(), TransportError> {
        self.inner.flush()?;
        self.inner
            .close()
            .map_err(|e| TransportError::sftp(format!("close failed: {e}")))
    }
}
