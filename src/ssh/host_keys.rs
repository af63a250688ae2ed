use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use russh_keys::{check_known_hosts_path, learn_known_hosts_path};
use serde::Deserialize;
use tracing::{info, warn};

/// How much a server's host key is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Trust on first use: record unknown keys, reject changed ones.
    #[default]
    AcceptNew,
    /// Accept any key without looking at known_hosts.
    AcceptAll,
    /// Only accept keys already recorded in known_hosts.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownHostStatus {
    Known,
    Unknown,
    Changed { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    AcceptAndLearn,
    Reject,
}

impl HostKeyPolicy {
    pub fn decide(self, status: KnownHostStatus) -> Decision {
        match (self, status) {
            (HostKeyPolicy::AcceptAll, _) => Decision::Accept,
            (_, KnownHostStatus::Known) => Decision::Accept,
            (HostKeyPolicy::AcceptNew, KnownHostStatus::Unknown) => Decision::AcceptAndLearn,
            (_, KnownHostStatus::Unknown) | (_, KnownHostStatus::Changed { .. }) => {
                Decision::Reject
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Ssh(#[from] russh::Error),
    #[error(transparent)]
    Keys(#[from] russh_keys::Error),
    #[error("host key for {host} ({fingerprint}) is not in known_hosts")]
    HostKeyRejected { host: String, fingerprint: String },
    #[error("host key for {host} does not match known_hosts line {line}, refusing to connect")]
    HostKeyChanged { host: String, line: usize },
    #[error("failed to record host key for {host}: {source}")]
    Learn {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

/// russh event handler that verifies the server key according to a policy.
pub struct Client {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts: PathBuf,
}

impl Client {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        policy: HostKeyPolicy,
        known_hosts: PathBuf,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
            known_hosts,
        }
    }

    fn lookup(&self, key: &PublicKey) -> Result<KnownHostStatus, SessionError> {
        match check_known_hosts_path(&self.host, self.port, key, &self.known_hosts) {
            Ok(true) => Ok(KnownHostStatus::Known),
            Ok(false) => Ok(KnownHostStatus::Unknown),
            Err(russh_keys::Error::KeyChanged { line }) => Ok(KnownHostStatus::Changed { line }),
            Err(e) => Err(e.into()),
        }
    }

    fn learn(&self, key: &PublicKey) -> Result<(), SessionError> {
        if let Some(parent) = self.known_hosts.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| SessionError::Learn {
                    host: self.host.clone(),
                    source,
                })?;
            }
        }
        learn_known_hosts_path(&self.host, self.port, key, &self.known_hosts)?;
        Ok(())
    }
}

#[async_trait]
impl client::Handler for Client {
    type Error = SessionError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();

        let status = if self.policy == HostKeyPolicy::AcceptAll {
            KnownHostStatus::Unknown
        } else {
            self.lookup(server_public_key)?
        };

        match self.policy.decide(status) {
            Decision::Accept => {
                if self.policy == HostKeyPolicy::AcceptAll {
                    warn!(
                        host = %self.host,
                        %fingerprint,
                        "accepting host key without verification"
                    );
                }
                Ok(true)
            }
            Decision::AcceptAndLearn => {
                self.learn(server_public_key)?;
                info!(
                    host = %self.host,
                    %fingerprint,
                    known_hosts = %self.known_hosts.display(),
                    "recorded new host key"
                );
                Ok(true)
            }
            Decision::Reject => match status {
                KnownHostStatus::Changed { line } => Err(SessionError::HostKeyChanged {
                    host: self.host.clone(),
                    line,
                }),
                _ => Err(SessionError::HostKeyRejected {
                    host: self.host.clone(),
                    fingerprint,
                }),
            },
        }
    }
}
