use std::path::PathBuf;
use anyhow::Result;
use zeroize::Zeroizing;

/// Where and how a session connects.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
        }
    }
}

/// Result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// A remote shell the deployer drives.
///
/// A session is created unconnected, so `close` can be called on every path,
/// including after `connect` failed.
#[async_trait::async_trait]
pub trait SshSession: Send {
    async fn connect(&mut self, target: &Target, auth: &AuthMethod) -> Result<()>;

    /// Runs `command` and blocks until it exits. A non-zero exit status is
    /// returned, not raised.
    async fn exec(&mut self, command: &str) -> Result<CommandOutput>;

    /// Releases the connection. Calling it on an unconnected session is a no-op.
    async fn close(&mut self) -> Result<()>;
}

#[derive(Clone)]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    Key(PathBuf),
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Password(_) => f.write_str("Password(***)"),
            AuthMethod::Key(path) => f.debug_tuple("Key").field(path).finish(),
        }
    }
}
