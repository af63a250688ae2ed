use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use russh::{client, Disconnect};
use russh_keys::load_secret_key;
use tracing::{debug, info};

use super::common::{default_ssh_config, SshChannel};
use super::host_keys::{Client, HostKeyPolicy};
use super::ssh_session::{AuthMethod, CommandOutput, SshSession, Target};

/// russh-backed session supporting password and private key authentication.
pub struct RemoteSession {
    policy: HostKeyPolicy,
    known_hosts: PathBuf,
    session: Option<client::Handle<Client>>,
}

impl RemoteSession {
    pub fn new(policy: HostKeyPolicy, known_hosts: PathBuf) -> Self {
        Self {
            policy,
            known_hosts,
            session: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[async_trait]
impl SshSession for RemoteSession {
    async fn connect(&mut self, target: &Target, auth: &AuthMethod) -> Result<()> {
        let config = Arc::new(default_ssh_config());
        let sh = Client::new(&target.host, target.port, self.policy, self.known_hosts.clone());

        let mut session = client::connect(config, (target.host.as_str(), target.port), sh)
            .await
            .with_context(|| format!("unable to connect to {}:{}", target.host, target.port))?;

        let authenticated = match auth {
            AuthMethod::Password(password) => session
                .authenticate_password(target.user.as_str(), password.as_str())
                .await?,
            AuthMethod::Key(path) => {
                let key_pair = load_secret_key(path, None)
                    .with_context(|| format!("unable to load private key {:?}", path))?;
                session
                    .authenticate_publickey(target.user.as_str(), Arc::new(key_pair))
                    .await?
            }
        };

        if !authenticated {
            let kind = match auth {
                AuthMethod::Password(_) => "password",
                AuthMethod::Key(_) => "public key",
            };
            bail!("Authentication (with {}) failed for {}@{}", kind, target.user, target.host);
        }

        info!(host = %target.host, port = target.port, user = %target.user, "session established");
        self.session = Some(session);
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let Some(session) = self.session.as_mut() else {
            bail!("session is not connected");
        };
        debug!(command, "opening exec channel");
        let channel = session.channel_open_session().await?;
        SshChannel::new(channel).exec(command).await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await?;
        }
        Ok(())
    }
}
