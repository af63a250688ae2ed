use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::config::deploy_config::{read_config_layer, ConfigLayer, DeployConfig};
use crate::helper::{get_file_path, CONFIG_FILE};
use crate::ssh::host_keys::HostKeyPolicy;

/// Deploy a static site to a remote Nginx host over ssh.
#[derive(Parser)]
#[command(name = "ssh-deploy", version, about)]
pub struct Cli {
    /// Config file (default: ~/.config/ssh-deploy/deploy.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    #[arg(long, short)]
    pub username: Option<String>,

    /// Password for the remote user; prompted for when no credential is set
    #[arg(long, env = "DEPLOY_SSH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Private key to authenticate with instead of a password
    #[arg(long, short = 'i')]
    pub identity_file: Option<PathBuf>,

    #[arg(long)]
    pub repo_url: Option<String>,

    /// Directory the repository is cloned into
    #[arg(long)]
    pub app_dir: Option<String>,

    /// Name of the Nginx site file
    #[arg(long)]
    pub site_name: Option<String>,

    /// Account that owns the deployed files
    #[arg(long)]
    pub web_user: Option<String>,

    #[arg(long)]
    pub dir_mode: Option<String>,

    #[arg(long, value_enum)]
    pub host_key_policy: Option<HostKeyPolicy>,

    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Print the commands without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// More diagnostic logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            identity_file: self.identity_file.clone(),
            repo_url: self.repo_url.clone(),
            app_dir: self.app_dir.clone(),
            site_name: self.site_name.clone(),
            web_user: self.web_user.clone(),
            dir_mode: self.dir_mode.clone(),
            host_key_policy: self.host_key_policy,
            known_hosts: self.known_hosts.clone(),
        }
    }

    /// Defaults, then the config file, then flags.
    pub fn resolve_config(&self) -> Result<DeployConfig> {
        let (path, required) = match &self.config {
            Some(path) => (path.clone(), true),
            None => (get_file_path(CONFIG_FILE)?, false),
        };

        let mut config = DeployConfig::default();
        config.apply(read_config_layer(&path, required)?);
        config.apply(self.layer());
        config.validate()?;
        Ok(config)
    }
}
