use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};
use zeroize::Zeroizing;

use crate::deploy::nginx::INDEX_FILES;
use crate::helper::default_known_hosts;
use crate::ssh::host_keys::HostKeyPolicy;
use crate::ssh::ssh_session::{AuthMethod, Target};

/// One layer of settings, either read from `deploy.toml` or built from
/// command line flags. Unset fields leave the lower layer untouched.
#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub repo_url: Option<String>,
    pub app_dir: Option<String>,
    pub site_name: Option<String>,
    pub web_user: Option<String>,
    pub dir_mode: Option<String>,
    pub host_key_policy: Option<HostKeyPolicy>,
    pub known_hosts: Option<PathBuf>,
}

/// Fully resolved settings for one deployment run.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// `None` until a password or key is supplied; the binary prompts for one.
    pub auth: Option<AuthMethod>,
    pub repo_url: String,
    pub app_dir: String,
    pub site_name: String,
    pub web_user: String,
    pub dir_mode: String,
    pub host_key_policy: HostKeyPolicy,
    pub known_hosts: PathBuf,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            host: "103.73.161.253".to_string(),
            port: 22,
            username: "root".to_string(),
            auth: None,
            repo_url: "https://github.com/yueyeye888-blip/NTX-Game.git".to_string(),
            app_dir: "/var/www/ntx-game".to_string(),
            site_name: "ntx-game".to_string(),
            web_user: "www-data".to_string(),
            dir_mode: "755".to_string(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts: default_known_hosts()
                .unwrap_or_else(|_| PathBuf::from(".ssh/known_hosts")),
        }
    }
}

impl DeployConfig {
    pub fn apply(&mut self, layer: ConfigLayer) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        set(&mut self.host, layer.host);
        set(&mut self.port, layer.port);
        set(&mut self.username, layer.username);
        set(&mut self.repo_url, layer.repo_url);
        set(&mut self.app_dir, layer.app_dir);
        set(&mut self.site_name, layer.site_name);
        set(&mut self.web_user, layer.web_user);
        set(&mut self.dir_mode, layer.dir_mode);
        set(&mut self.host_key_policy, layer.host_key_policy);
        set(&mut self.known_hosts, layer.known_hosts);

        // a key file wins over a password given in the same layer
        if let Some(path) = layer.identity_file {
            self.auth = Some(AuthMethod::Key(path));
        } else if let Some(password) = layer.password {
            self.auth = Some(AuthMethod::Password(Zeroizing::new(password)));
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("host", &self.host),
            ("username", &self.username),
            ("repo_url", &self.repo_url),
            ("app_dir", &self.app_dir),
            ("site_name", &self.site_name),
            ("web_user", &self.web_user),
        ] {
            if value.trim().is_empty() {
                bail!("`{}` must not be empty", name);
            }
        }
        if !self.app_dir.starts_with('/') {
            bail!("`app_dir` must be an absolute path, got {:?}", self.app_dir);
        }
        if self.app_dir.trim_end_matches('/').is_empty() {
            bail!("`app_dir` must not be the filesystem root");
        }
        if let Some(c) = self.app_dir.chars().find(|c| breaks_nginx_token(*c)) {
            bail!(
                "`app_dir` {:?} contains {:?}, which breaks the nginx `root` directive",
                self.app_dir,
                c
            );
        }
        if self.site_name.contains('/') {
            bail!("`site_name` must not contain '/', got {:?}", self.site_name);
        }
        let mode_ok = (3..=4).contains(&self.dir_mode.len())
            && self.dir_mode.chars().all(|c| ('0'..='7').contains(&c));
        if !mode_ok {
            bail!("`dir_mode` must be 3 or 4 octal digits, got {:?}", self.dir_mode);
        }
        Ok(())
    }

    pub fn target(&self) -> Target {
        Target::new(&self.host, self.port, &self.username)
    }

    /// URL the deployed site is reachable at.
    pub fn access_url(&self) -> String {
        format!("http://{}/{}", self.host, INDEX_FILES[0])
    }
}

/// Characters that end or alter an unquoted nginx directive argument.
fn breaks_nginx_token(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | '{' | '}' | '"' | '\'' | '\\' | '$' | '#')
}

/**
    read a toml config layer.
    a missing file is an error only when `required` is set,
    an empty file is an empty layer
*/
pub fn read_config_layer(path: &Path, required: bool) -> Result<ConfigLayer> {
    if !path.exists() && !required {
        return Ok(ConfigLayer::default());
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Unable to read ssh-deploy's config file at {:?}", path))?;

    if config_str.trim().is_empty() {
        return Ok(ConfigLayer::default());
    }

    let layer: ConfigLayer = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse ssh-deploy's config file at {:?}", path))?;

    Ok(layer)
}
