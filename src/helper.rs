use std::path::PathBuf;
use anyhow::{Context, Result};

pub static CONFIG_FILE: &str = "deploy.toml";

pub fn get_file_path(file_name: &str) -> Result<PathBuf> {
    let mut config_dir: PathBuf = if cfg!(debug_assertions) {
        ".".into() // current running dir
    } else {
        dirs::home_dir().context("Unable to reach user's home directory.")?
    };

    config_dir.push(".config/ssh-deploy");
    config_dir.push(file_name);
    Ok(config_dir)
}

/// `~/.ssh/known_hosts`, the file host keys are checked against by default.
pub fn default_known_hosts() -> Result<PathBuf> {
    let mut path = dirs::home_dir().context("Unable to reach user's home directory.")?;
    path.push(".ssh/known_hosts");
    Ok(path)
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}

/// Quotes `s` for a POSIX shell. Strings made only of safe characters are
/// returned unchanged.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty() && s.chars().all(is_shell_safe);
    if safe {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}
