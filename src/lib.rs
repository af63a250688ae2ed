pub mod cli;
pub mod config;
pub mod deploy;
pub mod helper;
pub mod ssh;

pub use deploy::runner::{DeployOutcome, Deployer};
pub use ssh::remote_session::RemoteSession;
pub use ssh::ssh_session::{AuthMethod, SshSession};
