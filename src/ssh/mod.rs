pub mod common;
pub mod host_keys;
pub mod remote_session;
pub mod ssh_session;
