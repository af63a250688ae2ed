use anyhow::{bail, Result};
use russh::{client, client::Msg, Channel, ChannelMsg, Sig};
use tracing::trace;

use super::ssh_session::CommandOutput;

/// Client configuration shared by every session. No inactivity timeout is set:
/// a hung remote command blocks until it exits.
pub fn default_ssh_config() -> client::Config {
    client::Config::default()
}

/// Runs a single non-interactive command on an exec channel and
/// collects what it writes.
pub struct SshChannel {
    channel: Channel<Msg>,
}

impl SshChannel {
    pub fn new(channel: Channel<Msg>) -> Self {
        Self { channel }
    }

    pub async fn exec(mut self, command: &str) -> Result<CommandOutput> {
        self.channel.exec(true, command).await?;

        let mut collected = ChannelOutput::default();
        // the server may still send data after the exit status, so drain
        // until the channel is closed
        while let Some(msg) = self.channel.wait().await {
            collected.push(msg);
        }
        collected.finish(command)
    }
}

/// What a channel reported, gathered message by message.
#[derive(Default)]
pub struct ChannelOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    code: Option<u32>,
}

impl ChannelOutput {
    pub fn push(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { ref data } => self.stdout.extend_from_slice(data),
            // ext 1 is SSH_EXTENDED_DATA_STDERR
            ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                self.stderr.extend_from_slice(data)
            }
            ChannelMsg::ExitStatus { exit_status } => {
                trace!(exit_status, "exit status received");
                self.code = Some(exit_status);
            }
            ChannelMsg::ExitSignal {
                signal_name,
                error_message,
                ..
            } => {
                let status = signal_exit_status(&signal_name);
                trace!(?signal_name, status, "exit signal received");
                if !self.stderr.is_empty() && !self.stderr.ends_with(b"\n") {
                    self.stderr.push(b'\n');
                }
                let mut line = format!("killed by signal {:?}", signal_name);
                if !error_message.is_empty() {
                    line.push_str(": ");
                    line.push_str(&error_message);
                }
                line.push('\n');
                self.stderr.extend_from_slice(line.as_bytes());
                self.code.get_or_insert(status);
            }
            _ => {}
        }
    }

    pub fn finish(self, command: &str) -> Result<CommandOutput> {
        let Some(exit_status) = self.code else {
            bail!("channel closed before `{}` reported an exit status", command);
        };

        Ok(CommandOutput {
            exit_status,
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
        })
    }
}

/// Shell convention for a process killed by a signal: 128 + signal number.
pub fn signal_exit_status(signal: &Sig) -> u32 {
    let number = match signal {
        Sig::HUP => 1,
        Sig::INT => 2,
        Sig::QUIT => 3,
        Sig::ILL => 4,
        Sig::ABRT => 6,
        Sig::FPE => 8,
        Sig::KILL => 9,
        Sig::USR1 => 10,
        Sig::SEGV => 11,
        Sig::PIPE => 13,
        Sig::ALRM => 14,
        Sig::TERM => 15,
        _ => 127,
    };
    128 + number
}
