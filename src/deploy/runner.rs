use std::fmt;
use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, trace, warn};

use crate::config::deploy_config::DeployConfig;
use crate::ssh::ssh_session::SshSession;

use super::plan::deployment_plan;

/// How a deployment run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Every step ran and the final message was printed.
    Completed,
    /// A step that stops the run failed.
    Aborted { step: String },
    /// Connecting, authenticating or talking to the server failed.
    Failed { error: String },
}

/// Drives one deployment over a session and reports progress to `out`.
pub struct Deployer<'a, W: Write> {
    config: &'a DeployConfig,
    out: W,
}

impl<'a, W: Write> Deployer<'a, W> {
    pub fn new(config: &'a DeployConfig, out: W) -> Self {
        Self { config, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Runs one command and reports it. Returns whether it exited with 0.
    /// Only transport failures are errors.
    pub async fn run_command<S: SshSession + ?Sized>(
        &mut self,
        session: &mut S,
        command: &str,
        description: &str,
    ) -> Result<bool> {
        writeln!(self.out, "==> {}...", description)?;
        debug!(command, "running remote command");

        let output = session.exec(command).await?;
        debug!(exit_status = output.exit_status, "remote command finished");
        trace!(stdout = %output.stdout);

        if output.success() {
            writeln!(self.out, "✅ {} succeeded", description)?;
            return Ok(true);
        }

        writeln!(
            self.out,
            "❌ {} failed (exit status {})",
            description, output.exit_status
        )?;
        let stderr = output.stderr.trim_end();
        if !stderr.is_empty() {
            writeln!(self.out, "{}", stderr)?;
        }
        Ok(false)
    }

    /// Connects, runs the deployment plan and always closes `session`
    /// before returning, whatever happened.
    pub async fn deploy<S: SshSession + ?Sized>(&mut self, session: &mut S) -> DeployOutcome {
        let outcome = match self.run(session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report(format_args!("❌ Error: {:#}", e));
                DeployOutcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        };

        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close session");
        }
        outcome
    }

    async fn run<S: SshSession + ?Sized>(&mut self, session: &mut S) -> Result<DeployOutcome> {
        let config = self.config;
        let auth = config
            .auth
            .as_ref()
            .context("no password or private key configured")?;

        writeln!(self.out, "Connecting to {}...", config.host)?;
        session.connect(&config.target(), auth).await?;
        writeln!(self.out, "✅ Connected to {}", config.host)?;

        for step in deployment_plan(config) {
            let ok = self
                .run_command(session, &step.command, &step.description)
                .await?;
            if !ok && step.abort_on_failure {
                if let Some(notice) = &step.failure_notice {
                    writeln!(self.out, "❌ {}", notice)?;
                }
                debug!(step = %step.description, "stopping deployment");
                return Ok(DeployOutcome::Aborted {
                    step: step.description,
                });
            }
        }

        writeln!(self.out)?;
        writeln!(self.out, "🎉 Deployment complete!")?;
        writeln!(self.out, "Visit: {}", config.access_url())?;
        Ok(DeployOutcome::Completed)
    }

    fn report(&mut self, msg: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", msg) {
            warn!(error = %e, "unable to write progress output");
        }
    }
}
