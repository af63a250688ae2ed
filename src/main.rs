use std::{io, panic};

use anyhow::{Context, Result};
use backtrace::Backtrace;
use clap::Parser;
use ssh_deploy_lib::{
    cli::Cli,
    deploy::plan::{deployment_plan, render_plan},
    AuthMethod, Deployer, RemoteSession,
};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[tokio::main]
async fn main() -> Result<()> {
    set_panic_handlers()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = cli.resolve_config()?;

    if cli.dry_run {
        print!("{}", render_plan(&deployment_plan(&config)));
        return Ok(());
    }

    if config.auth.is_none() {
        let prompt = format!("{}@{}'s password: ", config.username, config.host);
        let password = rpassword::prompt_password(prompt).context("unable to read password")?;
        config.auth = Some(AuthMethod::Password(Zeroizing::new(password)));
    }

    let mut session = RemoteSession::new(config.host_key_policy, config.known_hosts.clone());
    let mut deployer = Deployer::new(&config, io::stdout());
    // the outcome is already on the console; every run exits the same way
    let outcome = deployer.deploy(&mut session).await;
    tracing::debug!(?outcome, "deployment finished");

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

// handle all panic here
fn set_panic_handlers() -> Result<()> {
	panic::set_hook(Box::new(|e| {
		let backtrace = Backtrace::new();
		eprintln!(
			"\nssh-deploy closed on an unexpected panic:\n\n{:?}\ntrace:\n{:?}",
			e, backtrace
		);
	}));
	Ok(())
}
