use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ssh_deploy_lib::{
    config::deploy_config::DeployConfig,
    ssh::ssh_session::{AuthMethod, CommandOutput, SshSession, Target},
    DeployOutcome, Deployer,
};
use zeroize::Zeroizing;

/// In-memory session that records what the deployer asks of it.
#[derive(Default)]
struct RecordingSession {
    refuse_connect: Option<&'static str>,
    /// (command prefix, exit status, stderr)
    failures: Vec<(&'static str, u32, &'static str)>,
    connected_to: Option<String>,
    commands: Vec<String>,
    closes: usize,
}

impl RecordingSession {
    fn failing(prefix: &'static str, status: u32, stderr: &'static str) -> Self {
        Self {
            failures: vec![(prefix, status, stderr)],
            ..Default::default()
        }
    }

    fn issued(&self, prefix: &str) -> bool {
        self.commands.iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl SshSession for RecordingSession {
    async fn connect(&mut self, target: &Target, _auth: &AuthMethod) -> Result<()> {
        if let Some(reason) = self.refuse_connect {
            return Err(anyhow!("{}", reason));
        }
        self.connected_to = Some(format!("{}@{}:{}", target.user, target.host, target.port));
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        self.commands.push(command.to_string());
        let failure = self
            .failures
            .iter()
            .find(|(prefix, _, _)| command.starts_with(prefix));
        Ok(match failure {
            Some((_, status, stderr)) => CommandOutput {
                exit_status: *status,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
            None => CommandOutput::default(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}

fn config() -> DeployConfig {
    DeployConfig {
        host: "203.0.113.7".into(),
        auth: Some(AuthMethod::Password(Zeroizing::new("secret".into()))),
        ..Default::default()
    }
}

async fn deploy(session: &mut RecordingSession) -> (DeployOutcome, String) {
    let config = config();
    let mut deployer = Deployer::new(&config, Vec::new());
    let outcome = deployer.deploy(session).await;
    (outcome, String::from_utf8(deployer.into_inner()).unwrap())
}

const AFTER_CLONE: [&str; 6] = [
    "chown ",
    "chmod ",
    "printf ",
    "ln -sf ",
    "nginx -t",
    "systemctl restart nginx",
];

#[tokio::test]
async fn full_success_prints_access_url() {
    let mut session = RecordingSession::default();
    let (outcome, out) = deploy(&mut session).await;

    assert_eq!(outcome, DeployOutcome::Completed);
    assert_eq!(session.connected_to.as_deref(), Some("root@203.0.113.7:22"));
    assert_eq!(session.commands.len(), 11);
    assert_eq!(session.commands.last().unwrap(), "systemctl restart nginx");
    assert!(out.starts_with("Connecting to 203.0.113.7...\n✅ Connected to 203.0.113.7\n"));
    assert!(out.contains("🎉 Deployment complete!"));
    assert!(out.contains("http://203.0.113.7/preview_cn.html"));
    assert_eq!(session.closes, 1);
}

#[tokio::test]
async fn clone_failure_stops_everything_after_it() {
    let mut session = RecordingSession::failing("git clone", 128, "fatal: repository not found");
    let (outcome, out) = deploy(&mut session).await;

    assert_eq!(
        outcome,
        DeployOutcome::Aborted {
            step: "Clone repository".into()
        }
    );
    for prefix in AFTER_CLONE {
        assert!(!session.issued(prefix), "{} was issued", prefix);
    }
    assert_eq!(session.commands.len(), 4);
    assert!(out.contains(
        "❌ Clone repository failed (exit status 128)\nfatal: repository not found\n"
    ));
    assert!(out.ends_with("fatal: repository not found\n"));
    assert_eq!(session.closes, 1);
}

#[tokio::test]
async fn syntax_check_failure_skips_restart_only() {
    let mut session = RecordingSession::failing("nginx -t", 1, "nginx: [emerg] unexpected \"}\"");
    let (outcome, out) = deploy(&mut session).await;

    assert_eq!(
        outcome,
        DeployOutcome::Aborted {
            step: "Test Nginx configuration".into()
        }
    );
    for prefix in [
        "chown ",
        "chmod ",
        "printf ",
        "ln -sf ",
        "rm -f /etc/nginx/sites-enabled/default",
    ] {
        assert!(session.issued(prefix), "{} was not issued", prefix);
    }
    assert!(!session.issued("systemctl restart nginx"));
    assert!(out.contains("❌ Nginx configuration test failed, please check it"));
    assert!(!out.contains("Deployment complete"));
    assert_eq!(session.closes, 1);
}

#[tokio::test]
async fn non_gating_failures_do_not_stop_the_run() {
    let mut session = RecordingSession {
        failures: vec![
            ("apt-get install", 100, "E: Unable to locate package"),
            ("chown ", 1, "chown: invalid user"),
        ],
        ..Default::default()
    };
    let (outcome, out) = deploy(&mut session).await;

    assert_eq!(outcome, DeployOutcome::Completed);
    assert_eq!(session.commands.len(), 11);
    assert!(out.contains("E: Unable to locate package"));
    assert!(out.contains("chown: invalid user"));
    assert_eq!(session.closes, 1);
}

#[tokio::test]
async fn step_killed_by_signal_is_reported_and_the_run_continues() {
    // 137 = 128 + SIGKILL, as the channel reports a command the OOM killer ended
    let mut session = RecordingSession::failing(
        "apt-get install",
        137,
        "killed by signal KILL: Out of memory",
    );
    let (outcome, out) = deploy(&mut session).await;

    assert_eq!(outcome, DeployOutcome::Completed);
    assert_eq!(session.commands.len(), 11);
    let after = session
        .commands
        .iter()
        .skip_while(|c| !c.starts_with("apt-get install"))
        .skip(1)
        .count();
    assert_eq!(after, 9);
    assert!(out.contains("❌ Install Nginx and Git failed (exit status 137)\n"));
    assert!(out.contains("killed by signal KILL: Out of memory"));
    assert_eq!(session.closes, 1);
}

#[tokio::test]
async fn unreachable_host_reports_error_and_still_closes() {
    let mut session = RecordingSession {
        refuse_connect: Some("connection refused"),
        ..Default::default()
    };
    let (outcome, out) = deploy(&mut session).await;

    assert!(matches!(
        outcome,
        DeployOutcome::Failed { ref error } if error.contains("connection refused")
    ));
    assert!(session.commands.is_empty());
    assert!(out.contains("❌ Error: connection refused"));
    assert_eq!(session.closes, 1);
}

#[tokio::test]
async fn written_config_points_at_app_dir() {
    let mut session = RecordingSession::default();
    deploy(&mut session).await;

    let write = session
        .commands
        .iter()
        .find(|c| c.starts_with("printf "))
        .unwrap();
    assert!(write.contains("root /var/www/ntx-game;"));
    assert!(write.contains("index preview_cn.html preview.html index.html;"));
    assert!(write.ends_with("> /etc/nginx/sites-available/ntx-game"));
}
