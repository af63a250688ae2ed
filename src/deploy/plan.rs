use std::fmt::Write;

use crate::config::deploy_config::DeployConfig;
use crate::helper::shell_quote;

use super::nginx::{
    default_site_path, render_site_config, site_available_path, write_file_command, SITES_ENABLED,
};
use super::step::Step;

/// The ordered steps of a deployment. Nothing here touches the network.
pub fn deployment_plan(config: &DeployConfig) -> Vec<Step> {
    let app_dir = shell_quote(&config.app_dir);
    let site_path = site_available_path(&config.site_name);
    let owner = format!("{0}:{0}", config.web_user);

    vec![
        Step::new("apt-get update -y", "Update package index"),
        Step::new("apt-get install -y nginx git", "Install Nginx and Git"),
        Step::new(format!("rm -rf {}", app_dir), "Remove previous deployment directory"),
        Step::gate(
            format!("git clone {} {}", shell_quote(&config.repo_url), app_dir),
            "Clone repository",
        ),
        Step::new(
            format!("chown -R {} {}", shell_quote(&owner), app_dir),
            "Set directory ownership",
        ),
        Step::new(
            format!("chmod -R {} {}", config.dir_mode, app_dir),
            "Set directory permissions",
        ),
        Step::new(
            write_file_command(&render_site_config(&config.app_dir), &site_path),
            "Write Nginx site configuration",
        ),
        Step::new(
            format!("ln -sf {} {}/", shell_quote(&site_path), SITES_ENABLED),
            "Enable site",
        ),
        Step::new(format!("rm -f {}", default_site_path()), "Remove default Nginx site"),
        Step::gate("nginx -t", "Test Nginx configuration")
            .with_failure_notice("Nginx configuration test failed, please check it"),
        Step::new("systemctl restart nginx", "Restart Nginx"),
    ]
}

/// Human readable listing used by `--dry-run`.
pub fn render_plan(steps: &[Step]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        let marker = if step.abort_on_failure { " (stops on failure)" } else { "" };
        let _ = writeln!(out, "[{:>2}] {}{}", i + 1, step.description, marker);
        for line in step.command.lines() {
            let _ = writeln!(out, "     $ {}", line);
        }
    }
    out
}
