//! Nginx virtual host for the deployed site.

use crate::helper::shell_quote;

pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";
pub const LISTEN_PORT: u16 = 80;

/// Index files in the order Nginx tries them.
pub const INDEX_FILES: [&str; 3] = ["preview_cn.html", "preview.html", "index.html"];

/// Renders the server block serving `app_dir`.
pub fn render_site_config(app_dir: &str) -> String {
    format!(
        r#"server {{
    listen {port};
    server_name _;

    root {root};
    index {index};

    location / {{
        try_files $uri $uri/ =404;
        add_header Cache-Control "no-cache, no-store, must-revalidate";
    }}
}}
"#,
        port = LISTEN_PORT,
        root = app_dir,
        index = INDEX_FILES.join(" "),
    )
}

pub fn site_available_path(site_name: &str) -> String {
    format!("{}/{}", SITES_AVAILABLE, site_name)
}

pub fn default_site_path() -> String {
    format!("{}/default", SITES_ENABLED)
}

/// Shell command writing `content` to `path` through redirection.
pub fn write_file_command(content: &str, path: &str) -> String {
    format!("printf '%s' {} > {}", shell_quote(content), shell_quote(path))
}
