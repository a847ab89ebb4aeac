//! Application deployment configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::auth::SecuredUrl;

/// Deployment configuration: the applications a server hosts and the
/// defaults shared between them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Welcome files probed for directory requests
    /// Default: ["index.html", "index.htm"]
    #[serde(default = "default_welcome_files")]
    pub welcome_files: Vec<String>,

    /// File extensions mapped to the built-in static handler ahead of the
    /// application's own mappings
    /// Default: common web asset extensions
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Applications to deploy, in priority order
    #[serde(default)]
    pub applications: Vec<AppConfig>,
}

/// One application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Unique application name
    pub name: String,

    /// Document root on disk
    pub webapp_path: String,

    /// Context path for host-independent routing
    /// Default: "/<name>" ("/" mounts the application at the root)
    #[serde(default)]
    pub context: Option<String>,

    /// Virtual hosts this application answers for
    #[serde(default)]
    pub vhosts: Vec<VhostConfig>,

    /// Servlet mappings in priority order (first match wins)
    #[serde(default)]
    pub servlet_mappings: Vec<MappingConfig>,

    /// URL patterns requiring authentication
    #[serde(default)]
    pub secured_urls: Vec<SecuredUrl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VhostConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub url_pattern: String,
    pub handler: String,
}

impl AppConfig {
    /// Effective context path: explicit value or `/<name>`.
    pub fn context_path(&self) -> String {
        match &self.context {
            Some(context) => context.clone(),
            None => format!("/{}", self.name),
        }
    }
}

fn default_welcome_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

fn default_static_extensions() -> Vec<String> {
    [
        "html", "htm", "css", "js", "mjs", "json", "png", "jpg", "jpeg", "gif", "svg", "ico",
        "txt", "pdf", "woff", "woff2",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            welcome_files: default_welcome_files(),
            static_extensions: default_static_extensions(),
            applications: Vec::new(),
        }
    }
}

impl DeployConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.welcome_files = other.welcome_files;
        self.static_extensions = other.static_extensions;
        self.applications = other.applications;
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for app in &self.applications {
            if app.name.is_empty() {
                bail!("Invalid application: name cannot be empty");
            }
            if app.name.contains('/') {
                bail!("Invalid application name '{}': must not contain '/'", app.name);
            }
            if !names.insert(app.name.as_str()) {
                bail!("Duplicate application name: {}", app.name);
            }
            if app.webapp_path.is_empty() {
                bail!("Invalid application '{}': webapp_path cannot be empty", app.name);
            }
            let context = app.context_path();
            if !context.starts_with('/') {
                bail!(
                    "Invalid context '{}' for application '{}': must start with '/'",
                    context,
                    app.name
                );
            }
            if context.len() > 1 && context.ends_with('/') {
                bail!(
                    "Invalid context '{}' for application '{}': must not end with '/'",
                    context,
                    app.name
                );
            }
            for mapping in &app.servlet_mappings {
                if mapping.url_pattern.is_empty() {
                    bail!("Invalid mapping in '{}': url_pattern cannot be empty", app.name);
                }
                if mapping.handler.is_empty() {
                    bail!(
                        "Invalid mapping '{}' in '{}': handler cannot be empty",
                        mapping.url_pattern,
                        app.name
                    );
                }
            }
            for secured in &app.secured_urls {
                if secured.url_pattern.is_empty() {
                    bail!("Invalid secured URL in '{}': url_pattern cannot be empty", app.name);
                }
            }
        }
        Ok(())
    }
}
