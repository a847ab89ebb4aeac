//! Second routing tier: path to handler within an application.
//!
//! Mappings are an ordered list of compiled glob patterns; the first match
//! wins, so registration order is the only priority rule. More specific
//! patterns must be registered before broader ones; `/special/*.php`
//! after `*.php` never fires.

use crate::error::{HttpError, HttpResult};
use crate::http::request::{server_vars, RequestModel};
use crate::routing::glob::GlobPattern;

/// One matched mapping.
#[derive(Debug)]
pub struct Located<'a> {
    pub handler: &'a str,
    pub pattern: &'a GlobPattern,
}

/// Ordered pattern table mapping application-relative paths to handler
/// names.
#[derive(Debug, Default)]
pub struct ServletLocator {
    mappings: Vec<(GlobPattern, String)>,
}

impl ServletLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping; the pattern compiles here, once.
    pub fn add_mapping(&mut self, pattern: &str, handler: impl Into<String>) {
        self.mappings
            .push((GlobPattern::compile(pattern), handler.into()));
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Handler names referenced by the mappings, for deploy-time checks.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|(_, handler)| handler.as_str())
    }

    /// First mapping whose pattern matches `path`.
    pub fn locate(&self, path: &str) -> HttpResult<Located<'_>> {
        self.mappings
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(pattern, handler)| Located {
                handler: handler.as_str(),
                pattern,
            })
            .ok_or_else(|| HttpError::HandlerNotFound(path.to_string()))
    }

    /// Locate the handler for a routed request and stamp the servlet path
    /// split onto it.
    ///
    /// For a `prefix/*` mapping the matched prefix becomes the servlet
    /// path and the rest the path info; any other pattern claims the whole
    /// path as servlet path.
    pub fn locate_for(&self, request: &mut RequestModel) -> HttpResult<&str> {
        let path = request.relative_path().to_string();
        let located = self.locate(&path)?;
        match located.pattern.path_split_prefix() {
            Some(prefix) => {
                request.set_servlet_path(prefix);
                let info = path[prefix.len()..].to_string();
                if !info.is_empty() {
                    request.set_server_var(server_vars::PATH_INFO, info.clone());
                }
                request.set_path_info(info);
            }
            None => {
                request.set_servlet_path(path);
                request.set_path_info("");
            }
        }
        log::debug!(
            "located handler '{}' for {} via pattern '{}'",
            located.handler,
            request.relative_path(),
            located.pattern
        );
        Ok(located.handler)
    }
}
