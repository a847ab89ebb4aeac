//! First routing tier: host/path to application.
//!
//! Every deployed application contributes two kinds of match entries. Its
//! virtual host names and aliases become anchored host entries, prepended
//! so the most recent registration wins a name collision. Its context path
//! becomes a wildcard entry that accepts any host, appended in deployment
//! order. The match target is the concatenation of the request's server
//! name (port already stripped) and its path, and the first entry that
//! matches claims the request.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{HttpError, HttpResult};
use crate::http::request::{server_vars, RequestModel};

/// A virtual host an application answers for.
#[derive(Debug, Clone)]
pub struct VirtualHost {
    pub name: String,
    pub aliases: Vec<String>,
}

/// Static description of one deployed application.
#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    /// Document root on disk.
    pub webapp_path: PathBuf,
    /// Mount point for host-independent access, `/` for a root mount.
    pub context_path: String,
    pub vhosts: Vec<VirtualHost>,
}

#[derive(Debug)]
enum ResolverPattern {
    /// `^name(/...)?` against the host+path target.
    Vhost { name: String },
    /// `^anyhost<context>(/...)?`: any non-empty host, then the context.
    Wildcard { context: String },
}

impl ResolverPattern {
    fn matches(&self, target: &str) -> bool {
        match self {
            ResolverPattern::Vhost { name } => {
                target == name
                    || target
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            ResolverPattern::Wildcard { context } => {
                let Some(slash) = target.find('/') else {
                    return false;
                };
                if slash == 0 {
                    return false;
                }
                let path = &target[slash..];
                if context == "/" {
                    return true;
                }
                path == context
                    || path
                        .strip_prefix(context.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug)]
struct ResolverEntry {
    pattern: ResolverPattern,
    app: Arc<Application>,
}

/// Ordered pattern table mapping requests to applications.
#[derive(Debug, Default)]
pub struct ApplicationResolver {
    entries: Vec<ResolverEntry>,
}

impl ApplicationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one application's entries.
    ///
    /// Host entries go to the front as a block (the app's own name/alias
    /// order preserved), the wildcard entry to the back.
    pub fn register(&mut self, app: Arc<Application>) {
        let mut front = Vec::new();
        for vhost in &app.vhosts {
            front.push(ResolverEntry {
                pattern: ResolverPattern::Vhost {
                    name: vhost.name.clone(),
                },
                app: Arc::clone(&app),
            });
            for alias in &vhost.aliases {
                front.push(ResolverEntry {
                    pattern: ResolverPattern::Vhost {
                        name: alias.clone(),
                    },
                    app: Arc::clone(&app),
                });
            }
        }
        self.entries.splice(0..0, front);
        self.entries.push(ResolverEntry {
            pattern: ResolverPattern::Wildcard {
                context: app.context_path.clone(),
            },
            app,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the application for a request and stamp it with the routing
    /// context: `webapp_name`, `context_path` and `DOCUMENT_ROOT`.
    ///
    /// A host-entry match mounts the application at the host root, so the
    /// context path stays empty; a wildcard match sets the application's
    /// context path (a root mount also stays empty).
    pub fn resolve(&self, request: &mut RequestModel) -> HttpResult<Arc<Application>> {
        let target = format!("{}{}", request.server_name(), request.path());
        for entry in &self.entries {
            if !entry.pattern.matches(&target) {
                continue;
            }
            let app = Arc::clone(&entry.app);
            request.set_webapp_name(app.name.clone());
            let context = match entry.pattern {
                ResolverPattern::Vhost { .. } => String::new(),
                ResolverPattern::Wildcard { ref context } => {
                    if context == "/" {
                        String::new()
                    } else {
                        context.clone()
                    }
                }
            };
            request.set_context_path(context);
            request.set_server_var(
                server_vars::DOCUMENT_ROOT,
                app.webapp_path.display().to_string(),
            );
            log::debug!(
                "resolved {} to application '{}' (context '{}')",
                target,
                app.name,
                request.context_path()
            );
            return Ok(app);
        }
        Err(HttpError::ApplicationNotFound(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::HeaderMap;
    use crate::http::request::{Method, Version};

    fn app(name: &str, context: &str, vhosts: &[(&str, &[&str])]) -> Arc<Application> {
        Arc::new(Application {
            name: name.to_string(),
            webapp_path: PathBuf::from(format!("/var/www/{name}")),
            context_path: context.to_string(),
            vhosts: vhosts
                .iter()
                .map(|(vhost, aliases)| VirtualHost {
                    name: vhost.to_string(),
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        })
    }

    fn request_for(host: &str, path: &str) -> RequestModel {
        let mut headers = HeaderMap::new();
        headers.append("Host", host);
        let mut req =
            RequestModel::from_parts(Method::GET, path.to_string(), Version::Http11, headers);
        req.resolve_host("127.0.0.1", 8590).unwrap();
        req
    }

    #[test]
    fn test_vhost_beats_wildcard() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("a", "/a", &[("a.test", &[])]));
        resolver.register(app("b", "/b", &[]));

        // Path /b on a.test: the wildcard of app b also matches, but the
        // host entry of app a takes priority.
        let mut req = request_for("a.test", "/b");
        let resolved = resolver.resolve(&mut req).unwrap();
        assert_eq!(resolved.name, "a");
        assert_eq!(req.webapp_name(), Some("a"));
        assert_eq!(req.context_path(), "");
        assert_eq!(req.server_var("DOCUMENT_ROOT"), Some("/var/www/a"));
    }

    #[test]
    fn test_wildcard_matches_context_segment() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("b", "/b", &[]));

        let mut req = request_for("whatever.test", "/b/page");
        assert_eq!(resolver.resolve(&mut req).unwrap().name, "b");
        assert_eq!(req.context_path(), "/b");
        assert_eq!(req.relative_path(), "/page");

        let mut req = request_for("whatever.test", "/b");
        assert_eq!(resolver.resolve(&mut req).unwrap().name, "b");

        let mut req = request_for("whatever.test", "/bx");
        assert!(matches!(
            resolver.resolve(&mut req),
            Err(HttpError::ApplicationNotFound(_))
        ));
    }

    #[test]
    fn test_root_context_catches_everything() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("site", "/", &[]));

        let mut req = request_for("127.0.0.1:8590", "/index.html");
        assert_eq!(resolver.resolve(&mut req).unwrap().name, "site");
        assert_eq!(req.context_path(), "");
        assert_eq!(req.relative_path(), "/index.html");
    }

    #[test]
    fn test_alias_matches() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("shop", "/shop", &[("shop.test", &["www.shop.test"])]));

        let mut req = request_for("www.shop.test", "/cart");
        assert_eq!(resolver.resolve(&mut req).unwrap().name, "shop");
    }

    #[test]
    fn test_later_vhost_registration_wins() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("old", "/old", &[("dup.test", &[])]));
        resolver.register(app("new", "/new", &[("dup.test", &[])]));

        let mut req = request_for("dup.test", "/");
        assert_eq!(resolver.resolve(&mut req).unwrap().name, "new");
    }

    #[test]
    fn test_wildcard_order_is_registration_order() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("first", "/", &[]));
        resolver.register(app("second", "/", &[]));

        let mut req = request_for("x.test", "/anything");
        assert_eq!(resolver.resolve(&mut req).unwrap().name, "first");
    }

    #[test]
    fn test_vhost_requires_boundary() {
        let mut resolver = ApplicationResolver::new();
        resolver.register(app("a", "/a", &[("a.test", &[])]));

        let mut req = request_for("a.test.evil", "/x");
        assert!(resolver.resolve(&mut req).is_err());
    }

    #[test]
    fn test_no_match_is_application_not_found() {
        let resolver = ApplicationResolver::new();
        let mut req = request_for("nowhere.test", "/");
        let err = resolver.resolve(&mut req).unwrap_err();
        assert!(matches!(err, HttpError::ApplicationNotFound(t) if t == "nowhere.test/"));
    }
}
