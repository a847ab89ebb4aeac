//! The container: deployed applications and the dispatch path.
//!
//! `deploy` turns the declarative configuration into frozen routing
//! tables; `dispatch` walks them for one request: resolve the
//! application, locate the handler, clear any secured pattern, run the
//! handler. Everything the container holds after deployment is immutable,
//! so connection threads share it without locks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;

use crate::auth::{self, AuthenticationManager, SecuredUrl};
use crate::config::DeployConfig;
use crate::error::{HttpError, HttpResult};
use crate::handler::{HandlerRegistry, STATIC_HANDLER};
use crate::http::request::RequestModel;
use crate::http::response::ResponseModel;
use crate::routing::{Application, ApplicationResolver, GlobPattern, ServletLocator, VirtualHost};
use crate::session::SessionStore;

/// One application after deployment: descriptor plus compiled tables.
pub struct DeployedApplication {
    pub descriptor: Arc<Application>,
    pub locator: ServletLocator,
    secured: Vec<(GlobPattern, SecuredUrl)>,
}

/// Shared, read-only runtime state of a server.
pub struct Container {
    resolver: ApplicationResolver,
    apps: HashMap<String, DeployedApplication>,
    registry: HandlerRegistry,
    sessions: Arc<dyn SessionStore>,
    auth: Option<Arc<dyn AuthenticationManager>>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("apps", &self.apps.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Build the routing tables from configuration.
    ///
    /// Every application's locator starts with the shared static-extension
    /// mappings, then its own mappings in declaration order. A mapping
    /// referencing a handler the registry does not know is a deployment
    /// error, not a runtime 404.
    pub fn deploy(
        deploy: &DeployConfig,
        registry: HandlerRegistry,
        sessions: Arc<dyn SessionStore>,
        auth: Option<Arc<dyn AuthenticationManager>>,
    ) -> anyhow::Result<Self> {
        deploy.validate()?;

        let mut resolver = ApplicationResolver::new();
        let mut apps = HashMap::new();
        for app_config in &deploy.applications {
            let descriptor = Arc::new(Application {
                name: app_config.name.clone(),
                webapp_path: PathBuf::from(&app_config.webapp_path),
                context_path: app_config.context_path(),
                vhosts: app_config
                    .vhosts
                    .iter()
                    .map(|vhost| VirtualHost {
                        name: vhost.name.clone(),
                        aliases: vhost.aliases.clone(),
                    })
                    .collect(),
            });

            let mut locator = ServletLocator::new();
            for extension in &deploy.static_extensions {
                locator.add_mapping(&format!("*.{extension}"), STATIC_HANDLER);
            }
            for mapping in &app_config.servlet_mappings {
                locator.add_mapping(&mapping.url_pattern, &mapping.handler);
            }
            for handler in locator.handler_names() {
                if !registry.contains(handler) {
                    bail!(
                        "application '{}' maps to unknown handler '{}'",
                        app_config.name,
                        handler
                    );
                }
            }

            let secured = app_config
                .secured_urls
                .iter()
                .map(|secured| (GlobPattern::compile(&secured.url_pattern), secured.clone()))
                .collect();

            log::info!(
                "deployed application '{}' (context '{}', {} vhosts, {} mappings)",
                app_config.name,
                descriptor.context_path,
                descriptor.vhosts.len(),
                locator.len()
            );
            resolver.register(Arc::clone(&descriptor));
            apps.insert(
                app_config.name.clone(),
                DeployedApplication {
                    descriptor,
                    locator,
                    secured,
                },
            );
        }

        Ok(Self {
            resolver,
            apps,
            registry,
            sessions,
            auth,
        })
    }

    pub fn application_count(&self) -> usize {
        self.apps.len()
    }

    pub fn application(&self, name: &str) -> Option<&DeployedApplication> {
        self.apps.get(name)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Route one request and run its handler.
    ///
    /// On `Ok` the response is populated, possibly with an authentication
    /// denial instead of handler output. Routing misses and handler
    /// failures come back as errors for the connection loop to convert.
    pub fn dispatch(
        &self,
        request: &mut RequestModel,
        response: &mut ResponseModel,
    ) -> HttpResult<()> {
        let app = self.resolver.resolve(request)?;
        let deployed = self
            .apps
            .get(&app.name)
            .ok_or_else(|| HttpError::ApplicationNotFound(app.name.clone()))?;

        let handler_name = deployed.locator.locate_for(request)?.to_string();

        let relative = request.relative_path().to_string();
        for (pattern, secured) in &deployed.secured {
            if !pattern.matches(&relative) {
                continue;
            }
            match &self.auth {
                Some(auth) => {
                    if !auth.authenticate(request, response, secured) {
                        log::info!(
                            "denied {} {} (realm '{}')",
                            request.method(),
                            request.path(),
                            secured.realm
                        );
                        return Ok(());
                    }
                }
                None => {
                    log::warn!(
                        "secured pattern '{}' matched but no authentication manager is configured",
                        secured.url_pattern
                    );
                    auth::challenge(response, request, &secured.realm);
                    return Ok(());
                }
            }
            // First matching secured pattern decides.
            break;
        }

        let handler = self
            .registry
            .get(&handler_name)
            .ok_or_else(|| HttpError::HandlerNotFound(handler_name.clone()))?;
        handler
            .service(request, response)
            .map_err(|source| HttpError::HandlerFailed {
                name: handler_name,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, MappingConfig, VhostConfig};
    use crate::handler::FnHandler;
    use crate::http::headers::HeaderMap;
    use crate::http::request::{Method, Version};
    use crate::session::MemorySessionStore;

    fn deploy_config(apps: Vec<AppConfig>) -> DeployConfig {
        DeployConfig {
            applications: apps,
            ..Default::default()
        }
    }

    fn app(name: &str, context: Option<&str>, vhost: Option<&str>) -> AppConfig {
        AppConfig {
            name: name.to_string(),
            webapp_path: format!("/var/www/{name}"),
            context: context.map(String::from),
            vhosts: vhost
                .map(|v| {
                    vec![VhostConfig {
                        name: v.to_string(),
                        aliases: Vec::new(),
                    }]
                })
                .unwrap_or_default(),
            servlet_mappings: vec![MappingConfig {
                url_pattern: "/hello".to_string(),
                handler: "hello".to_string(),
            }],
            secured_urls: Vec::new(),
        }
    }

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "hello",
            Arc::new(FnHandler::new(|req: &mut RequestModel, resp: &mut ResponseModel| {
                resp.text(format!("hello from {}", req.webapp_name().unwrap_or("?")));
                Ok(())
            })),
        );
        registry.register(
            "static",
            Arc::new(FnHandler::new(|_req: &mut RequestModel, resp: &mut ResponseModel| {
                resp.text("static");
                Ok(())
            })),
        );
        registry.register(
            "boom",
            Arc::new(FnHandler::new(|_req: &mut RequestModel, _resp: &mut ResponseModel| {
                anyhow::bail!("backend exploded")
            })),
        );
        registry
    }

    fn container(apps: Vec<AppConfig>) -> Container {
        Container::deploy(
            &deploy_config(apps),
            registry(),
            Arc::new(MemorySessionStore::new()),
            None,
        )
        .unwrap()
    }

    fn request(host: &str, path: &str) -> RequestModel {
        let mut headers = HeaderMap::new();
        headers.append("Host", host);
        let mut req =
            RequestModel::from_parts(Method::GET, path.to_string(), Version::Http11, headers);
        req.resolve_host("127.0.0.1", 8590).unwrap();
        req
    }

    #[test]
    fn test_dispatch_end_to_end() {
        let container = container(vec![app("site", Some("/"), None)]);
        let mut req = request("anything.test", "/hello");
        let mut resp = ResponseModel::for_request(&req);
        container.dispatch(&mut req, &mut resp).unwrap();
        assert_eq!(resp.content(), b"hello from site");
    }

    #[test]
    fn test_dispatch_unknown_app() {
        let container = container(vec![app("shop", None, Some("shop.test"))]);
        let mut req = request("other.test", "/x");
        let mut resp = ResponseModel::for_request(&req);
        let err = container.dispatch(&mut req, &mut resp).unwrap_err();
        assert!(matches!(err, HttpError::ApplicationNotFound(_)));
    }

    #[test]
    fn test_dispatch_unknown_path() {
        let container = container(vec![app("site", Some("/"), None)]);
        let mut req = request("x.test", "/missing");
        let mut resp = ResponseModel::for_request(&req);
        let err = container.dispatch(&mut req, &mut resp).unwrap_err();
        assert!(matches!(err, HttpError::HandlerNotFound(_)));
    }

    #[test]
    fn test_handler_failure_is_wrapped() {
        let mut failing = app("site", Some("/"), None);
        failing.servlet_mappings = vec![MappingConfig {
            url_pattern: "/hello".to_string(),
            handler: "boom".to_string(),
        }];
        let container = container(vec![failing]);
        let mut req = request("x.test", "/hello");
        let mut resp = ResponseModel::for_request(&req);
        let err = container.dispatch(&mut req, &mut resp).unwrap_err();
        match err {
            HttpError::HandlerFailed { name, source } => {
                assert_eq!(name, "boom");
                assert!(source.to_string().contains("backend exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_handler_rejected_at_deploy() {
        let mut bad = app("site", Some("/"), None);
        bad.servlet_mappings = vec![MappingConfig {
            url_pattern: "/x".to_string(),
            handler: "ghost".to_string(),
        }];
        let err = Container::deploy(
            &deploy_config(vec![bad]),
            registry(),
            Arc::new(MemorySessionStore::new()),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown handler 'ghost'"));
    }

    #[test]
    fn test_static_extension_mapping_comes_first() {
        let mut custom = app("site", Some("/"), None);
        custom.servlet_mappings = vec![MappingConfig {
            url_pattern: "*.html".to_string(),
            handler: "hello".to_string(),
        }];
        let container = container(vec![custom]);
        let mut req = request("x.test", "/page.html");
        let mut resp = ResponseModel::for_request(&req);
        container.dispatch(&mut req, &mut resp).unwrap();
        // The shared *.html mapping wins over the app's own.
        assert_eq!(resp.content(), b"static");
    }

    #[test]
    fn test_secured_url_without_manager_is_denied() {
        let mut secured_app = app("site", Some("/"), None);
        secured_app.secured_urls = vec![SecuredUrl {
            url_pattern: "/hello".to_string(),
            realm: "vault".to_string(),
        }];
        let container = container(vec![secured_app]);
        let mut req = request("x.test", "/hello");
        let mut resp = ResponseModel::for_request(&req);
        container.dispatch(&mut req, &mut resp).unwrap();
        assert_eq!(resp.status_code(), 401);
    }

    #[test]
    fn test_secured_url_with_basic_auth() {
        use crate::auth::BasicAuthManager;
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine as _;

        let mut secured_app = app("site", Some("/"), None);
        secured_app.secured_urls = vec![SecuredUrl {
            url_pattern: "/hello".to_string(),
            realm: "vault".to_string(),
        }];
        let container = Container::deploy(
            &deploy_config(vec![secured_app]),
            registry(),
            Arc::new(MemorySessionStore::new()),
            Some(Arc::new(BasicAuthManager::new().with_user("u", "p"))),
        )
        .unwrap();

        let mut req = request("x.test", "/hello");
        let mut resp = ResponseModel::for_request(&req);
        container.dispatch(&mut req, &mut resp).unwrap();
        assert_eq!(resp.status_code(), 401);

        let mut headers = HeaderMap::new();
        headers.append("Host", "x.test");
        headers.append(
            "Authorization",
            format!("Basic {}", BASE64.encode("u:p")),
        );
        let mut req =
            RequestModel::from_parts(Method::GET, "/hello".to_string(), Version::Http11, headers);
        req.resolve_host("127.0.0.1", 8590).unwrap();
        let mut resp = ResponseModel::for_request(&req);
        container.dispatch(&mut req, &mut resp).unwrap();
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.content(), b"hello from site");
    }
}
