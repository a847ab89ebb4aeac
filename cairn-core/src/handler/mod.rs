//! Handler abstraction and registry.
//!
//! A handler receives the fully routed request and mutates the response;
//! the connection loop owns serialization, encoding and keep-alive
//! bookkeeping. Handlers are registered under a name and referenced by
//! that name from servlet mappings, so one handler instance can serve many
//! patterns across applications.

pub mod static_files;

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::request::RequestModel;
use crate::http::response::ResponseModel;

pub use static_files::{FileLookup, StaticFileHandler};

/// Registry name of the built-in static file handler.
pub const STATIC_HANDLER: &str = "static";

/// Application-level request processing.
///
/// Implementations run on the connection thread and must be shareable
/// across threads. Returning an error converts the whole exchange into a
/// 500 response.
pub trait Handler: Send + Sync {
    fn service(
        &self,
        request: &mut RequestModel,
        response: &mut ResponseModel,
    ) -> anyhow::Result<()>;
}

/// Adapter turning a closure into a [`Handler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&mut RequestModel, &mut ResponseModel) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestModel, &mut ResponseModel) -> anyhow::Result<()> + Send + Sync,
{
    fn service(
        &self,
        request: &mut RequestModel,
        response: &mut ResponseModel,
    ) -> anyhow::Result<()> {
        (self.0)(request, response)
    }
}

/// Name-to-handler table shared by all applications of a server.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one of the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::HeaderMap;
    use crate::http::request::{Method, Version};

    fn request() -> RequestModel {
        let mut headers = HeaderMap::new();
        headers.append("Host", "a.test");
        RequestModel::from_parts(Method::GET, "/".to_string(), Version::Http11, headers)
    }

    #[test]
    fn test_fn_handler_runs() {
        let handler = FnHandler::new(|req: &mut RequestModel, resp: &mut ResponseModel| {
            resp.text(format!("method={}", req.method()));
            Ok(())
        });
        let mut req = request();
        let mut resp = ResponseModel::for_request(&req);
        handler.service(&mut req, &mut resp).unwrap();
        assert_eq!(resp.content(), b"method=GET");
    }

    #[test]
    fn test_registry_replaces_on_same_name() {
        let mut registry = HandlerRegistry::new();
        registry.register("h", Arc::new(FnHandler::new(|_req, resp| {
            resp.text("one");
            Ok(())
        })));
        registry.register("h", Arc::new(FnHandler::new(|_req, resp| {
            resp.text("two");
            Ok(())
        })));
        assert_eq!(registry.len(), 1);

        let mut req = request();
        let mut resp = ResponseModel::for_request(&req);
        registry.get("h").unwrap().service(&mut req, &mut resp).unwrap();
        assert_eq!(resp.content(), b"two");
    }

    #[test]
    fn test_registry_miss() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("nope").is_none());
        assert!(!registry.contains("nope"));
    }
}
