//! Cairn - Core
//!
//! An embedded application server: a socket-up HTTP/1.1 engine that routes
//! requests by virtual host and URL pattern to pluggable handlers.
//!
//! # Overview
//!
//! Cairn parses HTTP straight off the accepted socket - request line,
//! headers, Content-Length bodies, urlencoded and multipart payloads - and
//! carries each request through two routing tiers: an application resolver
//! (virtual hosts and aliases first, wildcard-by-name as fallback) and a
//! servlet locator (ordered glob patterns with `(a|b)` alternation). Every
//! connection honors the HTTP/1.1 keep-alive contract with a per-connection
//! request budget and receive window.
//!
//! # Quick Start
//!
//! Add `cairn-core` to your `Cargo.toml`:
//!
//! ```toml,ignore
//! [dependencies]
//! cairn-core = "0.1"
//! ```
//!
//! Then deploy an application and start serving:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cairn_core::config::{AppConfig, CairnConfig, MappingConfig};
//! use cairn_core::handler::FnHandler;
//! use cairn_core::CairnServer;
//!
//! fn main() -> anyhow::Result<()> {
//!     cairn_core::logging::init();
//!     let config = CairnConfig::load()?;
//!     CairnServer::new(config)
//!         .with_application(AppConfig {
//!             name: "site".to_string(),
//!             webapp_path: "./webapps/site".to_string(),
//!             context: Some("/".to_string()),
//!             vhosts: Vec::new(),
//!             servlet_mappings: vec![MappingConfig {
//!                 url_pattern: "/hello".to_string(),
//!                 handler: "hello".to_string(),
//!             }],
//!             secured_urls: Vec::new(),
//!         })
//!         .with_handler("hello", Arc::new(FnHandler::new(|_req, resp| {
//!             resp.html("<h1>hello</h1>");
//!             Ok(())
//!         })))
//!         .serve()
//! }
//! ```
//!
//! # Architecture
//!
//! - [`http`] - wire codec, request/response models, query and multipart parsing
//! - [`routing`] - application resolver (tier 1) and servlet locator (tier 2)
//! - [`handler`] - the `Handler` contract, registry and built-in static file serving
//! - [`container`] - deployed applications and the dispatch path
//! - [`server`] - connection loop, accept workers and the TLS transport
//! - [`session`] - `PHPSESSID` cookie sessions over a pluggable store
//! - [`auth`] - secured URL patterns and HTTP Basic authentication
//! - [`config`] - TOML configuration with environment overrides

pub mod auth;
pub mod config; // Configuration system with TOML support
pub mod container;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging; // env_logger bootstrap behind the log facade
pub mod routing;
pub mod server;
pub mod session; // PHPSESSID sessions over a pluggable store

// Re-exports of main types and traits
pub use config::CairnConfig;
pub use container::Container;
pub use error::{HttpError, HttpResult};
pub use handler::{FnHandler, Handler, HandlerRegistry};
pub use http::{RequestModel, ResponseModel, StatusCode};
pub use server::{BoundServer, CairnServer};
