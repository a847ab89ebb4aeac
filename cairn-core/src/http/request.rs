//! Parsed request representation handed to routing and handlers.
//!
//! A [`RequestModel`] is populated in stages: the wire parser fills method,
//! URI and headers; the connection loop adds peer and host information plus
//! the body; the application resolver and servlet locator then stamp the
//! routing fields (`webapp_name`, `context_path`, `servlet_path`,
//! `path_info`) while the request travels toward its handler.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{HttpError, HttpResult};
use crate::http::headers::HeaderMap;
use crate::http::multipart::{self, UploadedPart};
use crate::http::query::{self, ParamMap};

/// CGI-style server variable names exposed to handlers.
pub mod server_vars {
    pub const DOCUMENT_ROOT: &str = "DOCUMENT_ROOT";
    pub const SERVER_NAME: &str = "SERVER_NAME";
    pub const SERVER_ADDR: &str = "SERVER_ADDR";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const SERVER_SOFTWARE: &str = "SERVER_SOFTWARE";
    pub const SERVER_ADMIN: &str = "SERVER_ADMIN";
    pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
    pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
    pub const REQUEST_URI: &str = "REQUEST_URI";
    pub const QUERY_STRING: &str = "QUERY_STRING";
    pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
    pub const REMOTE_PORT: &str = "REMOTE_PORT";
    pub const PATH_INFO: &str = "PATH_INFO";
    pub const HTTPS: &str = "HTTPS";
}

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    TRACE,
    CONNECT,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
        }
    }
}

impl FromStr for Method {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Method tokens are case-sensitive on the wire.
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            "CONNECT" => Ok(Method::CONNECT),
            other => Err(HttpError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl FromStr for Version {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/1.0" => Ok(Version::Http10),
            "HTTP/1.1" => Ok(Version::Http11),
            other => Err(HttpError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incoming request, parsed and progressively enriched.
#[derive(Debug)]
pub struct RequestModel {
    method: Method,
    uri: String,
    path: String,
    query_string: String,
    version: Version,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    params: ParamMap,
    parts: Vec<UploadedPart>,
    content: Vec<u8>,
    server_name: String,
    server_port: u16,
    client_ip: String,
    client_port: u16,
    server_vars: HashMap<String, String>,
    webapp_name: Option<String>,
    context_path: String,
    servlet_path: String,
    path_info: String,
}

impl RequestModel {
    /// Build a request from the parsed head.
    ///
    /// The path/query split happens here, as does cookie parsing and query
    /// parameter decoding. Host and peer data come later from the
    /// connection loop.
    pub fn from_parts(method: Method, uri: String, version: Version, headers: HeaderMap) -> Self {
        let (path, query_string) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (uri.clone(), String::new()),
        };
        let mut params = ParamMap::new();
        query::parse_into(&query_string, &mut params);
        let cookies = parse_cookie_header(headers.get("Cookie").unwrap_or_default());

        Self {
            method,
            uri,
            path,
            query_string,
            version,
            headers,
            cookies,
            params,
            parts: Vec::new(),
            content: Vec::new(),
            server_name: String::new(),
            server_port: 0,
            client_ip: String::new(),
            client_port: 0,
            server_vars: HashMap::new(),
            webapp_name: None,
            context_path: String::new(),
            servlet_path: String::new(),
            path_info: String::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Scalar parameter from query string, urlencoded body or multipart
    /// field, whichever assigned it last.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get_text(name)
    }

    pub fn parts(&self) -> &[UploadedPart] {
        &self.parts
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// First cookie stored under `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn client_port(&self) -> u16 {
        self.client_port
    }

    pub fn webapp_name(&self) -> Option<&str> {
        self.webapp_name.as_deref()
    }

    pub fn set_webapp_name(&mut self, name: impl Into<String>) {
        self.webapp_name = Some(name.into());
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn set_context_path(&mut self, context: impl Into<String>) {
        self.context_path = context.into();
    }

    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    pub fn set_servlet_path(&mut self, path: impl Into<String>) {
        self.servlet_path = path.into();
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn set_path_info(&mut self, info: impl Into<String>) {
        self.path_info = info.into();
    }

    /// Path inside the resolved application: the full path with the
    /// context prefix removed, never empty.
    pub fn relative_path(&self) -> &str {
        if self.context_path.is_empty() || self.context_path == "/" {
            return &self.path;
        }
        match self.path.strip_prefix(self.context_path.as_str()) {
            Some("") => "/",
            Some(rest) => rest,
            None => &self.path,
        }
    }

    pub fn server_var(&self, name: &str) -> Option<&str> {
        self.server_vars.get(name).map(String::as_str)
    }

    pub fn server_vars(&self) -> &HashMap<String, String> {
        &self.server_vars
    }

    pub fn set_server_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.server_vars.insert(name.into(), value.into());
    }

    /// Record the peer socket address.
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.client_ip = peer.ip().to_string();
        self.client_port = peer.port();
    }

    /// Derive `server_name`/`server_port` from the `Host` header.
    ///
    /// HTTP/1.1 requires the header; without it the request is rejected.
    /// HTTP/1.0 may omit it and falls back to the listener's configured
    /// host and bound port. A `Host` without a port also uses the bound
    /// port. Bracketed IPv6 authorities keep their brackets in the name.
    pub fn resolve_host(&mut self, fallback_host: &str, listener_port: u16) -> HttpResult<()> {
        let raw = match self.headers.get("Host") {
            Some(value) => value.trim().to_string(),
            None => {
                if self.version == Version::Http11 {
                    return Err(HttpError::InvalidHost("missing Host header".into()));
                }
                self.server_name = fallback_host.to_string();
                self.server_port = listener_port;
                return Ok(());
            }
        };
        if raw.is_empty() {
            return Err(HttpError::InvalidHost("empty Host header".into()));
        }

        let (name, port) = split_host_port(&raw)
            .ok_or_else(|| HttpError::InvalidHost(format!("unparsable Host: {raw:?}")))?;
        self.server_name = name.to_string();
        self.server_port = port.unwrap_or(listener_port);
        Ok(())
    }

    /// Fill the CGI-style variable set visible to handlers.
    pub fn populate_server_vars(
        &mut self,
        software: &str,
        admin: &str,
        local: Option<SocketAddr>,
        secure: bool,
    ) {
        self.set_server_var(server_vars::SERVER_SOFTWARE, software);
        self.set_server_var(server_vars::SERVER_ADMIN, admin);
        self.set_server_var(server_vars::SERVER_NAME, self.server_name.clone());
        self.set_server_var(server_vars::SERVER_PORT, self.server_port.to_string());
        if let Some(local) = local {
            self.set_server_var(server_vars::SERVER_ADDR, local.ip().to_string());
        }
        self.set_server_var(server_vars::SERVER_PROTOCOL, self.version.as_str());
        self.set_server_var(server_vars::REQUEST_METHOD, self.method.as_str());
        self.set_server_var(server_vars::REQUEST_URI, self.uri.clone());
        self.set_server_var(server_vars::QUERY_STRING, self.query_string.clone());
        self.set_server_var(server_vars::REMOTE_ADDR, self.client_ip.clone());
        self.set_server_var(server_vars::REMOTE_PORT, self.client_port.to_string());
        self.set_server_var(server_vars::HTTPS, if secure { "on" } else { "off" });
    }

    /// Attach the body and run the content-type driven enrichment.
    ///
    /// Urlencoded bodies merge into the parameter map over the query
    /// parameters; multipart bodies additionally produce uploaded parts.
    /// Any other content type keeps the raw bytes only.
    pub fn attach_body(&mut self, content: Vec<u8>) -> HttpResult<()> {
        self.content = content;
        let Some(content_type) = self.headers.get("Content-Type").map(str::to_string) else {
            return Ok(());
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/x-www-form-urlencoded" {
            let text = String::from_utf8_lossy(&self.content).into_owned();
            query::parse_into(&text, &mut self.params);
        } else if mime == "multipart/form-data" {
            let boundary = multipart::boundary_from_content_type(&content_type).ok_or_else(|| {
                HttpError::InvalidMultipartBody("missing boundary parameter".into())
            })?;
            let body = std::mem::take(&mut self.content);
            let parsed = multipart::parse_multipart(&body, &boundary, &mut self.params);
            self.content = body;
            self.parts = parsed?;
        }
        Ok(())
    }

    /// `Connection: keep-alive` (any casing) on an HTTP/1.1 request.
    pub fn wants_keep_alive(&self) -> bool {
        self.version == Version::Http11
            && self
                .headers
                .get("Connection")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("keep-alive"))
    }

    /// Content codings the client accepts, lowered and in declaration order.
    pub fn accepted_encodings(&self) -> Vec<String> {
        let Some(raw) = self.headers.get("Accept-Encoding") else {
            return Vec::new();
        };
        raw.split(',')
            .map(|token| {
                token
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase()
            })
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Session identifier from the session cookie, if the client sent one.
    pub fn session_id(&self) -> Option<&str> {
        self.cookie(crate::session::SESSION_COOKIE_NAME)
    }
}

/// Split a Host authority into name and optional port.
///
/// Returns `None` only for values with an unparsable port part.
fn split_host_port(raw: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = raw.strip_prefix('[') {
        // Bracketed IPv6: [::1] or [::1]:8080
        let close = rest.find(']')?;
        let name = &raw[..close + 2];
        let after = &rest[close + 1..];
        if after.is_empty() {
            return Some((name, None));
        }
        let port = after.strip_prefix(':')?.parse::<u16>().ok()?;
        return Some((name, Some(port)));
    }
    match raw.rsplit_once(':') {
        // More than one colon without brackets: a bare IPv6 literal.
        Some((name, _)) if name.contains(':') => Some((raw, None)),
        Some((name, port)) => {
            let port = port.parse::<u16>().ok()?;
            Some((name, Some(port)))
        }
        None => Some((raw, None)),
    }
}

/// `Cookie` header parsing: `;`-separated pairs, split on the first `=`.
/// Entries without `=` are dropped; values are kept verbatim.
fn parse_cookie_header(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_headers(pairs: &[(&str, &str)]) -> RequestModel {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, *value);
        }
        RequestModel::from_parts(
            Method::GET,
            "/shop/list?cat=stones&page=2".to_string(),
            Version::Http11,
            headers,
        )
    }

    #[test]
    fn test_path_query_split_and_params() {
        let req = request_with_headers(&[("Host", "a.test")]);
        assert_eq!(req.path(), "/shop/list");
        assert_eq!(req.query_string(), "cat=stones&page=2");
        assert_eq!(req.param("cat"), Some("stones"));
        assert_eq!(req.param("page"), Some("2"));
    }

    #[test]
    fn test_resolve_host_with_port() {
        let mut req = request_with_headers(&[("Host", "shop.example.test:8080")]);
        req.resolve_host("127.0.0.1", 8590).unwrap();
        assert_eq!(req.server_name(), "shop.example.test");
        assert_eq!(req.server_port(), 8080);
    }

    #[test]
    fn test_resolve_host_defaults_port() {
        let mut req = request_with_headers(&[("Host", "shop.example.test")]);
        req.resolve_host("127.0.0.1", 8590).unwrap();
        assert_eq!(req.server_port(), 8590);
    }

    #[test]
    fn test_resolve_host_ipv6() {
        let mut req = request_with_headers(&[("Host", "[::1]:9000")]);
        req.resolve_host("127.0.0.1", 8590).unwrap();
        assert_eq!(req.server_name(), "[::1]");
        assert_eq!(req.server_port(), 9000);
    }

    #[test]
    fn test_missing_host_http11_rejected() {
        let mut req = request_with_headers(&[]);
        assert!(matches!(
            req.resolve_host("127.0.0.1", 8590),
            Err(HttpError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_missing_host_http10_falls_back() {
        let mut headers = HeaderMap::new();
        headers.append("Accept", "*/*");
        let mut req =
            RequestModel::from_parts(Method::GET, "/".to_string(), Version::Http10, headers);
        req.resolve_host("192.168.1.5", 8591).unwrap();
        assert_eq!(req.server_name(), "192.168.1.5");
        assert_eq!(req.server_port(), 8591);
    }

    #[test]
    fn test_cookie_parsing() {
        let req = request_with_headers(&[
            ("Host", "a.test"),
            ("Cookie", "PHPSESSID=abc123; theme=dark; broken; x=a=b"),
        ]);
        assert_eq!(req.cookie("PHPSESSID"), Some("abc123"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("x"), Some("a=b"));
        assert_eq!(req.cookie("broken"), None);
        assert_eq!(req.session_id(), Some("abc123"));
    }

    #[test]
    fn test_urlencoded_body_merges_over_query() {
        let mut req = request_with_headers(&[
            ("Host", "a.test"),
            ("Content-Type", "application/x-www-form-urlencoded; charset=utf-8"),
        ]);
        req.attach_body(b"cat=gravel&extra=1".to_vec()).unwrap();
        assert_eq!(req.param("cat"), Some("gravel"));
        assert_eq!(req.param("page"), Some("2"));
        assert_eq!(req.param("extra"), Some("1"));
        assert_eq!(req.content(), b"cat=gravel&extra=1");
    }

    #[test]
    fn test_multipart_without_boundary_rejected() {
        let mut req =
            request_with_headers(&[("Host", "a.test"), ("Content-Type", "multipart/form-data")]);
        let err = req.attach_body(b"anything".to_vec()).unwrap_err();
        assert!(matches!(err, HttpError::InvalidMultipartBody(_)));
    }

    #[test]
    fn test_opaque_body_kept_raw() {
        let mut req = request_with_headers(&[
            ("Host", "a.test"),
            ("Content-Type", "application/octet-stream"),
        ]);
        req.attach_body(vec![1, 2, 3]).unwrap();
        assert_eq!(req.content(), &[1, 2, 3]);
        assert_eq!(req.param("cat"), Some("stones"));
    }

    #[test]
    fn test_keep_alive_detection() {
        let req = request_with_headers(&[("Host", "a.test"), ("Connection", "Keep-Alive")]);
        assert!(req.wants_keep_alive());
        let req = request_with_headers(&[("Host", "a.test"), ("Connection", "close")]);
        assert!(!req.wants_keep_alive());
        let mut headers = HeaderMap::new();
        headers.append("Connection", "keep-alive");
        let req =
            RequestModel::from_parts(Method::GET, "/".to_string(), Version::Http10, headers);
        assert!(!req.wants_keep_alive());
    }

    #[test]
    fn test_accepted_encodings() {
        let req = request_with_headers(&[
            ("Host", "a.test"),
            ("Accept-Encoding", "br;q=1.0, GZIP, deflate;q=0.5"),
        ]);
        assert_eq!(req.accepted_encodings(), vec!["br", "gzip", "deflate"]);
    }

    #[test]
    fn test_relative_path() {
        let mut req = request_with_headers(&[("Host", "a.test")]);
        assert_eq!(req.relative_path(), "/shop/list");
        req.set_context_path("/shop");
        assert_eq!(req.relative_path(), "/list");
        req.set_context_path("/shop/list");
        assert_eq!(req.relative_path(), "/");
    }
}
