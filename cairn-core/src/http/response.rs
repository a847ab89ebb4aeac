//! Response representation and body encoding.
//!
//! The status line is stored as one string so a handler can set any line it
//! wants; the numeric code is re-derived by splitting on whitespace. The
//! list of content codings the client accepts is copied in at construction
//! time, and `finalize` applies exactly one of identity, gzip or deflate
//! before the head is serialized.

use std::io::Write;

use chrono::Utc;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::http::headers::HeaderMap;
use crate::http::request::{RequestModel, Version};

/// Status codes the engine and its handlers emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    PayloadTooLarge = 413,
    InternalServerError = 500,
    NotImplemented = 501,
    ServiceUnavailable = 503,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn from_u16(code: u16) -> Option<StatusCode> {
        match code {
            200 => Some(StatusCode::Ok),
            201 => Some(StatusCode::Created),
            204 => Some(StatusCode::NoContent),
            301 => Some(StatusCode::MovedPermanently),
            302 => Some(StatusCode::Found),
            304 => Some(StatusCode::NotModified),
            400 => Some(StatusCode::BadRequest),
            401 => Some(StatusCode::Unauthorized),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            405 => Some(StatusCode::MethodNotAllowed),
            408 => Some(StatusCode::RequestTimeout),
            413 => Some(StatusCode::PayloadTooLarge),
            500 => Some(StatusCode::InternalServerError),
            501 => Some(StatusCode::NotImplemented),
            503 => Some(StatusCode::ServiceUnavailable),
            _ => None,
        }
    }
}

/// Content codings the engine can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentCoding {
    Gzip,
    Deflate,
}

impl ContentCoding {
    fn token(&self) -> &'static str {
        match self {
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
        }
    }
}

/// One outgoing response, mutated by handlers and finalized by the
/// connection loop.
#[derive(Debug)]
pub struct ResponseModel {
    version: Version,
    status_line: String,
    headers: HeaderMap,
    cookies: Vec<String>,
    content: Vec<u8>,
    accepted_encodings: Vec<String>,
    finalized: bool,
}

impl ResponseModel {
    /// Fresh response with the default header set: `Date`, `Connection:
    /// keep-alive` and `Content-Type: text/html`.
    pub fn new(version: Version) -> Self {
        let mut headers = HeaderMap::new();
        headers.append("Date", http_date());
        headers.append("Connection", "keep-alive");
        headers.append("Content-Type", "text/html");
        Self {
            version,
            status_line: format!("{} 200 OK", version.as_str()),
            headers,
            cookies: Vec::new(),
            content: Vec::new(),
            accepted_encodings: Vec::new(),
            finalized: false,
        }
    }

    /// Response initialized for a specific request: same protocol version,
    /// client's accepted codings copied in.
    pub fn for_request(request: &RequestModel) -> Self {
        let mut response = Self::new(request.version());
        response.accepted_encodings = request.accepted_encodings();
        response
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// Numeric code: second whitespace-separated token of the stored line,
    /// or zero when the line does not carry one.
    pub fn status_code(&self) -> u16 {
        self.status_line
            .split_whitespace()
            .nth(1)
            .and_then(|token| token.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status_line = format!(
            "{} {} {}",
            self.version.as_str(),
            status.as_u16(),
            status.reason()
        );
    }

    /// Replace the whole status line verbatim.
    pub fn set_status_line(&mut self, line: impl Into<String>) {
        self.status_line = line.into();
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Queue a raw `Set-Cookie` value; one line per cookie on the wire.
    pub fn add_cookie(&mut self, cookie: impl Into<String>) {
        self.cookies.push(cookie.into());
    }

    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
    }

    /// HTML body helper, keeps the default `text/html` content type.
    pub fn html(&mut self, body: impl Into<String>) {
        self.headers.set("Content-Type", "text/html");
        self.content = body.into().into_bytes();
    }

    pub fn text(&mut self, body: impl Into<String>) {
        self.headers.set("Content-Type", "text/plain");
        self.content = body.into().into_bytes();
    }

    pub fn json<T: serde::Serialize>(&mut self, value: &T) -> serde_json::Result<()> {
        self.content = serde_json::to_vec(value)?;
        self.headers.set("Content-Type", "application/json");
        Ok(())
    }

    pub fn accepted_encodings(&self) -> &[String] {
        &self.accepted_encodings
    }

    /// First accepted coding the engine supports, identity meaning none.
    fn select_coding(&self) -> Option<ContentCoding> {
        for token in &self.accepted_encodings {
            match token.as_str() {
                "gzip" => return Some(ContentCoding::Gzip),
                "deflate" => return Some(ContentCoding::Deflate),
                "identity" => return None,
                _ => continue,
            }
        }
        None
    }

    /// Apply the negotiated coding and stamp `Content-Length`.
    ///
    /// Idempotent, so error paths can call it on an already-finalized
    /// response without double-encoding. An encoder failure falls back to
    /// the identity coding.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if !self.content.is_empty() {
            if let Some(coding) = self.select_coding() {
                match apply_coding(&self.content, coding) {
                    Ok(encoded) => {
                        self.content = encoded;
                        self.headers.set("Content-Encoding", coding.token());
                    }
                    Err(err) => {
                        log::warn!("{} encoding failed, sending identity: {}", coding.token(), err)
                    }
                }
            }
        }
        self.headers
            .set("Content-Length", self.content.len().to_string());
    }

    /// Full wire form: head, blank line, body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = crate::http::codec::serialize_head(&self.status_line, &self.headers, &self.cookies);
        out.extend_from_slice(&self.content);
        out
    }
}

fn apply_coding(content: &[u8], coding: ContentCoding) -> std::io::Result<Vec<u8>> {
    match coding {
        ContentCoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(content)?;
            encoder.finish()
        }
        ContentCoding::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(content)?;
            encoder.finish()
        }
    }
}

/// Current time in RFC 1123 form, the format the `Date` header wants.
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Minimal HTML error page shared by the engine's synthesized responses.
pub fn error_page(status: StatusCode, detail: &str, signature: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n<body>\n<h1>{code} {reason}</h1>\n<p>{detail}</p>\n<hr/>\n<address>{signature}</address>\n</body>\n</html>\n",
        code = status.as_u16(),
        reason = status.reason(),
        detail = escape_html(detail),
        signature = escape_html(signature),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
