//! Wire-level parser and serializer for HTTP/1.1 message heads.
//!
//! Parsing is line oriented: the request line must split on single spaces
//! into exactly three tokens, header lines split on the first `:`, and a
//! blank line ends the head. Serialization writes the status line, headers
//! in insertion order, one `Set-Cookie` line per pending cookie and the
//! terminating blank line.

use crate::error::{HttpError, HttpResult};
use crate::http::headers::HeaderMap;
use crate::http::request::{Method, Version};

/// `\r\n\r\n`, the end-of-head marker.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Maximum accepted size of a request head, in bytes.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Locate the end of the head section in a raw read buffer.
///
/// Returns the index just past the `\r\n\r\n` terminator, so
/// `buf[..index]` is the head (terminator included) and `buf[index..]`
/// is body spill-over.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

/// Parse `METHOD SP URI SP VERSION`.
///
/// The split is on single spaces: a doubled space produces an empty token
/// and the line is rejected, matching the strictness of the grammar rather
/// than a whitespace-collapsing scan.
pub fn parse_request_line(line: &str) -> HttpResult<(Method, String, Version)> {
    let line = line.trim_end_matches('\r');
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() != 3 || tokens.iter().any(|t| t.is_empty()) {
        return Err(HttpError::MalformedRequestLine(line.to_string()));
    }
    let method = tokens[0].parse::<Method>()?;
    let version = tokens[2].parse::<Version>()?;
    Ok((method, tokens[1].to_string(), version))
}

/// Parse the header lines that follow the request line.
///
/// `raw` is everything after the first `\n` of the head. Lines split on the
/// first `:`; names and values are trimmed, original casing is preserved.
/// A blank line stops the scan; a non-blank line without `:` is an error.
pub fn parse_headers(raw: &str) -> HttpResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for line in raw.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(HttpError::MalformedHeader(line.to_string()));
        };
        headers.append(name.trim(), value.trim());
    }
    Ok(headers)
}

/// Split a head buffer into request line and header block, then parse both.
pub fn parse_head(head: &[u8]) -> HttpResult<(Method, String, Version, HeaderMap)> {
    let text = String::from_utf8_lossy(head);
    let (request_line, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (text.as_ref(), ""),
    };
    let (method, uri, version) = parse_request_line(request_line)?;
    let headers = parse_headers(rest)?;
    Ok((method, uri, version, headers))
}

/// Serialize a response head.
///
/// Cookies are emitted after the regular headers, one `Set-Cookie` line
/// each, so several cookies can coexist on one response.
pub fn serialize_head(status_line: &str, headers: &HeaderMap, cookies: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(status_line.as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    for cookie in cookies {
        out.extend_from_slice(b"Set-Cookie: ");
        out.extend_from_slice(cookie.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}
