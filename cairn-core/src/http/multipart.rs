//! `multipart/form-data` body decoding.
//!
//! The body is split on `--boundary` delimiters; each block between
//! delimiters carries its own little header section. Parts with a
//! `filename` parameter become [`UploadedPart`]s, the rest are form fields
//! merged into the parameter map under the same bracket rules as query
//! parameters. Malformed blocks are skipped, not fatal; only a missing
//! boundary parameter rejects the whole body.

use crate::error::{HttpError, HttpResult};
use crate::http::query::{self, ParamMap};

/// A file part extracted from a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedPart {
    /// Form field name from `Content-Disposition`.
    pub name: String,
    /// Client-supplied file name, verbatim.
    pub filename: String,
    /// Part-level `Content-Type`, empty when the client sent none.
    pub content_type: String,
    /// Raw file bytes.
    pub content: Vec<u8>,
}

impl UploadedPart {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Extract the `boundary` parameter from a `Content-Type` value.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("boundary=") {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Decode a multipart body into form fields and uploaded files.
///
/// Fields are assigned into `params` in document order, so a later field
/// can overwrite an earlier query parameter of the same name.
pub fn parse_multipart(
    body: &[u8],
    boundary: &str,
    params: &mut ParamMap,
) -> HttpResult<Vec<UploadedPart>> {
    if boundary.is_empty() {
        return Err(HttpError::InvalidMultipartBody("empty boundary".into()));
    }
    let delimiter = format!("--{boundary}").into_bytes();
    let mut parts = Vec::new();

    let Some(first) = find(body, &delimiter, 0) else {
        return Err(HttpError::InvalidMultipartBody(format!(
            "delimiter --{boundary} not found"
        )));
    };

    let mut cursor = first + delimiter.len();
    loop {
        // `--` right after the delimiter closes the body.
        if body[cursor..].starts_with(b"--") {
            break;
        }
        let block_start = match body[cursor..].iter().position(|&b| b == b'\n') {
            Some(offset) => cursor + offset + 1,
            None => break,
        };
        let (block_end, next_cursor) = match find(body, &delimiter, block_start) {
            Some(next) => (next, next + delimiter.len()),
            None => (body.len(), body.len()),
        };
        decode_block(&body[block_start..block_end], params, &mut parts);
        if next_cursor >= body.len() {
            break;
        }
        cursor = next_cursor;
    }
    Ok(parts)
}

/// Decode one block between delimiters: part headers, blank line, content.
fn decode_block(block: &[u8], params: &mut ParamMap, parts: &mut Vec<UploadedPart>) {
    let Some(head_end) = find(block, b"\r\n\r\n", 0) else {
        log::debug!("skipping multipart block without header terminator");
        return;
    };
    let head = String::from_utf8_lossy(&block[..head_end]);
    let content = trim_trailing_crlf(&block[head_end + 4..]);

    let mut disposition = None;
    let mut content_type = String::new();
    for line in head.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("Content-Disposition") {
            disposition = Some(value.trim().to_string());
        } else if name.eq_ignore_ascii_case("Content-Type") {
            content_type = value.trim().to_string();
        }
    }

    let Some(disposition) = disposition else {
        log::debug!("skipping multipart block without Content-Disposition");
        return;
    };
    let Some(field_name) = disposition_param(&disposition, "name") else {
        log::debug!("skipping multipart block without a field name");
        return;
    };

    match disposition_param(&disposition, "filename") {
        Some(filename) => parts.push(UploadedPart {
            name: field_name,
            filename,
            content_type,
            content: content.to_vec(),
        }),
        None => {
            let value = String::from_utf8_lossy(content).into_owned();
            query::assign(params, &field_name, value);
        }
    }
}

/// Pull `name="value"` (or bare `name=value`) out of a Content-Disposition.
fn disposition_param(disposition: &str, name: &str) -> Option<String> {
    for param in disposition.split(';') {
        let param = param.trim();
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case(name) {
            return Some(value.trim().trim_matches('"').to_string());
        }
    }
    None
}

/// Drop the CRLF that separates part content from the next delimiter.
fn trim_trailing_crlf(content: &[u8]) -> &[u8] {
    content.strip_suffix(b"\r\n").unwrap_or(content)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}
