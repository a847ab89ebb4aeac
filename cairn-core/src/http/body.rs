//! Content-Length driven body collection.
//!
//! The connection loop usually over-reads while hunting for the head
//! terminator; whatever spilled past it is handed in as `buffered` and
//! counts toward the body before any further socket read happens.

use std::io::Read;

use crate::error::{HttpError, HttpResult};
use crate::http::headers::HeaderMap;

/// Upper bound for a single socket read while collecting a body.
const READ_CHUNK: usize = 8 * 1024;

/// Declared body length, if any.
///
/// A `Content-Length` that does not parse as an unsigned integer is a
/// protocol error, not an absent body.
pub fn content_length(headers: &HeaderMap) -> HttpResult<Option<usize>> {
    match headers.get("Content-Length") {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| HttpError::MalformedHeader(format!("Content-Length: {raw}"))),
    }
}

/// Collect the request body announced by `Content-Length`.
///
/// Without the header, whatever spilled past the head is the body: the
/// buffered bytes are returned unchanged and the socket is not touched.
/// With the header, reads continue until at least `length` bytes are
/// buffered; each read asks for at most the bytes still missing, and bytes
/// already buffered beyond the declared length are never truncated.
pub fn read_body<R: Read>(
    stream: &mut R,
    headers: &HeaderMap,
    buffered: Vec<u8>,
    max_body_size: usize,
) -> HttpResult<Vec<u8>> {
    let Some(length) = content_length(headers)? else {
        return Ok(buffered);
    };
    if length > max_body_size {
        return Err(HttpError::BodyTooLarge(length));
    }

    let mut body = buffered;
    let mut chunk = [0u8; READ_CHUNK];
    while body.len() < length {
        let want = (length - body.len()).min(READ_CHUNK);
        let read = stream
            .read(&mut chunk[..want])
            .map_err(HttpError::from_stream_error)?;
        if read == 0 {
            return Err(HttpError::ConnectionClosedByPeer);
        }
        body.extend_from_slice(&chunk[..read]);
    }
    Ok(body)
}
