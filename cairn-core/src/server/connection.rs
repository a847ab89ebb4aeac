//! Per-connection request loop.
//!
//! One handler owns one accepted socket and drives it through sequential
//! request/response cycles until the keep-alive budget, the receive window
//! or the client ends the connection. Protocol and routing failures are
//! converted into error responses here while the socket is still writable;
//! transport failures close silently. Nothing propagates past this module,
//! so one connection's failure never reaches another.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::container::Container;
use crate::error::{HttpError, HttpResult};
use crate::http::body;
use crate::http::codec;
use crate::http::request::{Method, RequestModel};
use crate::http::response::{error_page, ResponseModel, StatusCode};
use crate::http::Version;
use crate::server::transport::Transport;

/// Read size while hunting for the head terminator.
const READ_CHUNK: usize = 8 * 1024;

/// Mutable per-connection bookkeeping.
struct ConnectionState {
    peer: SocketAddr,
    local: Option<SocketAddr>,
    secure: bool,
    opened: Instant,
    served: u32,
    /// Bytes read past the current request, owned by the next one.
    spill: Vec<u8>,
}

/// Serves every request one accepted socket carries.
pub struct ConnectionHandler {
    container: Arc<Container>,
    config: Arc<ServerConfig>,
}

impl ConnectionHandler {
    pub fn new(container: Arc<Container>, config: Arc<ServerConfig>) -> Self {
        Self { container, config }
    }

    /// Drive the connection to completion, then shut the socket down.
    pub fn handle<T: Transport>(&self, transport: &mut T) {
        let peer = match transport.peer_addr() {
            Ok(addr) => addr,
            Err(err) => {
                log::debug!("accepted socket without peer address: {err}");
                return;
            }
        };
        // A stalled peer must not wedge the worker on either side of the
        // socket: reads and writes both run under the receive window.
        let window = Some(self.receive_window());
        if let Err(err) = transport
            .set_read_timeout(window)
            .and_then(|()| transport.set_write_timeout(window))
        {
            log::debug!("failed to arm socket timeouts for {peer}: {err}");
            return;
        }

        let mut state = ConnectionState {
            peer,
            local: transport.local_addr().ok(),
            secure: transport.is_secure(),
            opened: Instant::now(),
            served: 0,
            spill: Vec::new(),
        };

        loop {
            match self.serve_one(transport, &mut state) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(err) => {
                    self.send_error_response(transport, &err);
                    break;
                }
            }
        }

        if let Err(err) = transport.shutdown() {
            log::debug!("shutdown failed for {peer}: {err}");
        }
        log::debug!(
            "connection from {} closed after {} request(s)",
            peer,
            state.served
        );
    }

    fn receive_window(&self) -> Duration {
        Duration::from_secs(self.config.receive_timeout.max(1))
    }

    /// One request/response cycle. `Ok(true)` keeps the connection open.
    fn serve_one<T: Transport>(
        &self,
        transport: &mut T,
        state: &mut ConnectionState,
    ) -> HttpResult<bool> {
        let started = Instant::now();
        let (head, overread) = read_head(transport, std::mem::take(&mut state.spill))?;
        let (method, uri, version, headers) = codec::parse_head(&head)?;
        let mut request = RequestModel::from_parts(method, uri, version, headers);
        request.set_peer(state.peer);
        let bound_port = state
            .local
            .map(|addr| addr.port())
            .unwrap_or(self.config.port);
        request.resolve_host(&self.config.host, bound_port)?;
        request.populate_server_vars(
            &self.config.software,
            &self.config.admin,
            state.local,
            state.secure,
        );

        let declared = body::content_length(request.headers())?;
        let mut content = body::read_body(
            transport,
            request.headers(),
            overread,
            self.config.max_body_size,
        )?;
        if let Some(length) = declared {
            if content.len() > length {
                // Bytes past the declared body already belong to the next request.
                state.spill = content.split_off(length);
            }
        }
        request.attach_body(content)?;

        state.served += 1;
        let elapsed = state.opened.elapsed();
        let negotiated = request.wants_keep_alive() && elapsed < self.receive_window();
        let keep = negotiated && state.served < self.config.keep_alive_max;

        let mut response = ResponseModel::for_request(&request);
        response.set_header("Server", self.config.software.as_str());
        self.container.dispatch(&mut request, &mut response)?;

        if negotiated && state.served == self.config.keep_alive_max {
            // Budget exhausted on this very request; announce it to the client.
            let remaining = self.config.keep_alive_max - state.served;
            let seconds_left = self.receive_window().saturating_sub(elapsed).as_secs();
            response.set_header("Keep-Alive", format!("max={remaining}, timeout={seconds_left}"));
        }
        if !keep {
            response.set_header("Connection", "close");
        }
        response.finalize();
        log_access(&request, &response, started);
        write_response(transport, &request, &response)?;
        Ok(keep)
    }

    /// Convert a failure into a best-effort error response.
    ///
    /// Transport failures get no response at all. For everything else the
    /// socket may still be writable, so a minimal page goes out before the
    /// close; a failed write is itself only worth a debug line.
    fn send_error_response<T: Transport>(&self, transport: &mut T, err: &HttpError) {
        let Some(code) = err.response_status() else {
            log::debug!("connection ended: {err}");
            return;
        };
        if code >= 500 || code == 404 {
            log::error!("{err}");
        } else {
            log::warn!("{err}");
        }

        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::InternalServerError);
        let mut response = ResponseModel::new(Version::Http11);
        response.set_status(status);
        response.set_header("Server", self.config.software.as_str());
        response.set_header("Connection", "close");
        response.html(error_page(status, &err.to_string(), &self.config.software));
        response.finalize();
        if let Err(write_err) = transport
            .write_all(&response.to_bytes())
            .and_then(|()| transport.flush())
        {
            log::debug!("failed to write {code} response: {write_err}");
        }
    }
}

/// One JSON access entry per served request.
fn log_access(request: &RequestModel, response: &ResponseModel, started: Instant) {
    let len = response.header("Content-Length").unwrap_or("-");
    let enc = response.header("Content-Encoding").unwrap_or("identity");
    log::info!(
        "{{\"remote\":\"{}\",\"method\":\"{}\",\"path\":\"{}\",\"status\":{},\"len\":\"{}\",\"enc\":\"{}\",\"dur_ms\":{}}}",
        escape_json_value(request.client_ip()),
        request.method(),
        escape_json_value(request.uri()),
        response.status_code(),
        len,
        enc,
        started.elapsed().as_millis()
    );
}

/// Escape quotes, backslashes and control characters for the access entry.
fn escape_json_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Accumulate bytes until the head terminator.
///
/// Returns the head (terminator included) and whatever was read past it.
/// `buf` carries bytes spilled over from the previous request, which may
/// already contain a complete head.
fn read_head<T: Transport>(transport: &mut T, mut buf: Vec<u8>) -> HttpResult<(Vec<u8>, Vec<u8>)> {
    if let Some(end) = codec::find_head_end(&buf) {
        let rest = buf.split_off(end);
        return Ok((buf, rest));
    }
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let read = transport
            .read(&mut chunk)
            .map_err(HttpError::from_stream_error)?;
        if read == 0 {
            return Err(HttpError::ConnectionClosedByPeer);
        }
        buf.extend_from_slice(&chunk[..read]);
        if let Some(end) = codec::find_head_end(&buf) {
            let rest = buf.split_off(end);
            return Ok((buf, rest));
        }
        if buf.len() > codec::MAX_HEAD_BYTES {
            return Err(HttpError::MalformedHeader(format!(
                "request head exceeds {} bytes",
                codec::MAX_HEAD_BYTES
            )));
        }
    }
}

/// Serialize and send. HEAD responses keep their headers but drop the body.
fn write_response<T: Transport>(
    transport: &mut T,
    request: &RequestModel,
    response: &ResponseModel,
) -> HttpResult<()> {
    let mut bytes =
        codec::serialize_head(response.status_line(), response.headers(), response.cookies());
    if request.method() != Method::HEAD {
        bytes.extend_from_slice(response.content());
    }
    transport
        .write_all(&bytes)
        .and_then(|()| transport.flush())
        .map_err(HttpError::from_stream_error)
}
