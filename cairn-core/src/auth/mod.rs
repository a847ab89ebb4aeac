//! Authentication boundary for secured URL patterns.
//!
//! An application can declare secured patterns; before a handler runs, the
//! container asks the configured [`AuthenticationManager`] to clear the
//! request. A denial populates the response (typically a 401 with a
//! challenge) and the handler is never invoked.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::http::request::RequestModel;
use crate::http::response::{error_page, ResponseModel, StatusCode};
use crate::http::server_vars;

/// A URL pattern requiring authentication, with the realm presented in
/// the challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuredUrl {
    pub url_pattern: String,
    pub realm: String,
}

/// Decides whether a request may pass a secured pattern.
pub trait AuthenticationManager: Send + Sync {
    /// Return `true` to let the request through. On `false` the response
    /// must already carry the denial.
    fn authenticate(
        &self,
        request: &RequestModel,
        response: &mut ResponseModel,
        secured: &SecuredUrl,
    ) -> bool;
}

/// HTTP Basic authentication against a fixed user table.
#[derive(Debug, Default)]
pub struct BasicAuthManager {
    users: HashMap<String, String>,
}

impl BasicAuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(user.into(), password.into());
        self
    }

    fn credentials_from(&self, request: &RequestModel) -> Option<(String, String)> {
        let header = request.header("Authorization")?;
        let encoded = header.trim().strip_prefix("Basic ")?;
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl AuthenticationManager for BasicAuthManager {
    fn authenticate(
        &self,
        request: &RequestModel,
        response: &mut ResponseModel,
        secured: &SecuredUrl,
    ) -> bool {
        if let Some((user, password)) = self.credentials_from(request) {
            if self.users.get(&user).is_some_and(|stored| *stored == password) {
                log::debug!("authenticated '{}' for realm '{}'", user, secured.realm);
                return true;
            }
            log::info!("rejected credentials for '{}' in realm '{}'", user, secured.realm);
        }
        challenge(response, request, &secured.realm);
        false
    }
}

/// Populate a 401 response with the Basic challenge for `realm`.
pub fn challenge(response: &mut ResponseModel, request: &RequestModel, realm: &str) {
    response.set_status(StatusCode::Unauthorized);
    response.set_header("WWW-Authenticate", format!("Basic realm=\"{realm}\""));
    let signature = request
        .server_var(server_vars::SERVER_SOFTWARE)
        .unwrap_or("Cairn");
    response.html(error_page(
        StatusCode::Unauthorized,
        "This document requires authentication.",
        signature,
    ));
}
