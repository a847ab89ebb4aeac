//! Document-root file serving.
//!
//! Serves files relative to the resolved application's `DOCUMENT_ROOT`.
//! Directory requests without a trailing slash redirect to the slashed
//! form; with the slash, the welcome file list is probed. Lookup failures
//! of any kind surface as 404; the handler itself does not error for
//! missing or unreadable files.

use std::path::{Path, PathBuf};

use crate::http::query::percent_decode;
use crate::http::request::{server_vars, RequestModel};
use crate::http::response::{error_page, ResponseModel, StatusCode};

use super::Handler;

/// Outcome of resolving a request path against a document root.
#[derive(Debug, PartialEq)]
pub enum FileLookup {
    Found(PathBuf),
    IsDirectory(PathBuf),
    NotReadable(PathBuf),
    NotFound,
}

impl FileLookup {
    /// Resolve `rel_path` under `root` and classify what is there.
    ///
    /// Traversal segments (`..`) classify as `NotFound` without touching
    /// the filesystem.
    pub fn lookup(root: &Path, rel_path: &str) -> FileLookup {
        let Some(path) = sanitized_join(root, rel_path) else {
            return FileLookup::NotFound;
        };
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => FileLookup::IsDirectory(path),
            Ok(_) => FileLookup::Found(path),
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                FileLookup::NotReadable(path)
            }
            Err(_) => FileLookup::NotFound,
        }
    }
}

/// Join a request path onto the root, segment by segment.
fn sanitized_join(root: &Path, rel_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in rel_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            other => path.push(other),
        }
    }
    Some(path)
}

/// The built-in handler behind default extension mappings.
pub struct StaticFileHandler {
    welcome_files: Vec<String>,
}

impl StaticFileHandler {
    pub fn new() -> Self {
        Self {
            welcome_files: vec!["index.html".to_string(), "index.htm".to_string()],
        }
    }

    pub fn with_welcome_files(welcome_files: Vec<String>) -> Self {
        Self { welcome_files }
    }

    fn serve_file(&self, path: &Path, response: &mut ResponseModel, signature: &str) {
        match std::fs::read(path) {
            Ok(bytes) => {
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                response.set_header("Content-Type", mime.to_string());
                response.set_content(bytes);
            }
            Err(err) => {
                log::warn!("failed to read {}: {}", path.display(), err);
                not_found(response, signature);
            }
        }
    }
}

impl Default for StaticFileHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for StaticFileHandler {
    fn service(
        &self,
        request: &mut RequestModel,
        response: &mut ResponseModel,
    ) -> anyhow::Result<()> {
        let signature = request
            .server_var(server_vars::SERVER_SOFTWARE)
            .unwrap_or("Cairn")
            .to_string();
        let Some(root) = request.server_var(server_vars::DOCUMENT_ROOT) else {
            not_found(response, &signature);
            return Ok(());
        };
        let root = PathBuf::from(root);
        let rel_path = percent_decode(request.relative_path());

        match FileLookup::lookup(&root, &rel_path) {
            FileLookup::Found(path) => self.serve_file(&path, response, &signature),
            FileLookup::IsDirectory(dir) => {
                if !request.path().ends_with('/') {
                    let mut location = format!("{}/", request.path());
                    if !request.query_string().is_empty() {
                        location.push('?');
                        location.push_str(request.query_string());
                    }
                    response.set_status(StatusCode::MovedPermanently);
                    response.set_header("Location", location);
                    response.html(error_page(
                        StatusCode::MovedPermanently,
                        "The document has moved.",
                        &signature,
                    ));
                    return Ok(());
                }
                for candidate in &self.welcome_files {
                    if let FileLookup::Found(found) = FileLookup::lookup(&dir, candidate) {
                        self.serve_file(&found, response, &signature);
                        return Ok(());
                    }
                }
                not_found(response, &signature);
            }
            FileLookup::NotReadable(path) => {
                log::warn!("document not readable: {}", path.display());
                not_found(response, &signature);
            }
            FileLookup::NotFound => not_found(response, &signature),
        }
        Ok(())
    }
}

fn not_found(response: &mut ResponseModel, signature: &str) {
    response.set_status(StatusCode::NotFound);
    response.html(error_page(
        StatusCode::NotFound,
        "The requested document was not found on this server.",
        signature,
    ));
}
