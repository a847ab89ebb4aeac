//! HTTP/1.1 wire protocol: parsing, models, body decoding.
//!
//! Everything in here works on plain byte streams; no part of this module
//! touches sockets directly. The connection loop in [`crate::server`] feeds
//! it buffers and writes back what [`codec`] serializes.

pub mod body;
pub mod codec;
pub mod headers;
pub mod multipart;
pub mod query;
pub mod request;
pub mod response;

pub use headers::HeaderMap;
pub use multipart::UploadedPart;
pub use query::{ParamMap, ParamValue};
pub use request::{server_vars, Method, RequestModel, Version};
pub use response::{ResponseModel, StatusCode};
