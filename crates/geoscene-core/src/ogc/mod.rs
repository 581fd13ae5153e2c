//! OGC protocol surface shared by every operation.
//!
//! This module holds the pieces each response builder needs: KVP query
//! folding, the four-code exception taxonomy with its JSON rendering, and
//! the fixed success documents (capabilities XML, FeatureInfoList and
//! ValueCollection JSON).
//!
//! Protocol exceptions ride HTTP 200 with an `application/json` body; the
//! legacy 3D-viewer client cannot handle non-200 responses gracefully, so
//! availability wins over HTTP status precision throughout.

pub mod documents;
pub mod exception;
pub mod kvp;

use std::borrow::Cow;

use bytes::Bytes;

pub use exception::{ExceptionCode, ProtocolException};
pub use kvp::KvpQuery;

/// 3DPS protocol version served by this profile.
pub const VERSION_3DPS: &str = "1.0";

/// WFS protocol version served by this profile.
pub const VERSION_WFS: &str = "2.0";

/// The single layer this service portrays.
pub const LAYER_NAME: &str = "boreholes";

/// The single WFS value reference this service answers.
pub const ID_PROPERTY: &str = "borehole:id";

/// Output format required by `GetResourceById`.
pub const GLTF_MIME: &str = "model/gltf+json;charset=UTF-8";

/// Output format required by the JSON query operations.
pub const JSON_MIME: &str = "application/json";

/// File segment of the binary companion fetch path.
pub const BLOB_FILE: &str = "$blobfile.bin";

/// A finished HTTP response body with its content type.
///
/// Every builder produces one of these; the server layer only maps it onto
/// the HTTP surface. The status is always 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OgcResponse {
    pub content_type: Cow<'static, str>,
    pub body: Bytes,
}

impl OgcResponse {
    /// JSON response from a serializable document.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content_type: Cow::Borrowed(JSON_MIME),
            body: Bytes::from(value.to_string()),
        }
    }

    /// `text/xml` response, used by the capabilities document.
    #[must_use]
    pub fn xml(body: String) -> Self {
        Self { content_type: Cow::Borrowed("text/xml"), body: Bytes::from(body) }
    }

    /// The rewritten glTF document part of a scene resource.
    #[must_use]
    pub fn gltf(body: Bytes) -> Self {
        Self { content_type: Cow::Borrowed(GLTF_MIME), body }
    }

    /// Raw binary companion part.
    #[must_use]
    pub fn octet_stream(body: Bytes) -> Self {
        Self { content_type: Cow::Borrowed("application/octet-stream"), body }
    }

    /// The generic single-space placeholder served for unrecognized paths
    /// and degraded queries.
    #[must_use]
    pub fn blank() -> Self {
        Self { content_type: Cow::Borrowed("text/plain"), body: Bytes::from_static(b" ") }
    }

    /// Empty JSON object, the deliberate not-found shape of
    /// `GetResourceById`.
    #[must_use]
    pub fn empty_object() -> Self {
        Self { content_type: Cow::Borrowed(JSON_MIME), body: Bytes::from_static(b"{}") }
    }

    /// Protocol exception rendered to its JSON body.
    #[must_use]
    pub fn exception(exception: &ProtocolException) -> Self {
        Self::json(&exception.to_body())
    }
}
