//! Two-part scene payloads and the splitter algorithm.
//!
//! A scene payload holds exactly two tagged parts: the empty-tagged UTF-8
//! glTF document and the `bin`-tagged binary buffer. The splitter turns one
//! payload into two independently servable responses: it rewrites the
//! document's first buffer URI to point back at this service and caches the
//! binary part under (model, resource id) with first-writer-wins semantics.

pub mod glb;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    index::BoreholeRecord,
    registry::Model,
    store::{DiskStore, Namespace},
};

/// Tag of the document part.
pub const DOC_TAG: &str = "";

/// Tag of the binary part.
pub const BIN_TAG: &str = "bin";

/// Errors raised while obtaining or decoding a scene payload.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("payload is not a GLB container")]
    BadMagic,

    #[error("unsupported GLB container version {0}")]
    UnsupportedVersion(u32),

    #[error("payload shorter than its headers claim")]
    Truncated,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("scene assembly failed: {0}")]
    Assembly(String),
}

/// One tagged byte-buffer part of a scene payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPart {
    pub tag: String,
    pub data: Bytes,
}

/// A validated two-part scene payload.
///
/// Construction enforces the tag invariant: exactly one empty-tagged part
/// and one `bin`-tagged part, in either order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePayload {
    document: PayloadPart,
    binary: PayloadPart,
}

impl ScenePayload {
    /// Validates the part sequence into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Malformed`] unless `parts` holds exactly one
    /// part per tag.
    pub fn from_parts(parts: Vec<PayloadPart>) -> Result<Self, SceneError> {
        let mut document = None;
        let mut binary = None;
        for part in parts {
            let slot = match part.tag.as_str() {
                DOC_TAG => &mut document,
                BIN_TAG => &mut binary,
                other => {
                    return Err(SceneError::Malformed(format!("unexpected part tag '{other}'")))
                }
            };
            if slot.replace(part).is_some() {
                return Err(SceneError::Malformed("duplicate part tag".to_string()));
            }
        }

        match (document, binary) {
            (Some(document), Some(binary)) => Ok(Self { document, binary }),
            (None, _) => Err(SceneError::Malformed("document part missing".to_string())),
            (_, None) => Err(SceneError::Malformed("binary part missing".to_string())),
        }
    }

    #[must_use]
    pub fn document(&self) -> &PayloadPart {
        &self.document
    }

    #[must_use]
    pub fn binary(&self) -> &PayloadPart {
        &self.binary
    }
}

/// External collaborator producing the raw two-part payload for one
/// borehole record.
#[async_trait]
pub trait SceneSource: Send + Sync {
    async fn assemble(
        &self,
        record: &BoreholeRecord,
        model: &Model,
    ) -> Result<ScenePayload, SceneError>;
}

/// The two servable halves of a split payload.
///
/// `document` is `None` when the document part could not be decoded or
/// rewritten; the caller then serves the empty-object placeholder. The
/// binary half is always carried so the inline octet-stream variant stays
/// available alongside the cached companion-fetch path.
#[derive(Debug, Clone)]
pub struct SplitScene {
    pub document: Option<Bytes>,
    pub binary: Bytes,
}

/// Store key of the cached binary part for (model, resource id).
#[must_use]
pub fn blob_key(model: &str, resource_id: &str) -> String {
    format!("{model}/{resource_id}")
}

/// Splits a payload into its two servable responses.
///
/// The binary part is cached verbatim under (model, resource id); an
/// existing entry is kept, so repeated calls are idempotent with respect
/// to the cached bytes. The document part is rewritten so its first buffer
/// URI points at the companion-fetch endpoint.
#[must_use]
pub fn split_scene(
    store: &DiskStore,
    payload: &ScenePayload,
    model: &str,
    resource_id: &str,
) -> SplitScene {
    let binary = payload.binary().data.clone();

    match store.add(Namespace::Blob, &blob_key(model, resource_id), &binary) {
        Ok(true) => {
            debug!(model = model, resource_id = resource_id, bytes = binary.len(), "binary part cached");
        }
        Ok(false) => {
            debug!(model = model, resource_id = resource_id, "binary part already cached");
        }
        Err(e) => warn!(model = model, resource_id = resource_id, error = %e, "binary part cache write failed"),
    }

    let document = rewrite_document(&payload.document().data, model, resource_id);
    SplitScene { document, binary }
}

/// Rewrites the document's first buffer URI to
/// `<model>/<original-uri>?id=<resource_id>`.
///
/// Decode and shape failures are logged and yield `None`; the caller
/// degrades to the empty-object response instead of raising a protocol
/// exception.
fn rewrite_document(data: &Bytes, model: &str, resource_id: &str) -> Option<Bytes> {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) => {
            warn!(model = model, resource_id = resource_id, error = %e, "document part is not UTF-8");
            return None;
        }
    };
    let mut doc: serde_json::Value = match serde_json::from_str(text) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(model = model, resource_id = resource_id, error = %e, "document part is not JSON");
            return None;
        }
    };

    let Some(uri) = doc
        .get_mut("buffers")
        .and_then(|buffers| buffers.get_mut(0))
        .and_then(|buffer| buffer.get_mut("uri"))
    else {
        warn!(model = model, resource_id = resource_id, "document has no buffer URI to rewrite");
        return None;
    };
    let original = uri.as_str()?.to_string();
    *uri = serde_json::Value::String(format!("{model}/{original}?id={resource_id}"));

    match serde_json::to_vec(&doc) {
        Ok(bytes) => Some(Bytes::from(bytes)),
        Err(e) => {
            warn!(model = model, resource_id = resource_id, error = %e, "document re-encode failed");
            None
        }
    }
}

/// Shared handle type used by the engine for the scene collaborator.
pub type SharedSceneSource = Arc<dyn SceneSource>;
