//! Binary companion fetch builder.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::{
    ogc::{KvpQuery, OgcResponse},
    portrayal::engine::SharedContext,
    scene::blob_key,
    store::Namespace,
};

/// Serves cached binary scene parts by (model, resource id).
pub struct BlobHandler {
    ctx: Arc<SharedContext>,
}

impl BlobHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Looks the blob up by the `id` query parameter.
    ///
    /// No validation beyond id presence: an absent id or a miss falls
    /// through to the generic single-space response.
    #[must_use]
    pub fn handle(&self, model_name: &str, query: &KvpQuery) -> OgcResponse {
        let Some(resource_id) = query.value("id") else {
            return OgcResponse::blank();
        };

        match self.ctx.store.get(Namespace::Blob, &blob_key(model_name, resource_id)) {
            Some(bytes) => OgcResponse::octet_stream(Bytes::from(bytes)),
            None => {
                debug!(model = model_name, resource_id = resource_id, "blob cache miss");
                OgcResponse::blank()
            }
        }
    }
}
