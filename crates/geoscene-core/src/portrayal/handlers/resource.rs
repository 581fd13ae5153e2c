//! `GetResourceById` builder: the payload-splitting path.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    ogc::{ExceptionCode, KvpQuery, OgcResponse, ProtocolException, GLTF_MIME, VERSION_3DPS},
    portrayal::engine::SharedContext,
    registry::Model,
    scene,
};

/// Builds scene-document responses and caches their binary companions.
pub struct ResourceHandler {
    ctx: Arc<SharedContext>,
}

impl ResourceHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Fetches, splits, and serves the document half of one scene payload.
    ///
    /// A resource id absent from the index, and any assembly failure,
    /// deliberately yields the empty JSON object rather than an exception;
    /// the legacy viewer treats `{}` as empty content. The binary half is
    /// cached under (model, resource id) with first-writer-wins semantics
    /// for the companion-fetch endpoint.
    pub async fn handle(&self, model: &Model, query: &KvpQuery) -> OgcResponse {
        let exception = |code, locator: &str, text: String| {
            OgcResponse::exception(&ProtocolException::new(
                VERSION_3DPS,
                code,
                Some(locator.to_string()),
                text,
            ))
        };

        let Some(output_format) = query.value("outputformat") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "outputFormat",
                "No outputFormat value".to_string(),
            );
        };
        if output_format != GLTF_MIME {
            return exception(
                ExceptionCode::InvalidParameterValue,
                "outputFormat",
                format!("Incorrect outputFormat, try '{GLTF_MIME}'"),
            );
        }
        let Some(resource_id) = query.value("resourceid") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "resourceId",
                "No resourceId value".to_string(),
            );
        };

        let index = self.ctx.index.index_for(model).await;
        let Some(record) = index.get(resource_id) else {
            debug!(model = %model.name, resource_id = resource_id, "resource id not in index");
            return OgcResponse::empty_object();
        };

        let payload = match self.ctx.scenes.assemble(record, model).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(model = %model.name, resource_id = resource_id, error = %e, "scene assembly failed");
                return OgcResponse::empty_object();
            }
        };

        let split = scene::split_scene(&self.ctx.store, &payload, &model.name, resource_id);
        match split.document {
            Some(document) => OgcResponse::gltf(document),
            None => OgcResponse::empty_object(),
        }
    }
}
