//! `GetFeatureInfoByObjectId` builder.

use std::sync::Arc;

use tracing::warn;

use crate::{
    ogc::{
        documents, ExceptionCode, KvpQuery, OgcResponse, ProtocolException, JSON_MIME, LAYER_NAME,
        VERSION_3DPS,
    },
    portrayal::engine::SharedContext,
    registry::Model,
};

/// Builds feature-info responses from the attribute-query collaborator.
pub struct FeatureInfoHandler {
    ctx: Arc<SharedContext>,
}

impl FeatureInfoHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Validates the object id, output format, and layer name, then merges
    /// the collaborator's attribute groups into one FeatureInfoList.
    ///
    /// A failed attribute query degrades to the single-space placeholder
    /// body; the legacy viewer treats that as "nothing to show".
    pub async fn handle(&self, model: &Model, query: &KvpQuery) -> OgcResponse {
        let exception = |code, locator: &str, text: String| {
            OgcResponse::exception(&ProtocolException::new(
                VERSION_3DPS,
                code,
                Some(locator.to_string()),
                text,
            ))
        };

        let Some(object_id) = query.value("objectid") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "objectId",
                "No objectId value".to_string(),
            );
        };
        let Some(format) = query.value("format") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "format",
                "No format value".to_string(),
            );
        };
        if format != JSON_MIME {
            return exception(
                ExceptionCode::InvalidParameterValue,
                "format",
                format!("Incorrect format, try '{JSON_MIME}'"),
            );
        }
        let Some(layers) = query.value("layers") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "layers",
                "No layers value".to_string(),
            );
        };
        if layers != LAYER_NAME {
            return exception(
                ExceptionCode::InvalidParameterValue,
                "layers",
                format!("Incorrect layers, try '{LAYER_NAME}'"),
            );
        }

        match self.ctx.attributes.query(object_id, &model.name).await {
            Ok(groups) => {
                let merged = groups.unwrap_or_default().merged();
                OgcResponse::json(&documents::feature_info_list(object_id, &merged))
            }
            Err(e) => {
                warn!(model = %model.name, object_id = object_id, error = %e, "attribute query failed");
                OgcResponse::blank()
            }
        }
    }
}
