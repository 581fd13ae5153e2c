//! WFS `GetPropertyValue` builder.

use std::sync::Arc;

use crate::{
    ogc::{
        documents, ExceptionCode, KvpQuery, OgcResponse, ProtocolException, ID_PROPERTY,
        JSON_MIME, LAYER_NAME, VERSION_WFS,
    },
    portrayal::engine::SharedContext,
    registry::Model,
};

/// Builds the ordered-id ValueCollection for one model.
pub struct PropertyValueHandler {
    ctx: Arc<SharedContext>,
}

impl PropertyValueHandler {
    #[must_use]
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Validates the three fixed WFS parameters and answers with the
    /// model's ordered resource-id list.
    ///
    /// Value mismatches render as `OperationProcessingFailed` with the
    /// lower-cased parameter as locator; absences as
    /// `MissingParameterValue`.
    pub async fn handle(&self, model: &Model, query: &KvpQuery) -> OgcResponse {
        let exception = |code, locator: &str, text: String| {
            OgcResponse::exception(&ProtocolException::new(
                VERSION_WFS,
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
        if output_format != JSON_MIME {
            return exception(
                ExceptionCode::OperationProcessingFailed,
                "outputformat",
                format!("Incorrect outputFormat, try '{JSON_MIME}'"),
            );
        }

        let Some(type_name) = query.value("typename") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "typeName",
                "No typeName value".to_string(),
            );
        };
        if type_name != LAYER_NAME {
            return exception(
                ExceptionCode::OperationProcessingFailed,
                "typename",
                format!("Incorrect typeName, try '{LAYER_NAME}'"),
            );
        }

        let Some(value_reference) = query.value("valuereference") else {
            return exception(
                ExceptionCode::MissingParameterValue,
                "valueReference",
                "No valueReference value".to_string(),
            );
        };
        if value_reference != ID_PROPERTY {
            return exception(
                ExceptionCode::OperationProcessingFailed,
                "valuereference",
                format!("Incorrect valueReference, try '{ID_PROPERTY}'"),
            );
        }

        let index = self.ctx.index.index_for(model).await;
        OgcResponse::json(&documents::value_collection(&index.ordered_ids))
    }
}
