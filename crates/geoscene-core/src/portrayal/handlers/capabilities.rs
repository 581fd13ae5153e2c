//! `GetCapabilities` builder.

use crate::{
    ogc::{documents, OgcResponse},
    registry::Model,
};

/// Renders the fixed-structure capabilities document for `model`.
///
/// Always succeeds once the model has resolved in the registry.
#[must_use]
pub fn handle(model: &Model) -> OgcResponse {
    OgcResponse::xml(documents::capabilities_xml(model))
}
