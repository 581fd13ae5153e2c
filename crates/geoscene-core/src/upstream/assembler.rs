//! HTTP scene-source adapter.
//!
//! Posts one borehole record plus the model's conversion parameters to the
//! configured assembler endpoint and parses the returned GLB container
//! into a [`ScenePayload`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::{
    index::BoreholeRecord,
    registry::Model,
    scene::{glb, SceneError, ScenePayload, SceneSource},
};

use super::sanitize_network_error;

/// Scene source calling an external assembler over HTTP.
pub struct HttpSceneSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSceneSource {
    /// Creates the source for the assembler at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Assembly`] if the HTTP client cannot be built.
    pub fn new(url: String, timeout: Duration) -> Result<Self, SceneError> {
        let client = super::build_client().map_err(|e| SceneError::Assembly(e.to_string()))?;
        Ok(Self { client, url, timeout })
    }
}

#[async_trait]
impl SceneSource for HttpSceneSource {
    async fn assemble(
        &self,
        record: &BoreholeRecord,
        model: &Model,
    ) -> Result<ScenePayload, SceneError> {
        let request = json!({
            "model": model.name,
            "nvclId": record.nvcl_id,
            "attributes": record.attrs,
            "conversion": model.conversion,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SceneError::Assembly(sanitize_network_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SceneError::Assembly(format!("assembler returned HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SceneError::Assembly(sanitize_network_error(&e)))?;
        debug!(model = %model.name, nvcl_id = %record.nvcl_id, bytes = bytes.len(), "scene assembled");

        glb::parse_glb(&bytes)
    }
}
