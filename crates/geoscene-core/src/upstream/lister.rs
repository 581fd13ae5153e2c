//! HTTP record lister.
//!
//! Issues one generic "list records" call against a model's listing
//! endpoint, bounded by a maximum record count and a hard timeout. No
//! retries at this layer; a failed call degrades at the index builder.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{
    index::{BoreholeRecord, ListedRecord, ListingError, RecordLister},
    registry::ListingEndpoint,
};

use super::sanitize_network_error;

/// Wire shape of one listed record.
#[derive(Debug, Deserialize)]
struct ListedRecordWire {
    #[serde(rename = "resourceId")]
    resource_id: String,
    #[serde(rename = "nvclId")]
    nvcl_id: String,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

/// Wire shape of the listing response.
#[derive(Debug, Deserialize)]
struct ListingResponseWire {
    #[serde(default)]
    records: Vec<ListedRecordWire>,
}

/// Feature-listing client over HTTP.
pub struct HttpRecordLister {
    client: reqwest::Client,
}

impl HttpRecordLister {
    /// Creates the lister with a shared connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::Network`] if the HTTP client cannot be
    /// built.
    pub fn new() -> Result<Self, ListingError> {
        let client =
            super::build_client().map_err(|e| ListingError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    fn categorize(error: reqwest::Error) -> ListingError {
        if error.is_timeout() {
            ListingError::Timeout
        } else if error.is_decode() {
            ListingError::Decode(sanitize_network_error(&error))
        } else {
            ListingError::Network(sanitize_network_error(&error))
        }
    }
}

#[async_trait]
impl RecordLister for HttpRecordLister {
    async fn list_records(
        &self,
        endpoint: &ListingEndpoint,
        max_records: usize,
        timeout: Duration,
    ) -> Result<Vec<ListedRecord>, ListingError> {
        let request = json!({
            "request": "listRecords",
            "version": endpoint.version,
            "maxRecords": max_records,
        });

        let response = self
            .client
            .post(&endpoint.url)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::categorize)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::HttpStatus(status.as_u16()));
        }

        let body: ListingResponseWire = response.json().await.map_err(Self::categorize)?;
        debug!(
            endpoint = %endpoint.url,
            returned = body.records.len(),
            max_records = max_records,
            "listing call completed"
        );

        // The bound applies even when the upstream over-delivers.
        Ok(body
            .records
            .into_iter()
            .take(max_records)
            .map(|wire| ListedRecord {
                resource_id: wire.resource_id,
                record: BoreholeRecord { nvcl_id: wire.nvcl_id, attrs: wire.attributes },
            })
            .collect())
    }
}
