//! Borehole index construction and caching.
//!
//! The index for a model is built from exactly one upstream listing call:
//! a map from resource id to its attribute record, plus the ordered id
//! list in upstream order. Both halves share one id set by construction.
//!
//! Lookups go memo → persistent store → upstream. Cache failures degrade
//! to an empty index so query operations still return well-formed, empty
//! results; a failed upstream call is not memoized and will be retried on
//! the next request.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    registry::{ListingEndpoint, Model},
    store::{DiskStore, Namespace},
};

/// Errors raised by the upstream listing collaborator.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing call timed out")]
    Timeout,

    #[error("listing endpoint unreachable: {0}")]
    Network(String),

    #[error("listing endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("listing response undecodable: {0}")]
    Decode(String),
}

/// One borehole's attribute record.
///
/// The internal `nvcl_id` is distinct from the externally exposed resource
/// id that keys the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeRecord {
    pub nvcl_id: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

/// A record as returned by the upstream listing service, paired with the
/// resource id it is exposed under.
#[derive(Debug, Clone)]
pub struct ListedRecord {
    pub resource_id: String,
    pub record: BoreholeRecord,
}

/// Per-model borehole index: record map plus ordered id list.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeIndex {
    pub records: HashMap<String, BoreholeRecord>,
    pub ordered_ids: Vec<String>,
}

impl BoreholeIndex {
    /// Builds both halves from one listing result.
    ///
    /// A repeated resource id keeps the first record; the ordered list only
    /// carries ids that made it into the map, so the two halves always
    /// agree.
    #[must_use]
    pub fn from_listing(listed: Vec<ListedRecord>) -> Self {
        let mut records = HashMap::with_capacity(listed.len());
        let mut ordered_ids = Vec::with_capacity(listed.len());
        for entry in listed {
            if records.contains_key(&entry.resource_id) {
                debug!(resource_id = %entry.resource_id, "duplicate listing id skipped");
                continue;
            }
            ordered_ids.push(entry.resource_id.clone());
            records.insert(entry.resource_id, entry.record);
        }
        Self { records, ordered_ids }
    }

    #[must_use]
    pub fn get(&self, resource_id: &str) -> Option<&BoreholeRecord> {
        self.records.get(resource_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }
}

/// Upstream feature-listing collaborator.
///
/// Implementations are bounded by `max_records` and `timeout`; this layer
/// never retries a failed call.
#[async_trait]
pub trait RecordLister: Send + Sync {
    async fn list_records(
        &self,
        endpoint: &ListingEndpoint,
        max_records: usize,
        timeout: Duration,
    ) -> Result<Vec<ListedRecord>, ListingError>;
}

fn records_key(model: &str) -> String {
    format!("{model}/records")
}

fn ids_key(model: &str) -> String {
    format!("{model}/ids")
}

/// Builds and caches borehole indices per model.
pub struct IndexBuilder {
    store: Arc<DiskStore>,
    lister: Arc<dyn RecordLister>,
    memo: DashMap<String, Arc<BoreholeIndex>>,
    max_records: usize,
    timeout: Duration,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(
        store: Arc<DiskStore>,
        lister: Arc<dyn RecordLister>,
        max_records: usize,
        timeout: Duration,
    ) -> Self {
        Self { store, lister, memo: DashMap::new(), max_records, timeout }
    }

    /// Returns the index for `model`, building and caching it on a miss.
    ///
    /// Infallible by contract: any cache or upstream failure yields an
    /// empty index rather than an error, and only successful builds are
    /// memoized.
    pub async fn index_for(&self, model: &Model) -> Arc<BoreholeIndex> {
        if let Some(hit) = self.memo.get(&model.name) {
            return Arc::clone(&hit);
        }

        if let Some(restored) = self.restore(&model.name) {
            debug!(model = %model.name, boreholes = restored.len(), "index restored from cache");
            let index = Arc::new(restored);
            self.memo.insert(model.name.clone(), Arc::clone(&index));
            return index;
        }

        let listed = match self
            .lister
            .list_records(&model.listing, self.max_records, self.timeout)
            .await
        {
            Ok(listed) => listed,
            Err(e) => {
                warn!(model = %model.name, error = %e, "listing failed, serving empty index");
                return Arc::new(BoreholeIndex::default());
            }
        };

        let index = BoreholeIndex::from_listing(listed);
        debug!(model = %model.name, boreholes = index.len(), "index built from upstream");
        self.persist(&model.name, &index);

        let index = Arc::new(index);
        self.memo.insert(model.name.clone(), Arc::clone(&index));
        index
    }

    /// Restores the index pair from the store.
    ///
    /// Both entries must be present and decodable; anything less counts as
    /// a combined miss so the pair is always rebuilt together.
    fn restore(&self, model: &str) -> Option<BoreholeIndex> {
        let records_bytes = self.store.get(Namespace::Index, &records_key(model))?;
        let ids_bytes = self.store.get(Namespace::Index, &ids_key(model))?;

        let records: HashMap<String, BoreholeRecord> = serde_json::from_slice(&records_bytes)
            .map_err(|e| warn!(model = model, error = %e, "cached records undecodable"))
            .ok()?;
        let ordered_ids: Vec<String> = serde_json::from_slice(&ids_bytes)
            .map_err(|e| warn!(model = model, error = %e, "cached id list undecodable"))
            .ok()?;

        if ordered_ids.len() != records.len()
            || !ordered_ids.iter().all(|id| records.contains_key(id))
        {
            warn!(model = model, "cached index halves disagree, rebuilding");
            return None;
        }

        Some(BoreholeIndex { records, ordered_ids })
    }

    /// Writes both index entries with insert-if-absent semantics.
    ///
    /// A concurrent populator's result is allowed to win; losing the race
    /// or hitting a store error is logged and otherwise ignored.
    fn persist(&self, model: &str, index: &BoreholeIndex) {
        let entries = [
            (records_key(model), serde_json::to_vec(&index.records)),
            (ids_key(model), serde_json::to_vec(&index.ordered_ids)),
        ];
        for (key, bytes) in entries {
            match bytes {
                Ok(bytes) => {
                    if let Err(e) = self.store.add(Namespace::Index, &key, &bytes) {
                        warn!(key = %key, error = %e, "failed to persist index entry");
                    }
                }
                Err(e) => warn!(key = %key, error = %e, "failed to serialize index entry"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticLister {
        records: Vec<ListedRecord>,
        calls: AtomicUsize,
    }

    impl StaticLister {
        fn new(records: Vec<ListedRecord>) -> Self {
            Self { records, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl RecordLister for StaticLister {
        async fn list_records(
            &self,
            _endpoint: &ListingEndpoint,
            _max_records: usize,
            _timeout: Duration,
        ) -> Result<Vec<ListedRecord>, ListingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }
    }

    struct FailingLister;

    #[async_trait]
    impl RecordLister for FailingLister {
        async fn list_records(
            &self,
            _endpoint: &ListingEndpoint,
            _max_records: usize,
            _timeout: Duration,
        ) -> Result<Vec<ListedRecord>, ListingError> {
            Err(ListingError::Timeout)
        }
    }

    fn listed(resource_id: &str, nvcl_id: &str) -> ListedRecord {
        ListedRecord {
            resource_id: resource_id.to_string(),
            record: BoreholeRecord {
                nvcl_id: nvcl_id.to_string(),
                attrs: BTreeMap::from([("name".to_string(), json!(format!("Bore {resource_id}")))]),
            },
        }
    }

    fn test_model(name: &str) -> Model {
        Model {
            name: name.to_string(),
            crs: "EPSG:28352".to_string(),
            conversion: json!({}),
            listing: ListingEndpoint {
                url: "http://upstream.example/list".to_string(),
                version: "2.0".to_string(),
            },
        }
    }

    fn builder(lister: Arc<dyn RecordLister>) -> (tempfile::TempDir, IndexBuilder) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DiskStore::open(dir.path()).unwrap());
        (dir, IndexBuilder::new(store, lister, 100, Duration::from_secs(5)))
    }

    #[test]
    fn test_from_listing_keeps_halves_consistent() {
        let index =
            BoreholeIndex::from_listing(vec![listed("R1", "n1"), listed("R2", "n2")]);
        assert_eq!(index.ordered_ids, vec!["R1", "R2"]);
        assert_eq!(index.records.len(), 2);
        assert_eq!(index.get("R1").unwrap().nvcl_id, "n1");
    }

    #[test]
    fn test_from_listing_first_duplicate_wins() {
        let index = BoreholeIndex::from_listing(vec![
            listed("R1", "first"),
            listed("R1", "second"),
            listed("R2", "n2"),
        ]);
        assert_eq!(index.ordered_ids, vec!["R1", "R2"]);
        assert_eq!(index.get("R1").unwrap().nvcl_id, "first");
    }

    #[tokio::test]
    async fn test_miss_builds_and_persists() {
        let lister = Arc::new(StaticLister::new(vec![listed("R1", "n1")]));
        let (_dir, builder) = builder(lister.clone());
        let model = test_model("Alpha");

        let index = builder.index_for(&model).await;
        assert_eq!(index.ordered_ids, vec!["R1"]);
        assert_eq!(lister.calls.load(Ordering::SeqCst), 1);

        assert!(builder.store.get(Namespace::Index, "Alpha/records").is_some());
        assert!(builder.store.get(Namespace::Index, "Alpha/ids").is_some());
    }

    #[tokio::test]
    async fn test_memo_avoids_second_listing_call() {
        let lister = Arc::new(StaticLister::new(vec![listed("R1", "n1")]));
        let (_dir, builder) = builder(lister.clone());
        let model = test_model("Alpha");

        builder.index_for(&model).await;
        builder.index_for(&model).await;
        assert_eq!(lister.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_hit_skips_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DiskStore::open(dir.path()).unwrap());

        let cached = BoreholeIndex::from_listing(vec![listed("R9", "n9")]);
        store
            .add(Namespace::Index, "Alpha/records", &serde_json::to_vec(&cached.records).unwrap())
            .unwrap();
        store
            .add(Namespace::Index, "Alpha/ids", &serde_json::to_vec(&cached.ordered_ids).unwrap())
            .unwrap();

        let lister = Arc::new(StaticLister::new(vec![listed("R1", "n1")]));
        let builder = IndexBuilder::new(store, lister.clone(), 100, Duration::from_secs(5));

        let index = builder.index_for(&test_model("Alpha")).await;
        assert_eq!(index.ordered_ids, vec!["R9"]);
        assert_eq!(lister.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_cache_counts_as_combined_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DiskStore::open(dir.path()).unwrap());
        store.add(Namespace::Index, "Alpha/ids", br#"["R9"]"#).unwrap();

        let lister = Arc::new(StaticLister::new(vec![listed("R1", "n1")]));
        let builder = IndexBuilder::new(store, lister.clone(), 100, Duration::from_secs(5));

        let index = builder.index_for(&test_model("Alpha")).await;
        assert_eq!(index.ordered_ids, vec!["R1"]);
        assert_eq!(lister.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_degrades_to_empty_index() {
        let (_dir, builder) = builder(Arc::new(FailingLister));
        let index = builder.index_for(&test_model("Alpha")).await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_is_not_memoized() {
        struct FlakyLister {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl RecordLister for FlakyLister {
            async fn list_records(
                &self,
                _endpoint: &ListingEndpoint,
                _max_records: usize,
                _timeout: Duration,
            ) -> Result<Vec<ListedRecord>, ListingError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ListingError::Network("refused".to_string()))
                } else {
                    Ok(vec![listed("R1", "n1")])
                }
            }
        }

        let lister = Arc::new(FlakyLister { calls: AtomicUsize::new(0) });
        let (_dir, builder) = builder(lister.clone());
        let model = test_model("Alpha");

        assert!(builder.index_for(&model).await.is_empty());
        // The next request retries upstream instead of serving the failure.
        assert_eq!(builder.index_for(&model).await.ordered_ids, vec!["R1"]);
    }

    #[tokio::test]
    async fn test_populate_race_keeps_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DiskStore::open(dir.path()).unwrap());

        // A concurrent populator already wrote the pair.
        let winner = BoreholeIndex::from_listing(vec![listed("R0", "n0")]);
        store
            .add(Namespace::Index, "Alpha/records", &serde_json::to_vec(&winner.records).unwrap())
            .unwrap();
        store
            .add(Namespace::Index, "Alpha/ids", &serde_json::to_vec(&winner.ordered_ids).unwrap())
            .unwrap();

        let lister = Arc::new(StaticLister::new(vec![listed("R1", "n1")]));
        let loser = BoreholeIndex::from_listing(vec![listed("R1", "n1")]);
        let builder = IndexBuilder::new(Arc::clone(&store), lister, 100, Duration::from_secs(5));
        builder.persist("Alpha", &loser);

        // Losing the race is silent; the first writer's bytes survive.
        let bytes = store.get(Namespace::Index, "Alpha/ids").unwrap();
        let ids: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ids, vec!["R0"]);
    }
}
