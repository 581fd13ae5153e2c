//! Protocol dispatcher.

use std::sync::Arc;

use tracing::debug;

use crate::{
    attrs::AttributeQuery,
    index::IndexBuilder,
    ogc::{
        ExceptionCode, KvpQuery, OgcResponse, ProtocolException, VERSION_3DPS, VERSION_WFS,
    },
    registry::{Model, ModelRegistry},
    scene::SceneSource,
    store::DiskStore,
};

use super::handlers::{
    capabilities, BlobHandler, FeatureInfoHandler, PropertyValueHandler, ResourceHandler,
};

/// Shared context for all response builders.
///
/// Handlers receive a single `Arc<SharedContext>` instead of individual
/// `Arc` references, mirroring the one-allocation initialization pattern
/// used across the engine.
pub struct SharedContext {
    pub registry: Arc<ModelRegistry>,
    pub store: Arc<DiskStore>,
    pub index: Arc<IndexBuilder>,
    pub attributes: Arc<dyn AttributeQuery>,
    pub scenes: Arc<dyn SceneSource>,
}

/// Core engine dispatching OGC requests to the operation builders.
///
/// Stateless per request; the only shared state is the read-only registry
/// and the externally synchronized cache store, so one instance serves all
/// connections concurrently behind an `Arc`.
pub struct PortrayalEngine {
    ctx: Arc<SharedContext>,
    feature_info: FeatureInfoHandler,
    property_value: PropertyValueHandler,
    resource: ResourceHandler,
    blob: BlobHandler,
}

impl PortrayalEngine {
    /// Creates the engine and its operation builders.
    #[must_use]
    pub fn new(
        registry: Arc<ModelRegistry>,
        store: Arc<DiskStore>,
        index: Arc<IndexBuilder>,
        attributes: Arc<dyn AttributeQuery>,
        scenes: Arc<dyn SceneSource>,
    ) -> Self {
        let ctx = Arc::new(SharedContext { registry, store, index, attributes, scenes });

        let feature_info = FeatureInfoHandler::new(Arc::clone(&ctx));
        let property_value = PropertyValueHandler::new(Arc::clone(&ctx));
        let resource = ResourceHandler::new(Arc::clone(&ctx));
        let blob = BlobHandler::new(Arc::clone(&ctx));

        Self { ctx, feature_info, property_value, resource, blob }
    }

    /// Handles a service request (`/<model>?...` or `/api/<model>?...`).
    ///
    /// Dispatch is a pure function of the (service, request, version)
    /// parameter values, compared case-insensitively. Every outcome is an
    /// HTTP-200 body: success documents, exception JSON, or a placeholder.
    pub async fn handle_service(&self, model_name: &str, query: &KvpQuery) -> OgcResponse {
        let version = exception_version(query);

        // Every service operation resolves the model first, capabilities
        // included.
        let Some(model) = self.ctx.registry.lookup(model_name) else {
            debug!(model = model_name, "request for unregistered model");
            return exception(
                &version,
                ExceptionCode::InvalidParameterValue,
                Some("model"),
                format!("Unknown model '{model_name}'"),
            );
        };

        let Some(service) = query.value("service") else {
            return exception(
                &version,
                ExceptionCode::MissingParameterValue,
                Some("service"),
                "No service value".to_string(),
            );
        };

        if service.eq_ignore_ascii_case("3dps") {
            self.dispatch_3dps(&model, query).await
        } else if service.eq_ignore_ascii_case("wfs") {
            self.dispatch_wfs(&model, query).await
        } else {
            exception(
                &version,
                ExceptionCode::OperationNotSupported,
                Some("service"),
                format!("Unknown service '{service}'"),
            )
        }
    }

    /// Handles the binary companion fetch (`/<model>/$blobfile.bin?id=...`).
    pub fn handle_blob(&self, model_name: &str, query: &KvpQuery) -> OgcResponse {
        self.blob.handle(model_name, query)
    }

    async fn dispatch_3dps(&self, model: &Model, query: &KvpQuery) -> OgcResponse {
        let Some(request) = query.value("request") else {
            return exception(
                VERSION_3DPS,
                ExceptionCode::MissingParameterValue,
                Some("request"),
                "No request value".to_string(),
            );
        };

        // GetCapabilities is the one version-optional operation.
        if request.eq_ignore_ascii_case("GetCapabilities") {
            if let Some(version) = query.value("version") {
                if !version.eq_ignore_ascii_case(VERSION_3DPS) {
                    return wrong_version(VERSION_3DPS);
                }
            }
            return capabilities::handle(model);
        }

        let Some(version) = query.value("version") else {
            return exception(
                VERSION_3DPS,
                ExceptionCode::MissingParameterValue,
                Some("version"),
                "No version value".to_string(),
            );
        };
        if !version.eq_ignore_ascii_case(VERSION_3DPS) {
            return wrong_version(VERSION_3DPS);
        }

        if request.eq_ignore_ascii_case("GetFeatureInfoByObjectId") {
            self.feature_info.handle(model, query).await
        } else if request.eq_ignore_ascii_case("GetResourceById") {
            self.resource.handle(model, query).await
        } else if is_recognized_unimplemented(request) {
            exception(
                VERSION_3DPS,
                ExceptionCode::OperationNotSupported,
                Some(request),
                format!("Request '{request}' is not implemented"),
            )
        } else {
            exception(
                VERSION_3DPS,
                ExceptionCode::OperationNotSupported,
                Some("request"),
                format!("Unknown request '{request}'"),
            )
        }
    }

    async fn dispatch_wfs(&self, model: &Model, query: &KvpQuery) -> OgcResponse {
        let Some(request) = query.value("request") else {
            return exception(
                VERSION_WFS,
                ExceptionCode::MissingParameterValue,
                Some("request"),
                "No request value".to_string(),
            );
        };

        let Some(version) = query.value("version") else {
            return exception(
                VERSION_WFS,
                ExceptionCode::MissingParameterValue,
                Some("version"),
                "No version value".to_string(),
            );
        };
        if !version.eq_ignore_ascii_case(VERSION_WFS) {
            return wrong_version(VERSION_WFS);
        }

        if request.eq_ignore_ascii_case("GetPropertyValue") {
            self.property_value.handle(model, query).await
        } else {
            exception(
                VERSION_WFS,
                ExceptionCode::OperationNotSupported,
                Some("request"),
                format!("Unknown request '{request}'"),
            )
        }
    }

    /// Number of registered models, surfaced through the health endpoint.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.ctx.registry.len()
    }

    /// Cache store handle, surfaced through the health endpoint.
    #[must_use]
    pub fn store(&self) -> &Arc<DiskStore> {
        &self.ctx.store
    }
}

/// 3DPS operations this profile recognizes but deliberately rejects.
fn is_recognized_unimplemented(request: &str) -> bool {
    ["GetScene", "GetView", "GetFeatureInfoByRay", "GetFeatureInfoByPosition"]
        .iter()
        .any(|known| request.eq_ignore_ascii_case(known))
}

/// Version string used for exception bodies before dispatch resolves.
///
/// Prefers the request's own version value, then the addressed service's
/// protocol default.
fn exception_version(query: &KvpQuery) -> String {
    if let Some(version) = query.value("version") {
        return version.to_string();
    }
    match query.value("service") {
        Some(s) if s.eq_ignore_ascii_case("wfs") => VERSION_WFS.to_string(),
        _ => VERSION_3DPS.to_string(),
    }
}

fn exception(
    version: &str,
    code: ExceptionCode,
    locator: Option<&str>,
    text: String,
) -> OgcResponse {
    OgcResponse::exception(&ProtocolException::new(
        version,
        code,
        locator.map(str::to_string),
        text,
    ))
}

fn wrong_version(expected: &str) -> OgcResponse {
    exception(
        expected,
        ExceptionCode::OperationProcessingFailed,
        Some("version"),
        format!("Incorrect version, try '{expected}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attrs::{AttributeError, AttributeGroups},
        index::{BoreholeRecord, ListedRecord, ListingError, RecordLister},
        ogc::GLTF_MIME,
        registry::ListingEndpoint,
        scene::{glb, SceneError, ScenePayload},
        store::Namespace,
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::{collections::BTreeMap, fs, sync::Mutex, time::Duration};

    const DOC: &[u8] = br#"{"asset":{"version":"2.0"},"buffers":[{"uri":"scene.bin","byteLength":4}]}"#;
    const BIN: &[u8] = &[0xCA, 0xFE, 0xBA, 0xBE];

    struct StaticLister {
        records: Vec<ListedRecord>,
    }

    #[async_trait]
    impl RecordLister for StaticLister {
        async fn list_records(
            &self,
            _endpoint: &ListingEndpoint,
            _max_records: usize,
            _timeout: Duration,
        ) -> Result<Vec<ListedRecord>, ListingError> {
            Ok(self.records.clone())
        }
    }

    struct StaticAttributes {
        groups: Option<AttributeGroups>,
        fail: bool,
    }

    #[async_trait]
    impl crate::attrs::AttributeQuery for StaticAttributes {
        async fn query(
            &self,
            _object_id: &str,
            _model_name: &str,
        ) -> Result<Option<AttributeGroups>, AttributeError> {
            if self.fail {
                Err(AttributeError::Database("table locked".to_string()))
            } else {
                Ok(self.groups.clone())
            }
        }
    }

    /// Scene source handing out a fresh GLB per call; the binary half can
    /// be swapped between calls to exercise idempotence.
    struct StaticScenes {
        bin: Mutex<Vec<u8>>,
        fail: bool,
    }

    impl StaticScenes {
        fn new(bin: &[u8]) -> Self {
            Self { bin: Mutex::new(bin.to_vec()), fail: false }
        }

        fn set_bin(&self, bin: &[u8]) {
            *self.bin.lock().unwrap() = bin.to_vec();
        }
    }

    #[async_trait]
    impl SceneSource for StaticScenes {
        async fn assemble(
            &self,
            _record: &BoreholeRecord,
            _model: &Model,
        ) -> Result<ScenePayload, SceneError> {
            if self.fail {
                return Err(SceneError::Assembly("native call failed".to_string()));
            }
            let bin = self.bin.lock().unwrap().clone();
            glb::parse_glb(&glb::encode_glb(DOC, &bin))
        }
    }

    struct TestEngine {
        engine: PortrayalEngine,
        _dir: tempfile::TempDir,
        scenes: Arc<StaticScenes>,
    }

    fn listed(resource_id: &str) -> ListedRecord {
        ListedRecord {
            resource_id: resource_id.to_string(),
            record: BoreholeRecord {
                nvcl_id: format!("nvcl-{resource_id}"),
                attrs: BTreeMap::new(),
            },
        }
    }

    fn write_registry(dir: &std::path::Path) -> Arc<ModelRegistry> {
        let catalog_path = dir.join("providers.toml");
        fs::write(
            &catalog_path,
            r#"
[[providers]]
name = "test-provider"

[[providers.models]]
name = "Alpha"
crs = "EPSG:28352"
params_file = "alpha.json"
listing_url = "http://upstream.example/alpha"
listing_version = "2.0"
"#,
        )
        .unwrap();
        fs::write(dir.join("alpha.json"), r#"{"scale": 1.0}"#).unwrap();
        Arc::new(ModelRegistry::build(&catalog_path).unwrap())
    }

    fn engine_with(attributes: StaticAttributes, scenes: StaticScenes) -> TestEngine {
        let dir = tempfile::tempdir().unwrap();
        let registry = write_registry(dir.path());
        let store = Arc::new(DiskStore::open(dir.path().join("cache")).unwrap());
        let lister = Arc::new(StaticLister { records: vec![listed("R1"), listed("R2")] });
        let index =
            Arc::new(IndexBuilder::new(Arc::clone(&store), lister, 100, Duration::from_secs(5)));
        let scenes = Arc::new(scenes);

        let engine = PortrayalEngine::new(
            registry,
            store,
            index,
            Arc::new(attributes),
            Arc::clone(&scenes) as Arc<dyn SceneSource>,
        );
        TestEngine { engine, _dir: dir, scenes }
    }

    fn default_engine() -> TestEngine {
        engine_with(
            StaticAttributes {
                groups: Some(AttributeGroups {
                    segment: Some(
                        [("depth".to_string(), json!(120.5))].into_iter().collect(),
                    ),
                    part: None,
                    model: Some(
                        [("name".to_string(), json!("Bore R1"))].into_iter().collect(),
                    ),
                    user: None,
                }),
                fail: false,
            },
            StaticScenes::new(BIN),
        )
    }

    async fn call(engine: &PortrayalEngine, model: &str, query: &str) -> OgcResponse {
        engine.handle_service(model, &KvpQuery::parse(query)).await
    }

    fn body_json(response: &OgcResponse) -> Value {
        serde_json::from_slice(&response.body).expect("body is JSON")
    }

    fn assert_exception(response: &OgcResponse, code: &str, locator: &str) {
        assert_eq!(response.content_type, "application/json");
        let body = body_json(response);
        assert_eq!(body["exceptions"][0]["code"], code, "body: {body}");
        assert_eq!(body["exceptions"][0]["locator"], locator, "body: {body}");
    }

    #[tokio::test]
    async fn test_missing_service_is_missing_parameter() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", "request=GetCapabilities").await;
        assert_exception(&response, "MissingParameterValue", "service");
    }

    #[tokio::test]
    async fn test_empty_service_counts_as_missing() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", "service=&request=GetCapabilities").await;
        assert_exception(&response, "MissingParameterValue", "service");
    }

    #[tokio::test]
    async fn test_unknown_service_not_supported() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", "service=FOO&request=GetCapabilities").await;
        assert_exception(&response, "OperationNotSupported", "service");
    }

    #[tokio::test]
    async fn test_unknown_model_is_invalid_parameter() {
        let t = default_engine();
        let response = call(&t.engine, "Zeta", "service=3DPS&request=GetCapabilities").await;
        assert_exception(&response, "InvalidParameterValue", "model");
    }

    #[tokio::test]
    async fn test_3dps_missing_request() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", "service=3DPS&version=1.0").await;
        assert_exception(&response, "MissingParameterValue", "request");
    }

    #[tokio::test]
    async fn test_capabilities_without_version_succeeds() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", "service=3DPS&request=GetCapabilities").await;
        assert_eq!(response.content_type, "text/xml");
        let xml = String::from_utf8(response.body.to_vec()).unwrap();
        assert!(xml.contains("boreholes"));
        assert!(xml.contains("EPSG:28352"));
    }

    #[tokio::test]
    async fn test_capabilities_with_wrong_version_fails() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=3DPS&version=9.9&request=GetCapabilities").await;
        assert_exception(&response, "OperationProcessingFailed", "version");
    }

    #[tokio::test]
    async fn test_service_and_request_values_are_case_insensitive() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", "service=3dps&request=getcapabilities").await;
        assert_eq!(response.content_type, "text/xml");
    }

    #[tokio::test]
    async fn test_3dps_version_required_for_feature_info() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=3DPS&request=GetFeatureInfoByObjectId").await;
        assert_exception(&response, "MissingParameterValue", "version");
    }

    #[tokio::test]
    async fn test_3dps_wrong_version_fails_processing() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=3DPS&version=2.0&request=GetFeatureInfoByObjectId")
                .await;
        assert_exception(&response, "OperationProcessingFailed", "version");
    }

    #[tokio::test]
    async fn test_recognized_unimplemented_requests_echo_locator() {
        let t = default_engine();
        for request in ["GetScene", "GetView", "GetFeatureInfoByRay", "GetFeatureInfoByPosition"] {
            let response = call(
                &t.engine,
                "Alpha",
                &format!("service=3DPS&version=1.0&request={request}"),
            )
            .await;
            assert_exception(&response, "OperationNotSupported", request);
        }
    }

    #[tokio::test]
    async fn test_unknown_3dps_request_not_supported() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=3DPS&version=1.0&request=GetMoon").await;
        assert_exception(&response, "OperationNotSupported", "request");
    }

    #[tokio::test]
    async fn test_feature_info_requires_object_id() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetFeatureInfoByObjectId&layers=boreholes&format=application/json",
        )
        .await;
        assert_exception(&response, "MissingParameterValue", "objectId");
    }

    #[tokio::test]
    async fn test_feature_info_rejects_wrong_format() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetFeatureInfoByObjectId&objectId=R1&layers=boreholes&format=text/html",
        )
        .await;
        assert_exception(&response, "InvalidParameterValue", "format");
    }

    #[tokio::test]
    async fn test_feature_info_rejects_wrong_layer() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetFeatureInfoByObjectId&objectId=R1&layers=rivers&format=application/json",
        )
        .await;
        assert_exception(&response, "InvalidParameterValue", "layers");
    }

    #[tokio::test]
    async fn test_feature_info_merges_attribute_groups() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetFeatureInfoByObjectId&objectId=R1&layers=boreholes&format=application/json",
        )
        .await;

        assert_eq!(response.content_type, "application/json");
        let body = body_json(&response);
        assert_eq!(body["type"], "FeatureInfoList");
        assert_eq!(body["totalFeatureInfoCount"], 1);
        assert_eq!(body["featureInfos"][0]["objectId"], "R1");

        let attributes = body["featureInfos"][0]["featureAttributeList"].as_array().unwrap();
        assert_eq!(attributes.len(), 2);
        assert!(attributes.iter().any(|a| a["name"] == "depth" && a["value"] == json!(120.5)));
        assert!(attributes.iter().any(|a| a["name"] == "name" && a["value"] == "Bore R1"));
    }

    #[tokio::test]
    async fn test_feature_info_query_failure_degrades_to_blank() {
        let t = engine_with(
            StaticAttributes { groups: None, fail: true },
            StaticScenes::new(BIN),
        );
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetFeatureInfoByObjectId&objectId=R1&layers=boreholes&format=application/json",
        )
        .await;

        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body.as_ref(), b" ");
    }

    #[tokio::test]
    async fn test_wfs_property_value_returns_ordered_ids() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=WFS&version=2.0&request=GetPropertyValue&outputFormat=application/json&typeName=boreholes&valueReference=borehole:id",
        )
        .await;

        let body = body_json(&response);
        assert_eq!(body["type"], "ValueCollection");
        assert_eq!(body["totalValues"], 2);
        assert_eq!(body["values"], json!(["R1", "R2"]));
    }

    #[tokio::test]
    async fn test_wfs_typename_mismatch_locator_is_lowercase() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=WFS&version=2.0&request=GetPropertyValue&outputFormat=application/json&typeName=other&valueReference=borehole:id",
        )
        .await;
        assert_exception(&response, "OperationProcessingFailed", "typename");
    }

    #[tokio::test]
    async fn test_wfs_value_reference_mismatch() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=WFS&version=2.0&request=GetPropertyValue&outputFormat=application/json&typeName=boreholes&valueReference=borehole:name",
        )
        .await;
        assert_exception(&response, "OperationProcessingFailed", "valuereference");
    }

    #[tokio::test]
    async fn test_wfs_missing_output_format() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=WFS&version=2.0&request=GetPropertyValue&typeName=boreholes&valueReference=borehole:id",
        )
        .await;
        assert_exception(&response, "MissingParameterValue", "outputFormat");
    }

    #[tokio::test]
    async fn test_wfs_wrong_version() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=WFS&version=1.1&request=GetPropertyValue").await;
        assert_exception(&response, "OperationProcessingFailed", "version");
    }

    #[tokio::test]
    async fn test_wfs_unknown_request_not_supported() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=WFS&version=2.0&request=GetFeature").await;
        assert_exception(&response, "OperationNotSupported", "request");
    }

    fn resource_query(id: &str) -> String {
        format!(
            "service=3DPS&version=1.0&request=GetResourceById&resourceId={id}&outputFormat=model%2Fgltf%2Bjson%3Bcharset%3DUTF-8"
        )
    }

    #[tokio::test]
    async fn test_resource_missing_output_format() {
        let t = default_engine();
        let response =
            call(&t.engine, "Alpha", "service=3DPS&version=1.0&request=GetResourceById&resourceId=R1")
                .await;
        assert_exception(&response, "MissingParameterValue", "outputFormat");
    }

    #[tokio::test]
    async fn test_resource_wrong_output_format() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetResourceById&resourceId=R1&outputFormat=application/json",
        )
        .await;
        assert_exception(&response, "InvalidParameterValue", "outputFormat");
    }

    #[tokio::test]
    async fn test_resource_missing_id() {
        let t = default_engine();
        let response = call(
            &t.engine,
            "Alpha",
            "service=3DPS&version=1.0&request=GetResourceById&outputFormat=model%2Fgltf%2Bjson%3Bcharset%3DUTF-8",
        )
        .await;
        assert_exception(&response, "MissingParameterValue", "resourceId");
    }

    #[tokio::test]
    async fn test_resource_unknown_id_is_empty_object() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", &resource_query("R99")).await;
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.body.as_ref(), b"{}");
    }

    #[tokio::test]
    async fn test_resource_document_is_rewritten() {
        let t = default_engine();
        let response = call(&t.engine, "Alpha", &resource_query("R1")).await;

        assert_eq!(response.content_type, GLTF_MIME);
        let doc = body_json(&response);
        assert_eq!(doc["buffers"][0]["uri"], "Alpha/scene.bin?id=R1");
    }

    #[tokio::test]
    async fn test_resource_failure_degrades_to_empty_object() {
        let t = engine_with(
            StaticAttributes { groups: None, fail: false },
            StaticScenes { bin: Mutex::new(BIN.to_vec()), fail: true },
        );
        let response = call(&t.engine, "Alpha", &resource_query("R1")).await;
        assert_eq!(response.body.as_ref(), b"{}");
    }

    #[tokio::test]
    async fn test_split_then_blob_fetch_roundtrip() {
        let t = default_engine();
        let document = call(&t.engine, "Alpha", &resource_query("R1")).await;

        // The rewritten URI embeds the id the client uses for the fetch.
        let doc = body_json(&document);
        let uri = doc["buffers"][0]["uri"].as_str().unwrap();
        let id = uri.rsplit("?id=").next().unwrap();

        let blob =
            t.engine.handle_blob("Alpha", &KvpQuery::parse(&format!("id={id}")));
        assert_eq!(blob.content_type, "application/octet-stream");
        assert_eq!(blob.body.as_ref(), BIN);
    }

    #[tokio::test]
    async fn test_cached_binary_survives_changed_generator_output() {
        let t = default_engine();
        call(&t.engine, "Alpha", &resource_query("R1")).await;

        // The generator now produces different bytes; the cached binary
        // must not change.
        t.scenes.set_bin(&[9, 9, 9, 9]);
        call(&t.engine, "Alpha", &resource_query("R1")).await;

        let blob = t.engine.handle_blob("Alpha", &KvpQuery::parse("id=R1"));
        assert_eq!(blob.body.as_ref(), BIN);
    }

    #[tokio::test]
    async fn test_blob_fetch_without_id_is_blank() {
        let t = default_engine();
        let response = t.engine.handle_blob("Alpha", &KvpQuery::parse(""));
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body.as_ref(), b" ");
    }

    #[tokio::test]
    async fn test_blob_fetch_miss_is_blank() {
        let t = default_engine();
        let response = t.engine.handle_blob("Alpha", &KvpQuery::parse("id=R404"));
        assert_eq!(response.body.as_ref(), b" ");
    }

    #[tokio::test]
    async fn test_blob_store_key_is_model_scoped() {
        let t = default_engine();
        call(&t.engine, "Alpha", &resource_query("R1")).await;

        assert!(t.engine.store().get(Namespace::Blob, "Alpha/R1").is_some());
        let other_model = t.engine.handle_blob("Beta", &KvpQuery::parse("id=R1"));
        assert_eq!(other_model.body.as_ref(), b" ");
    }

    #[tokio::test]
    async fn test_exception_version_follows_service() {
        let t = default_engine();
        let wfs = call(&t.engine, "Alpha", "service=WFS").await;
        assert_eq!(body_json(&wfs)["version"], "2.0");

        let threedps = call(&t.engine, "Alpha", "service=3DPS").await;
        assert_eq!(body_json(&threedps)["version"], "1.0");
    }
}
