//! Per-model parameter and connection registry.
//!
//! The registry is built once at process start from a TOML provider catalog
//! (providers own models; each model names its coordinate reference system,
//! a conversion-parameter file, and its upstream listing endpoint). After
//! construction it is immutable and shared by reference.
//!
//! The whole registry persists in the cache store under two fixed keys so a
//! later process start can skip reconstruction; a miss on either key
//! triggers a full rebuild and an idempotent repopulate.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{DiskStore, Namespace};

/// Fixed store key for the per-model conversion-parameter map.
pub const PARAMS_KEY: &str = "model-params";

/// Fixed store key for the per-model listing-endpoint map.
pub const ENDPOINTS_KEY: &str = "listing-endpoints";

/// Errors raised while building the registry.
///
/// Any of these is fatal at startup; the process cannot serve without a
/// complete registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("provider catalog not found at {path}: {source}")]
    CatalogMissing { path: PathBuf, source: io::Error },

    #[error("provider catalog is not valid TOML: {0}")]
    CatalogParse(#[from] toml::de::Error),

    #[error("conversion parameters for model '{model}' unreadable at {path}: {reason}")]
    ConversionParams { model: String, path: PathBuf, reason: String },
}

/// Serializable descriptor of an upstream feature-listing connection.
///
/// A plain (endpoint, version) value that is reconnected lazily per call,
/// rather than a live client handle persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEndpoint {
    pub url: String,
    pub version: String,
}

/// One registered geological model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Unique name, used as the URL path segment.
    pub name: String,
    /// Coordinate reference system code, e.g. `EPSG:28352`.
    pub crs: String,
    /// Opaque conversion parameters loaded from the model's parameter file.
    pub conversion: serde_json::Value,
    /// Upstream feature-listing connection descriptor.
    pub listing: ListingEndpoint,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    providers: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
struct Provider {
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    models: Vec<CatalogModel>,
}

#[derive(Debug, Deserialize)]
struct CatalogModel {
    name: String,
    crs: String,
    /// Path to the conversion-parameter JSON file, relative to the catalog.
    params_file: PathBuf,
    listing_url: String,
    listing_version: String,
}

/// Persisted form of the parameter half of the registry.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedParams {
    crs: String,
    conversion: serde_json::Value,
}

/// Immutable map of model name to [`Model`], built once at startup.
#[derive(Debug)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<Model>>,
}

impl ModelRegistry {
    /// Restores the registry from the store, or rebuilds it from the
    /// catalog and populates the store.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the catalog (or a referenced
    /// parameter file) is missing or malformed. Store failures are not
    /// fatal; they only disable the persistence shortcut.
    pub fn load(catalog_path: &Path, store: &DiskStore) -> Result<Self, RegistryError> {
        if let Some(registry) = Self::restore(store) {
            info!(models = registry.len(), "model registry restored from cache");
            return Ok(registry);
        }

        let registry = Self::build(catalog_path)?;
        registry.persist(store);
        info!(models = registry.len(), catalog = %catalog_path.display(), "model registry built");
        Ok(registry)
    }

    /// Builds the registry directly from the provider catalog.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the catalog or any referenced
    /// conversion-parameter file cannot be read or parsed.
    pub fn build(catalog_path: &Path) -> Result<Self, RegistryError> {
        let raw = fs::read_to_string(catalog_path).map_err(|source| {
            RegistryError::CatalogMissing { path: catalog_path.to_path_buf(), source }
        })?;
        let catalog: Catalog = toml::from_str(&raw)?;
        let base = catalog_path.parent().unwrap_or_else(|| Path::new("."));

        let mut models = HashMap::new();
        for provider in catalog.providers {
            for entry in provider.models {
                let params_path = base.join(&entry.params_file);
                let conversion = read_conversion_params(&entry.name, &params_path)?;

                let model = Model {
                    name: entry.name.clone(),
                    crs: entry.crs,
                    conversion,
                    listing: ListingEndpoint {
                        url: entry.listing_url,
                        version: entry.listing_version,
                    },
                };
                debug!(model = %model.name, crs = %model.crs, "model registered");
                models.insert(entry.name, Arc::new(model));
            }
        }

        Ok(Self { models })
    }

    /// Looks a model up by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name).map(Arc::clone)
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Writes the registry into the store under its two fixed keys.
    ///
    /// Adds are insert-if-absent, so a concurrent or earlier writer's copy
    /// is kept untouched. Store failures are logged, not propagated.
    pub fn persist(&self, store: &DiskStore) {
        let params: HashMap<&str, PersistedParams> = self
            .models
            .values()
            .map(|m| {
                (
                    m.name.as_str(),
                    PersistedParams { crs: m.crs.clone(), conversion: m.conversion.clone() },
                )
            })
            .collect();
        let endpoints: HashMap<&str, &ListingEndpoint> =
            self.models.values().map(|m| (m.name.as_str(), &m.listing)).collect();

        for (key, value) in [
            (PARAMS_KEY, serde_json::to_vec(&params)),
            (ENDPOINTS_KEY, serde_json::to_vec(&endpoints)),
        ] {
            match value {
                Ok(bytes) => {
                    if let Err(e) = store.add(Namespace::Registry, key, &bytes) {
                        warn!(key = key, error = %e, "failed to persist registry");
                    }
                }
                Err(e) => warn!(key = key, error = %e, "failed to serialize registry"),
            }
        }
    }

    /// Attempts to restore the registry from the store's two fixed keys.
    ///
    /// Returns `None` when either key is absent or undecodable; the caller
    /// falls back to a full rebuild.
    #[must_use]
    pub fn restore(store: &DiskStore) -> Option<Self> {
        let params_bytes = store.get(Namespace::Registry, PARAMS_KEY)?;
        let endpoints_bytes = store.get(Namespace::Registry, ENDPOINTS_KEY)?;

        let params: HashMap<String, PersistedParams> = match serde_json::from_slice(&params_bytes)
        {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "cached registry params undecodable, rebuilding");
                return None;
            }
        };
        let endpoints: HashMap<String, ListingEndpoint> =
            match serde_json::from_slice(&endpoints_bytes) {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "cached registry endpoints undecodable, rebuilding");
                    return None;
                }
            };

        let mut models = HashMap::new();
        for (name, persisted) in params {
            let Some(listing) = endpoints.get(&name).cloned() else {
                warn!(model = %name, "cached registry halves disagree, rebuilding");
                return None;
            };
            models.insert(
                name.clone(),
                Arc::new(Model {
                    name,
                    crs: persisted.crs,
                    conversion: persisted.conversion,
                    listing,
                }),
            );
        }

        Some(Self { models })
    }
}

fn read_conversion_params(model: &str, path: &Path) -> Result<serde_json::Value, RegistryError> {
    let raw = fs::read_to_string(path).map_err(|e| RegistryError::ConversionParams {
        model: model.to_string(),
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| RegistryError::ConversionParams {
        model: model.to_string(),
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
