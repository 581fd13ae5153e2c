//! Feature-attribute query collaborator.
//!
//! `GetFeatureInfoByObjectId` answers come from an external attribute
//! store, consulted through [`AttributeQuery`]. A result carries up to
//! four optional structured groups which merge into one flat attribute
//! set, later groups winning on key collision.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use sqlite::SqliteAttributeStore;

/// Errors raised by the attribute store.
#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("attribute database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AttributeError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// The four optional attribute groups a query can return.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeGroups {
    pub segment: Option<Map<String, Value>>,
    pub part: Option<Map<String, Value>>,
    pub model: Option<Map<String, Value>>,
    pub user: Option<Map<String, Value>>,
}

impl AttributeGroups {
    /// Flattens the groups in segment → part → model → user order.
    ///
    /// On a key collision the later group's value wins.
    #[must_use]
    pub fn merged(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for group in [&self.segment, &self.part, &self.model, &self.user] {
            if let Some(group) = group {
                for (key, value) in group {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }
}

/// Attribute-query collaborator interface.
#[async_trait]
pub trait AttributeQuery: Send + Sync {
    /// Fetches the attribute groups for one object id within a model.
    ///
    /// `Ok(None)` means the object is unknown to the store, which is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when the store itself fails; the caller
    /// degrades to the placeholder response.
    async fn query(
        &self,
        object_id: &str,
        model_name: &str,
    ) -> Result<Option<AttributeGroups>, AttributeError>;
}
