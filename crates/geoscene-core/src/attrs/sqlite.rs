//! `SQLite`-backed attribute store.
//!
//! Attributes live in one table of (model, object id, group, name, value)
//! rows; values are stored as text and parsed as JSON where possible so
//! numeric attributes survive with their type.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use super::{AttributeError, AttributeGroups, AttributeQuery};

/// Attribute store reading from a `SQLite` database.
pub struct SqliteAttributeStore {
    pool: SqlitePool,
}

impl SqliteAttributeStore {
    /// Connects to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Database`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, AttributeError> {
        let pool = SqlitePool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool, used by tests with in-memory databases.
    #[must_use]
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn get_text(row: &SqliteRow, column: &str) -> Result<String, AttributeError> {
        row.try_get::<String, _>(column)
            .map_err(|e| AttributeError::Database(format!("column '{column}': {e}")))
    }
}

/// Parses a stored value as JSON, falling back to the raw string.
fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[async_trait]
impl AttributeQuery for SqliteAttributeStore {
    async fn query(
        &self,
        object_id: &str,
        model_name: &str,
    ) -> Result<Option<AttributeGroups>, AttributeError> {
        let rows = sqlx::query(
            "SELECT group_name, attr_name, attr_value \
             FROM borehole_attributes WHERE model = ?1 AND object_id = ?2",
        )
        .bind(model_name)
        .bind(object_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut groups = AttributeGroups::default();
        for row in &rows {
            let group_name = Self::get_text(row, "group_name")?;
            let attr_name = Self::get_text(row, "attr_name")?;
            let attr_value = Self::get_text(row, "attr_value")?;

            let slot = match group_name.as_str() {
                "segment" => &mut groups.segment,
                "part" => &mut groups.part,
                "model" => &mut groups.model,
                "user" => &mut groups.user,
                other => {
                    debug!(group = other, "unknown attribute group skipped");
                    continue;
                }
            };
            slot.get_or_insert_with(serde_json::Map::new)
                .insert(attr_name, parse_value(&attr_value));
        }

        Ok(Some(groups))
    }
}
