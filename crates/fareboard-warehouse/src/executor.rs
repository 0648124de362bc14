//! Query executor: one warehouse call, one validated table, one cache slot.

use std::sync::Arc;

use fareboard_core::{ResultTable, SessionCache};

use crate::client::Warehouse;
use crate::error::QueryError;

/// An immutable query definition: SQL text, optional destination table, and
/// the cache slot the result lands in.
#[derive(Debug, Clone)]
pub struct QueryDefinition {
    /// Human-readable name for logs and error messages.
    pub name: String,
    /// The SQL text; opaque to this layer, validated by the warehouse.
    pub sql: String,
    /// Destination table with write-truncate semantics, if any.
    pub destination: Option<String>,
    /// Cache slot the result is stored under.
    pub slot: String,
}

impl QueryDefinition {
    /// Define a query targeting `slot` with no destination table.
    #[must_use]
    pub fn new(name: impl Into<String>, sql: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            destination: None,
            slot: slot.into(),
        }
    }

    /// Materialize into `destination` before reading back.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Runs query definitions against the warehouse collaborator.
///
/// No memoization here — re-invoking the same definition re-executes. The
/// session cache decides reuse at a higher level.
pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
}

impl QueryExecutor {
    /// Wrap a warehouse collaborator.
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    /// Execute a definition and validate the response into a [`ResultTable`].
    ///
    /// Errors are returned as values, never raised past this boundary.
    pub fn execute(&self, def: &QueryDefinition) -> Result<ResultTable, QueryError> {
        tracing::info!(query = %def.name, "executing warehouse query");
        let response = self
            .warehouse
            .execute(&def.sql, def.destination.as_deref())
            .map_err(|e| {
                tracing::warn!(query = %def.name, error = %e, "warehouse query failed");
                e
            })?;
        let table = ResultTable::try_new(response.schema, &response.batches)?;
        tracing::info!(
            query = %def.name,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "query complete"
        );
        Ok(table)
    }

    /// Execute and, on success only, store the result in the definition's
    /// cache slot. On failure the slot keeps its prior value (stale but
    /// valid), so downstream views never see a failure marker.
    pub fn run_into(
        &self,
        def: &QueryDefinition,
        cache: &SessionCache,
    ) -> Result<Arc<ResultTable>, QueryError> {
        let table = self.execute(def)?.into_shared();
        cache.set(&def.slot, Arc::clone(&table));
        Ok(table)
    }
}
