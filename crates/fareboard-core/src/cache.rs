//! Session-scoped result cache.
//!
//! Maps a slot name to the most recent [`ResultTable`] for that slot:
//! at most one value per slot, replaced wholesale by the next successful
//! query run. This is deliberately not an eviction cache — a handful of
//! named slots live for the duration of one interactive session and are
//! dropped with it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::table::ResultTable;

/// Named slots holding the latest raw result each.
///
/// Replacement is atomic from the consumer's point of view: a slot always
/// yields either the complete prior table or the complete new one, never an
/// interleaving, because `set` inserts a fully-built [`Arc`].
#[derive(Debug, Default)]
pub struct SessionCache {
    slots: RwLock<HashMap<String, Arc<ResultTable>>>,
}

impl SessionCache {
    /// Create an empty cache; every slot starts unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `table` in `slot`, overwriting any prior value. No merge.
    pub fn set(&self, slot: &str, table: Arc<ResultTable>) {
        let prior = self.slots.write().insert(slot.to_string(), table);
        if prior.is_some() {
            tracing::debug!(slot, "replaced cached result");
        } else {
            tracing::debug!(slot, "cached first result");
        }
    }

    /// The current table for `slot`, or `None` if nothing has been stored
    /// this session. Consumers must branch on `None` and prompt the user to
    /// run the query rather than render a default table.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<Arc<ResultTable>> {
        self.slots.read().get(slot).cloned()
    }

    /// Empty `slot`, returning whatever it held.
    pub fn clear(&self, slot: &str) -> Option<Arc<ResultTable>> {
        self.slots.write().remove(slot)
    }

    /// Names of all slots that currently hold a result.
    #[must_use]
    pub fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    fn table_with_value(v: i64) -> Arc<ResultTable> {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![v]))]).unwrap();
        ResultTable::from_batch(batch).unwrap().into_shared()
    }

    #[test]
    fn test_empty_slot_is_none() {
        let cache = SessionCache::new();
        assert!(cache.get("monthly_kpi").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = SessionCache::new();
        let a = table_with_value(1);
        let b = table_with_value(2);
        cache.set("kpi", a);
        cache.set("kpi", Arc::clone(&b));
        let got = cache.get("kpi").unwrap();
        assert!(Arc::ptr_eq(&got, &b));
    }

    #[test]
    fn test_clear_empties_slot() {
        let cache = SessionCache::new();
        cache.set("kpi", table_with_value(1));
        assert!(cache.clear("kpi").is_some());
        assert!(cache.get("kpi").is_none());
        assert!(cache.clear("kpi").is_none());
    }

    #[test]
    fn test_slots_are_independent() {
        let cache = SessionCache::new();
        cache.set("kpi", table_with_value(1));
        assert!(cache.get("map").is_none());
        assert_eq!(cache.slot_names(), vec!["kpi".to_string()]);
    }
}
