//! C1: Applicability Table.
//!
//! A static mapping, loaded once and cached in process memory as a read-only
//! `Arc<HashMap<..>>` — no reload discipline is implemented; the table is
//! treated as read-only after startup.

use crate::types::{Applicability, Applicable};
use std::collections::HashMap;
use std::sync::Arc;

/// Accessor `lookup(power_source_id) -> Applicability`, defaulting to
/// all-`Y` for unknown identifiers.
#[derive(Debug, Clone)]
pub struct ApplicabilityTable {
    table: Arc<HashMap<String, Applicability>>,
}

impl ApplicabilityTable {
    pub fn new(table: HashMap<String, Applicability>) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// A small built-in default table, seeded with representative power
    /// sources for tests and the demo deployment.
    pub fn built_in_default() -> Self {
        let mut table = HashMap::new();
        table.insert(
            "ps-engine-drive-minimal".to_string(),
            Applicability {
                feeder: Applicable::N,
                cooler: Applicable::N,
                interconnector: Applicable::N,
                torch: Applicable::Y,
                accessories: Applicable::Y,
            },
        );
        table.insert(
            "ps-multiprocess-full".to_string(),
            Applicability::all_yes(),
        );
        Self::new(table)
    }

    pub fn lookup(&self, power_source_id: &str) -> Applicability {
        self.table
            .get(power_source_id)
            .cloned()
            .unwrap_or_else(Applicability::all_yes)
    }
}

impl Default for ApplicabilityTable {
    fn default() -> Self {
        Self::built_in_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_power_source_defaults_to_all_yes() {
        let table = ApplicabilityTable::built_in_default();
        let app = table.lookup("unknown-id");
        assert_eq!(app.feeder, Applicable::Y);
        assert_eq!(app.cooler, Applicable::Y);
        assert_eq!(app.interconnector, Applicable::Y);
        assert_eq!(app.torch, Applicable::Y);
        assert_eq!(app.accessories, Applicable::Y);
    }

    #[test]
    fn known_power_source_reflects_seeded_table() {
        let table = ApplicabilityTable::built_in_default();
        let app = table.lookup("ps-engine-drive-minimal");
        assert_eq!(app.feeder, Applicable::N);
        assert_eq!(app.cooler, Applicable::N);
        assert_eq!(app.interconnector, Applicable::N);
        assert_eq!(app.torch, Applicable::Y);
    }
}
