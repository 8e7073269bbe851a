//! Reconciliation of an input header row against a schema.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{error::HeaderMismatch, normalize::is_blank, schema::Schema};

/// Column name to field position, taken from a verified header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Checks that every schema column is present and no non-blank header
    /// repeats; all discrepancies are reported together.
    pub fn reconcile<R>(
        schema: &Schema<R>,
        actual: &[String],
        path: &str,
    ) -> Result<Self, HeaderMismatch> {
        let mut positions = HashMap::new();
        let mut seen = HashSet::new();
        let mut duplicate = BTreeSet::new();
        for (idx, header) in actual.iter().enumerate() {
            if is_blank(header) {
                continue;
            }
            if seen.insert(header.as_str()) {
                positions.insert(header.clone(), idx);
            } else {
                duplicate.insert(header.clone());
            }
        }

        let expected: BTreeSet<String> = schema.header_row().into_iter().collect();
        let missing: BTreeSet<String> = expected
            .iter()
            .filter(|name| !positions.contains_key(name.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() && duplicate.is_empty() {
            return Ok(Self { positions });
        }
        Err(HeaderMismatch {
            path: path.to_string(),
            missing,
            duplicate,
            expected,
            actual: actual.to_vec(),
        })
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}
