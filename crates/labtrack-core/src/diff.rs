//! Shallow configuration diffing.
//!
//! The diff compares top-level keys only. It exists to suppress no-op
//! versions, not to provide patch or merge semantics. An accepted update
//! replaces the configuration wholesale, so a key absent from the update is
//! a removal and is recorded as such.

use crate::model::ConfigMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One changed top-level key.
///
/// Keys equal in old and new configuration are omitted from the change set,
/// so the three variants cover every recorded state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum FieldChange {
    /// Key absent before, present now.
    Added {
        /// New value
        new: Value,
    },
    /// Key present before and now, with a different value.
    Updated {
        /// Prior value
        old: Value,
        /// New value
        new: Value,
    },
    /// Key present before, absent now.
    Removed {
        /// Prior value
        old: Value,
    },
}

/// Changed keys of one update, in key order.
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// Compute the shallow diff from `old` to `new`.
#[must_use]
pub fn shallow_diff(old: &ConfigMap, new: &ConfigMap) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for (key, new_value) in new {
        match old.get(key) {
            None => {
                changes.insert(
                    key.clone(),
                    FieldChange::Added {
                        new: new_value.clone(),
                    },
                );
            }
            Some(old_value) if old_value != new_value => {
                changes.insert(
                    key.clone(),
                    FieldChange::Updated {
                        old: old_value.clone(),
                        new: new_value.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    for (key, old_value) in old {
        if !new.contains_key(key) {
            changes.insert(
                key.clone(),
                FieldChange::Removed {
                    old: old_value.clone(),
                },
            );
        }
    }

    changes
}
