//! Change log structures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names whose change makes an entry a price change.
pub const PRICE_FIELDS: [&str; 2] = ["price_incl_tax", "price_excl_tax"];

/// Field name whose change makes an entry an availability change.
pub const AVAILABILITY_FIELD: &str = "availability";

/// Sentinel key marking a freshly created record.
const NEW_RECORD_FIELD: &str = "new_record";

/// What kind of change a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
}

/// Old/new value pair for one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

impl FieldChange {
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

/// One append-only change log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// URL of the record this change belongs to
    pub url: String,

    /// Whether the record was created or updated
    pub kind: ChangeKind,

    /// Changed field name mapped to its (old, new) values
    pub changed_fields: BTreeMap<String, FieldChange>,

    /// When the change was detected
    pub timestamp: DateTime<Utc>,
}

impl ChangeEntry {
    /// Entry for a freshly created record, carrying the new-record sentinel.
    pub fn created(url: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let mut changed_fields = BTreeMap::new();
        changed_fields.insert(
            NEW_RECORD_FIELD.to_string(),
            FieldChange::new(Value::Null, true),
        );
        Self {
            url: url.into(),
            kind: ChangeKind::Created,
            changed_fields,
            timestamp,
        }
    }

    /// Entry for an updated record with its per-field diff.
    pub fn updated(
        url: impl Into<String>,
        changed_fields: BTreeMap<String, FieldChange>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            kind: ChangeKind::Updated,
            changed_fields,
            timestamp,
        }
    }

    /// True when any price field changed.
    pub fn touches_price(&self) -> bool {
        PRICE_FIELDS
            .iter()
            .any(|f| self.changed_fields.contains_key(*f))
    }

    /// True when the availability count changed.
    pub fn touches_availability(&self) -> bool {
        self.changed_fields.contains_key(AVAILABILITY_FIELD)
    }
}
