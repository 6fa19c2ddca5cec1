//! The modification ledger.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::ArchivePath;
use crate::rules::ReplacementRule;

/// One change made to a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The icon asset was replaced.
    IconReplaced,
    /// The member was moved to a new path.
    Renamed {
        /// New path of the member.
        to: ArchivePath,
    },
    /// The manifest was patched.
    ManifestPatched,
    /// A literal rule fired.
    Replaced {
        /// Text that was found.
        old: String,
        /// Text that was inserted.
        new: String,
    },
}

impl Change {
    /// Creates a [`Change::Replaced`] for a fired rule.
    pub fn replaced(rule: &ReplacementRule) -> Self {
        Change::Replaced {
            old: rule.old.clone(),
            new: rule.new.clone(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::IconReplaced => f.write_str("Icon replaced"),
            Change::Renamed { to } => write!(f, "Renamed to {to}"),
            Change::ManifestPatched => {
                f.write_str("Patched manifest (update_url removed, name updated)")
            }
            Change::Replaced { old, new } => write!(f, "{old} -> {new}"),
        }
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// All changes made to one member, in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModificationRecord {
    /// Member path. For a rename this is the path before the move.
    #[serde(rename = "file")]
    pub path: ArchivePath,
    /// Changes made to the member.
    #[serde(rename = "replacements")]
    pub changes: Vec<Change>,
}

impl ModificationRecord {
    /// Creates a record.
    pub fn new(path: ArchivePath, changes: Vec<Change>) -> Self {
        Self { path, changes }
    }
}

/// Ordered list of per-member modification records.
///
/// Serializes as `[{"file": ..., "replacements": [...]}, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModificationLedger {
    records: Vec<ModificationRecord>,
}

impl ModificationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record with a single change.
    pub fn record(&mut self, path: ArchivePath, change: Change) {
        self.records.push(ModificationRecord::new(path, vec![change]));
    }

    /// Appends a record.
    pub fn push(&mut self, record: ModificationRecord) {
        self.records.push(record);
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing was modified.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the records in order.
    pub fn records(&self) -> &[ModificationRecord] {
        &self.records
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, ModificationRecord> {
        self.records.iter()
    }

    /// Returns the record for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&ModificationRecord> {
        self.records.iter().find(|r| r.path.as_str() == path)
    }

    /// Returns the total number of changes across all records.
    pub fn change_count(&self) -> usize {
        self.records.iter().map(|r| r.changes.len()).sum()
    }
}

impl<'a> IntoIterator for &'a ModificationLedger {
    type Item = &'a ModificationRecord;
    type IntoIter = std::slice::Iter<'a, ModificationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
