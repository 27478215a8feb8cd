//! # Controller telemetry snapshot

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Flat key-value view of the controller
pub type Snapshot = BTreeMap<String, SnapshotValue>;

/// Snapshot keys
pub struct SnapshotEntry;
impl SnapshotEntry {
    pub const COMMAND_COUNTER: &'static str = "commandCounter";
    pub const SERIAL_NUMBER: &'static str = "serialNumber";
    pub const STEP_COUNTER: &'static str = "stepCounter";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Counter(u64),
    Text(String),
}
impl From<u64> for SnapshotValue {
    fn from(value: u64) -> Self {
        Self::Counter(value)
    }
}
impl From<String> for SnapshotValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl fmt::Display for SnapshotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

/// Prepends `prefix` to every key of `snapshot`
pub fn prepend<I>(prefix: &str, snapshot: I) -> Snapshot
where
    I: IntoIterator<Item = (&'static str, SnapshotValue)>,
{
    snapshot
        .into_iter()
        .map(|(key, value)| (format!("{prefix}{key}"), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_keys() {
        let snapshot = prepend(
            "dm.",
            [
                (SnapshotEntry::COMMAND_COUNTER, SnapshotValue::from(3)),
                (SnapshotEntry::SERIAL_NUMBER, SnapshotValue::from("sim".to_string())),
            ],
        );
        assert_eq!(snapshot["dm.commandCounter"], SnapshotValue::Counter(3));
        assert_eq!(snapshot["dm.serialNumber"].to_string(), "sim");
        assert!(!snapshot.contains_key(SnapshotEntry::COMMAND_COUNTER));
    }
}
