use std::collections::BTreeMap;

use crate::Target;

/// A point-in-time capture of a target's attribute values, stored in their
/// canonical encoded form so comparisons are textual and deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    entries: BTreeMap<String, String>,
}

impl Snapshot {
    /// Capture the current attributes of `target`. Attributes whose value
    /// has no canonical encoding are skipped, not fatal.
    pub fn capture<T: Target + ?Sized>(target: &T) -> Self {
        let mut entries = BTreeMap::new();
        for (name, value) in target.attributes() {
            match value.encode() {
                Ok(encoded) => {
                    entries.insert(name, encoded);
                }
                Err(error) => {
                    tracing::debug!(attribute = %name, %error, "skipping unencodable attribute");
                }
            }
        }
        Self { entries }
    }

    /// The assignments needed to recreate this snapshot's state on an
    /// instance currently in the `fresh` state: every attribute of `self`
    /// that is absent from `fresh` or whose encoded value differs. Emission
    /// order is by attribute name, ascending.
    pub fn diff(&self, fresh: &Snapshot) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(name, encoded)| fresh.entries.get(*name) != Some(encoded))
            .map(|(name, encoded)| (name.clone(), encoded.clone()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, encoded)| (name.as_str(), encoded.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
