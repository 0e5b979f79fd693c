use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Opaque identifier of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of an upload session.
///
/// Allocated from a monotonic sequence, so a larger id was always created
/// later than a smaller one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── User ──────────────────────────────────────────────────────────────────────

/// A registered account that owns upload sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// ── EquipmentItem ─────────────────────────────────────────────────────────────

/// One row of an uploaded equipment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    /// Value of the `Equipment Name` column, verbatim.
    pub name: String,
    /// Value of the `Type` column, verbatim.
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

// ── EquipmentDistribution ─────────────────────────────────────────────────────

/// Frequency count of equipment-type labels.
///
/// Keys keep the order in which each label was first recorded, and that order
/// survives a JSON round trip.
#[derive(Debug, Clone, Default)]
pub struct EquipmentDistribution {
    entries: Vec<(String, u64)>,
    /// Position of each label in `entries`.
    index: HashMap<String, usize>,
}

impl EquipmentDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `label`.
    pub fn record(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => self.set(label.to_string(), 1),
        }
    }

    /// Occurrence count for `label`, if it was ever recorded.
    pub fn get(&self, label: &str) -> Option<u64> {
        self.index.get(label).map(|&pos| self.entries[pos].1)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Labels in first-occurrence order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// `(label, count)` pairs in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// Overwrite the count of `label`, appending it when new.
    fn set(&mut self, label: String, count: u64) {
        match self.index.get(&label) {
            Some(&pos) => self.entries[pos].1 = count,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, count));
            }
        }
    }
}

impl PartialEq for EquipmentDistribution {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for EquipmentDistribution {}

impl<'a> FromIterator<&'a str> for EquipmentDistribution {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut distribution = Self::new();
        for label in iter {
            distribution.record(label);
        }
        distribution
    }
}

impl Serialize for EquipmentDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EquipmentDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = EquipmentDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of equipment type to count")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let capacity = access.size_hint().unwrap_or(0);
                let mut distribution = EquipmentDistribution {
                    entries: Vec::with_capacity(capacity),
                    index: HashMap::with_capacity(capacity),
                };
                while let Some((key, count)) = access.next_entry::<String, u64>()? {
                    distribution.set(key, count);
                }
                Ok(distribution)
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

// ── SessionSummary ────────────────────────────────────────────────────────────

/// Aggregate statistics over one uploaded table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Number of equipment rows summarised.
    pub total_count: u64,
    /// Mean of the `Flowrate` column, `0.0` for an empty table.
    pub avg_flowrate: f64,
    /// Mean of the `Pressure` column, `0.0` for an empty table.
    pub avg_pressure: f64,
    /// Mean of the `Temperature` column, `0.0` for an empty table.
    pub avg_temperature: f64,
    /// Frequency of each `Type` label.
    pub equipment_distribution: EquipmentDistribution,
}

// ── UploadSession ─────────────────────────────────────────────────────────────

/// A persisted upload: the summary plus the rows it was computed from.
///
/// Created once per successful upload and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: SessionId,
    /// Owner of the session.
    pub user_id: UserId,
    /// Assigned by the caller at commit time.
    pub created_at: DateTime<Utc>,
    /// File name as supplied by the uploader.
    pub file_name: String,
    #[serde(flatten)]
    pub summary: SessionSummary,
    /// Rows in their original file order.
    #[serde(default)]
    pub equipment_items: Vec<EquipmentItem>,
}

impl UploadSession {
    /// `true` when count, distribution and items agree with each other.
    ///
    /// The distribution must hold exactly the type frequencies of the items.
    pub fn is_consistent(&self) -> bool {
        let distribution = &self.summary.equipment_distribution;
        let count = self.summary.total_count;
        if distribution.total() != count || self.equipment_items.len() as u64 != count {
            return false;
        }
        let counted: EquipmentDistribution = self
            .equipment_items
            .iter()
            .map(|item| item.equipment_type.as_str())
            .collect();
        counted.len() == distribution.len()
            && counted
                .iter()
                .all(|(label, n)| distribution.get(label) == Some(n))
    }
}
