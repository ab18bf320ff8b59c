use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MetadataValue – a single cell of series metadata
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value attached to a series (display name,
/// experiment, hyper-parameters...). Must be `Ord` for use in `BTreeSet`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put MetadataValue in BTreeSet --

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Date(d) => write!(f, "{d}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

/// Opaque per-series metadata. The tooltip `Name` column reads the `"name"` key.
pub type SeriesMetadata = BTreeMap<String, MetadataValue>;

// ---------------------------------------------------------------------------
// Datum – one scalar observation
// ---------------------------------------------------------------------------

/// One observation of a scalar summary.
///
/// Equality is bitwise on the floating-point fields, so a datum holding a
/// NaN scalar still compares equal to an identical copy of itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Datum {
    pub step: i64,
    /// Seconds since the Unix epoch.
    pub wall_time: f64,
    pub scalar: f64,
}

impl Datum {
    pub fn new(step: i64, wall_time: f64, scalar: f64) -> Self {
        Self {
            step,
            wall_time,
            scalar,
        }
    }

    /// Copy of this datum with the scalar replaced.
    pub fn with_scalar(&self, scalar: f64) -> Self {
        Self { scalar, ..*self }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step
            && self.wall_time.to_bits() == other.wall_time.to_bits()
            && self.scalar.to_bits() == other.scalar.to_bits()
    }
}

// ---------------------------------------------------------------------------
// Run – one entry of a run listing
// ---------------------------------------------------------------------------

/// A training run as returned by a run listing: `{id, name, startTime, tags}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Database id. Absent for runs discovered from a plain log directory.
    pub id: Option<i64>,
    pub name: String,
    pub start_time: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// ScalarDataset – every loaded run/tag series
// ---------------------------------------------------------------------------

/// All loaded scalar series, indexed run → tag → data.
#[derive(Debug, Clone, Default)]
pub struct ScalarDataset {
    pub series: BTreeMap<String, BTreeMap<String, Vec<Datum>>>,
}

impl ScalarDataset {
    /// Append one observation, keeping ingestion order.
    pub fn push(&mut self, run: &str, tag: &str, datum: Datum) {
        self.series
            .entry(run.to_string())
            .or_default()
            .entry(tag.to_string())
            .or_default()
            .push(datum);
    }

    /// Merge another dataset into this one; later data for the same run/tag
    /// is appended.
    pub fn merge(&mut self, other: ScalarDataset) {
        for (run, tags) in other.series {
            let entry = self.series.entry(run).or_default();
            for (tag, data) in tags {
                entry.entry(tag).or_default().extend(data);
            }
        }
    }

    /// Sorted run names.
    pub fn run_names(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    /// Union of all tags across runs, sorted.
    pub fn tags(&self) -> BTreeSet<String> {
        self.series
            .values()
            .flat_map(|tags| tags.keys().cloned())
            .collect()
    }

    pub fn data(&self, run: &str, tag: &str) -> Option<&[Datum]> {
        self.series.get(run)?.get(tag).map(Vec::as_slice)
    }

    /// Earliest wall time of a run, across all of its tags.
    pub fn start_time(&self, run: &str) -> Option<f64> {
        self.series
            .get(run)?
            .values()
            .flat_map(|data| data.iter().map(|d| d.wall_time))
            .filter(|t| t.is_finite())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Total number of observations.
    pub fn len(&self) -> usize {
        self.series
            .values()
            .flat_map(|tags| tags.values())
            .map(Vec::len)
            .sum()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
