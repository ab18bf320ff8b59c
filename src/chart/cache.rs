use std::collections::BTreeMap;

use crate::data::model::{Datum, SeriesMetadata};

/// Host-side store of everything fed to the chart. Outlives chart instances
/// and is replayed onto each new one.
#[derive(Debug, Clone, Default)]
pub struct SeriesCache {
    data: BTreeMap<String, Vec<Datum>>,
    metadata: BTreeMap<String, SeriesMetadata>,
    visible: Vec<String>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` for `name`. Returns `false` when it equals what is
    /// already cached.
    pub fn set_data(&mut self, name: &str, data: Vec<Datum>) -> bool {
        if self.data.get(name) == Some(&data) {
            return false;
        }
        self.data.insert(name.to_string(), data);
        true
    }

    /// Store metadata for `name`, registering the series if unknown.
    /// Returns `false` when nothing changed.
    pub fn set_metadata(&mut self, name: &str, metadata: SeriesMetadata) -> bool {
        if self.metadata.get(name) == Some(&metadata) {
            return false;
        }
        self.data.entry(name.to_string()).or_default();
        self.metadata.insert(name.to_string(), metadata);
        true
    }

    /// Replace the visible set. Duplicates are dropped (first occurrence
    /// wins) and unknown names are registered with no data. Returns `false`
    /// when the resulting list equals the current one.
    pub fn set_visible<S: AsRef<str>>(&mut self, names: &[S]) -> bool {
        let mut visible: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !visible.iter().any(|v| v == name) {
                visible.push(name.to_string());
            }
        }
        if visible == self.visible {
            return false;
        }
        for name in &visible {
            self.data.entry(name.clone()).or_default();
        }
        self.visible = visible;
        true
    }

    pub fn data(&self, name: &str) -> Option<&[Datum]> {
        self.data.get(name).map(Vec::as_slice)
    }

    pub fn metadata(&self, name: &str) -> Option<&SeriesMetadata> {
        self.metadata.get(name)
    }

    pub fn visible(&self) -> &[String] {
        &self.visible
    }

    /// Every known series name, sorted.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Forget every series, e.g. when a different dataset is loaded.
    pub fn clear(&mut self) {
        self.data.clear();
        self.metadata.clear();
        self.visible.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MetadataValue;

    #[test]
    fn equal_data_is_a_no_op() {
        let mut cache = SeriesCache::new();
        let data = vec![Datum::new(0, 1.0, f64::NAN), Datum::new(1, 2.0, 3.0)];
        assert!(cache.set_data("a", data.clone()));
        assert!(!cache.set_data("a", data));
        assert!(cache.set_data("a", vec![]));
    }

    #[test]
    fn equal_metadata_is_a_no_op() {
        let mut cache = SeriesCache::new();
        let mut meta = SeriesMetadata::new();
        meta.insert("name".into(), MetadataValue::from("train"));
        assert!(cache.set_metadata("a", meta.clone()));
        assert!(!cache.set_metadata("a", meta));
        assert!(cache.contains("a"));
    }

    #[test]
    fn visible_set_is_deduplicated_and_registered() {
        let mut cache = SeriesCache::new();
        assert!(cache.set_visible(&["b", "a", "b", "c"]));
        assert_eq!(cache.visible(), ["b", "a", "c"]);
        assert!(cache.contains("c"));
        assert_eq!(cache.data("c"), Some(&[][..]));

        assert!(!cache.set_visible(&["b", "a", "c"]));
        assert!(cache.set_visible(&["a", "b", "c"]));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut cache = SeriesCache::new();
        cache.set_data("a", vec![Datum::new(0, 1.0, 2.0)]);
        cache.set_metadata("b", SeriesMetadata::new());
        cache.set_visible(&["a"]);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.visible().is_empty());
        assert!(cache.metadata("b").is_none());
        // The same data is new again after a clear.
        assert!(cache.set_data("a", vec![Datum::new(0, 1.0, 2.0)]));
    }
}
