use std::collections::BTreeMap;

use eframe::egui::Color32;
use regex::Regex;
use thiserror::Error;

use crate::color::ColorScale;
use crate::data::model::Run;
use crate::storage::{KeyValueStore, StorageError};

/// Above this many runs a fresh selector starts with nothing selected.
pub const MAX_RUNS_TO_ENABLE_BY_DEFAULT: usize = 20;
pub const STORAGE_ALL_VALUE: &str = "$all";
pub const STORAGE_NONE_VALUE: &str = "$none";
/// Prefix of a name-list selection, used when some selected run has no id.
pub const STORAGE_NAMES_PREFIX: &str = "$names:";

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("selector has no persistence id")]
    MissingPersistenceId,
    #[error("invalid tag filter: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The experiment a selector row lists runs for.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub id: Option<i64>,
    pub name: String,
    pub start_time: Option<f64>,
}

impl Default for Experiment {
    fn default() -> Self {
        Self {
            id: None,
            name: "Unknown experiment".to_string(),
            start_time: None,
        }
    }
}

/// What the user currently picked in one selector row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub runs: Vec<Run>,
    pub tag_regex: String,
}

impl Selection {
    /// Tags matching the regex; an empty regex matches everything.
    pub fn matching_tags<'a>(
        &self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<&'a str>, SelectorError> {
        if self.tag_regex.is_empty() {
            return Ok(tags.into_iter().collect());
        }
        let re = Regex::new(&self.tag_regex)?;
        Ok(tags.into_iter().filter(|t| re.is_match(t)).collect())
    }
}

// ---------------------------------------------------------------------------
// Id list encoding
// ---------------------------------------------------------------------------

/// Compact storage form of numeric run ids: base-36, comma separated.
pub fn encode_id_array(ids: &[i64]) -> String {
    ids.iter()
        .map(|&id| to_base36(id))
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`encode_id_array`]. Tokens that do not parse are skipped.
pub fn decode_id_array(s: &str) -> Vec<i64> {
    s.split(',')
        .filter(|t| !t.is_empty())
        .filter_map(|t| match i64::from_str_radix(t, 36) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("skipping stored run id {t:?}: {e}");
                None
            }
        })
        .collect()
}

fn to_base36(id: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if id == 0 {
        return "0".to_string();
    }
    let mut n = id.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if id < 0 {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// DataSelectRow
// ---------------------------------------------------------------------------

enum Key {
    Runs,
    Tags,
}

/// One experiment's row in the data selector: which runs are checked and
/// which tags pass the filter, persisted under the row's id.
#[derive(Debug, Clone)]
pub struct DataSelectRow {
    experiment: Experiment,
    /// Runs come from a plain log directory and have no ids.
    no_experiment: bool,
    persistence_id: Option<String>,
    enabled: bool,
    should_color_runs: bool,
    runs: Vec<Run>,
    /// Synthetic ids of the checked runs, in run order.
    selected: Vec<String>,
    run_state: String,
    tag_regex: String,
    data_ready: bool,
}

impl DataSelectRow {
    pub fn new(persistence_id: Option<String>, experiment: Experiment, no_experiment: bool) -> Self {
        Self {
            experiment,
            no_experiment,
            persistence_id,
            enabled: true,
            should_color_runs: false,
            runs: Vec::new(),
            selected: Vec::new(),
            run_state: String::new(),
            tag_regex: String::new(),
            data_ready: false,
        }
    }

    pub fn with_run_coloring(mut self, on: bool) -> Self {
        self.should_color_runs = on;
        self
    }

    fn key(&self, key: Key) -> Result<String, SelectorError> {
        let id = self
            .persistence_id
            .as_deref()
            .ok_or(SelectorError::MissingPersistenceId)?;
        // 'g' marks a group.
        Ok(match key {
            Key::Runs => format!("gr{id}"),
            Key::Tags => format!("gt{id}"),
        })
    }

    /// Restore the stored run selection and tag filter.
    pub fn attach(&mut self, store: &dyn KeyValueStore) -> Result<(), SelectorError> {
        self.run_state = store.get(&self.key(Key::Runs)?, "");
        self.tag_regex = store.get(&self.key(Key::Tags)?, "");
        self.data_ready = false;
        log::debug!(
            "selector {:?} restored runs={:?} tags={:?}",
            self.persistence_id,
            self.run_state,
            self.tag_regex
        );
        Ok(())
    }

    pub fn detach(&mut self) {
        self.data_ready = false;
    }

    /// Accept the fetched run listing. Without a stored selection, small
    /// experiments start fully selected and large ones empty.
    pub fn set_runs(
        &mut self,
        runs: Vec<Run>,
        store: &mut dyn KeyValueStore,
    ) -> Result<Selection, SelectorError> {
        self.runs = if self.no_experiment {
            let mut seen = Vec::<String>::new();
            runs.into_iter()
                .filter(|r| {
                    let fresh = !seen.contains(&r.name);
                    if fresh {
                        seen.push(r.name.clone());
                    }
                    fresh
                })
                .map(|r| Run { id: None, start_time: None, ..r })
                .collect()
        } else {
            runs
        };
        self.data_ready = true;

        if self.run_state.is_empty() {
            let value = if self.runs.len() <= MAX_RUNS_TO_ENABLE_BY_DEFAULT {
                STORAGE_ALL_VALUE
            } else {
                STORAGE_NONE_VALUE
            };
            store.set(&self.key(Key::Runs)?, value, "")?;
            self.run_state = value.to_string();
        }

        let all = self.all_ids();
        let chosen = self.deserialize(&all, &self.run_state);
        self.selected = all.into_iter().filter(|id| chosen.contains(id)).collect();
        Ok(self.selection())
    }

    /// Checked state of every run, keyed by synthetic id.
    pub fn runs_selection_state(&self) -> BTreeMap<String, bool> {
        self.all_ids()
            .into_iter()
            .map(|id| {
                let on = self.selected.contains(&id);
                (id, on)
            })
            .collect()
    }

    /// `(id, title)` for every run, for the checkbox list.
    pub fn run_options(&self) -> Vec<(String, String)> {
        self.runs
            .iter()
            .map(|r| (self.synthetic_id(r), r.name.clone()))
            .collect()
    }

    pub fn set_selected<S: AsRef<str>>(
        &mut self,
        ids: &[S],
        store: &mut dyn KeyValueStore,
    ) -> Result<Selection, SelectorError> {
        self.selected = self
            .all_ids()
            .into_iter()
            .filter(|id| ids.iter().any(|s| s.as_ref() == id))
            .collect();
        self.persist_selected(store)?;
        Ok(self.selection())
    }

    pub fn toggle_run(
        &mut self,
        id: &str,
        store: &mut dyn KeyValueStore,
    ) -> Result<Selection, SelectorError> {
        let mut ids = self.selected.clone();
        match ids.iter().position(|s| s == id) {
            Some(pos) => {
                ids.remove(pos);
            }
            None => ids.push(id.to_string()),
        }
        self.set_selected(&ids, store)
    }

    pub fn select_all(&mut self, store: &mut dyn KeyValueStore) -> Result<Selection, SelectorError> {
        let all = self.all_ids();
        self.set_selected(&all, store)
    }

    pub fn select_none(&mut self, store: &mut dyn KeyValueStore) -> Result<Selection, SelectorError> {
        self.set_selected::<String>(&[], store)
    }

    /// Set the tag filter. The pattern is validated before it is stored.
    pub fn set_tag_regex(
        &mut self,
        pattern: &str,
        store: &mut dyn KeyValueStore,
    ) -> Result<Selection, SelectorError> {
        if !pattern.is_empty() {
            Regex::new(pattern)?;
        }
        self.tag_regex = pattern.to_string();
        if self.data_ready {
            store.set(&self.key(Key::Tags)?, pattern, "")?;
        }
        Ok(self.selection())
    }

    /// Forget the persisted state; the row is going away.
    pub fn remove(&mut self, store: &mut dyn KeyValueStore) -> Result<(), SelectorError> {
        store.set(&self.key(Key::Runs)?, "", "")?;
        store.set(&self.key(Key::Tags)?, "", "")?;
        Ok(())
    }

    /// Checked runs as full records, plus the tag filter.
    pub fn selection(&self) -> Selection {
        let by_id: BTreeMap<String, &Run> = self
            .runs
            .iter()
            .map(|r| (self.synthetic_id(r), r))
            .collect();
        Selection {
            runs: self
                .selected
                .iter()
                .filter_map(|id| by_id.get(id).map(|r| (*r).clone()))
                .collect(),
            tag_regex: self.tag_regex.clone(),
        }
    }

    /// Run color when run coloring is on.
    pub fn run_color(&self, run: &Run, scale: &ColorScale) -> Option<Color32> {
        self.should_color_runs
            .then(|| scale.color_or_default(&run.name))
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn tag_regex(&self) -> &str {
        &self.tag_regex
    }

    pub fn is_data_ready(&self) -> bool {
        self.data_ready
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn synthetic_id(&self, run: &Run) -> String {
        match (self.no_experiment, run.id) {
            (false, Some(id)) => id.to_string(),
            _ => run.name.clone(),
        }
    }

    fn all_ids(&self) -> Vec<String> {
        self.runs.iter().map(|r| self.synthetic_id(r)).collect()
    }

    fn persist_selected(&mut self, store: &mut dyn KeyValueStore) -> Result<(), SelectorError> {
        if !self.data_ready {
            return Ok(());
        }
        let value = self.serialize(&self.selected);
        store.set(&self.key(Key::Runs)?, &value, "")?;
        self.run_state = value;
        Ok(())
    }

    fn serialize(&self, selected: &[String]) -> String {
        if selected.len() == self.runs.len() {
            return STORAGE_ALL_VALUE.to_string();
        }
        if selected.is_empty() {
            return STORAGE_NONE_VALUE.to_string();
        }
        if self.no_experiment {
            return selected.join(",");
        }
        let ids: Option<Vec<i64>> = selected.iter().map(|s| s.parse().ok()).collect();
        match ids {
            Some(ids) => encode_id_array(&ids),
            None => {
                log::debug!("selection holds runs without ids, storing names");
                let names: Vec<&str> = self
                    .runs
                    .iter()
                    .filter(|r| selected.contains(&self.synthetic_id(r)))
                    .map(|r| r.name.as_str())
                    .collect();
                format!("{STORAGE_NAMES_PREFIX}{}", names.join(","))
            }
        }
    }

    fn deserialize(&self, all: &[String], stored: &str) -> Vec<String> {
        match stored {
            STORAGE_ALL_VALUE => all.to_vec(),
            STORAGE_NONE_VALUE => Vec::new(),
            _ if self.no_experiment => stored.split(',').map(str::to_string).collect(),
            _ if stored.starts_with(STORAGE_NAMES_PREFIX) => {
                let names: Vec<&str> = stored[STORAGE_NAMES_PREFIX.len()..].split(',').collect();
                self.runs
                    .iter()
                    .filter(|r| names.contains(&r.name.as_str()))
                    .map(|r| self.synthetic_id(r))
                    .collect()
            }
            _ => decode_id_array(stored)
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn run(id: i64, name: &str) -> Run {
        Run {
            id: Some(id),
            name: name.to_string(),
            start_time: Some(1_000.0 + id as f64),
            tags: vec!["loss".into(), "accuracy".into()],
        }
    }

    fn named_runs(n: usize) -> Vec<Run> {
        (0..n).map(|i| run(i as i64, &format!("run{i}"))).collect()
    }

    fn attached(id: &str, no_experiment: bool, store: &MemoryStore) -> DataSelectRow {
        let mut row = DataSelectRow::new(Some(id.into()), Experiment::default(), no_experiment);
        row.attach(store).unwrap();
        row
    }

    #[test]
    fn attach_requires_persistence_id() {
        let store = MemoryStore::new();
        let mut row = DataSelectRow::new(None, Experiment::default(), true);
        assert!(matches!(
            row.attach(&store),
            Err(SelectorError::MissingPersistenceId)
        ));
    }

    #[test]
    fn small_experiments_default_to_all() {
        let mut store = MemoryStore::new();
        let mut row = attached("1", false, &store);
        let selection = row.set_runs(named_runs(20), &mut store).unwrap();
        assert_eq!(selection.runs.len(), 20);
        assert_eq!(store.get("gr1", ""), STORAGE_ALL_VALUE);
    }

    #[test]
    fn large_experiments_default_to_none() {
        let mut store = MemoryStore::new();
        let mut row = attached("1", false, &store);
        let selection = row.set_runs(named_runs(21), &mut store).unwrap();
        assert!(selection.runs.is_empty());
        assert_eq!(store.get("gr1", ""), STORAGE_NONE_VALUE);
    }

    #[test]
    fn subset_round_trips_through_storage() {
        let mut store = MemoryStore::new();
        let mut row = attached("7", false, &store);
        row.set_runs(named_runs(5), &mut store).unwrap();
        let selection = row.set_selected(&["1", "40", "3"], &mut store).unwrap();
        let names: Vec<&str> = selection.runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["run1", "run3"]);
        assert_eq!(store.get("gr7", ""), "1,3");

        let mut again = attached("7", false, &store);
        let restored = again.set_runs(named_runs(5), &mut store).unwrap();
        assert_eq!(restored, selection);
    }

    #[test]
    fn no_experiment_mode_uses_names() {
        let mut store = MemoryStore::new();
        let mut row = attached("x", true, &store);
        let mut runs = named_runs(3);
        runs.push(run(9, "run0"));
        row.set_runs(runs, &mut store).unwrap();
        assert_eq!(row.runs().len(), 3);

        let selection = row.toggle_run("run1", &mut store).unwrap();
        assert_eq!(selection.runs.len(), 2);
        assert_eq!(store.get("grx", ""), "run0,run2");

        row.select_none(&mut store).unwrap();
        assert_eq!(store.get("grx", ""), STORAGE_NONE_VALUE);
        assert!(row.runs_selection_state().values().all(|on| !on));
    }

    #[test]
    fn tag_regex_is_validated_and_persisted_once_ready() {
        let mut store = MemoryStore::new();
        let mut row = attached("1", false, &store);
        row.set_tag_regex("acc", &mut store).unwrap();
        assert!(!store.contains("gt1"));

        row.set_runs(named_runs(2), &mut store).unwrap();
        let selection = row.set_tag_regex("^loss$", &mut store).unwrap();
        assert_eq!(store.get("gt1", ""), "^loss$");
        assert_eq!(
            selection.matching_tags(["loss", "accuracy", "loss/eval"]).unwrap(),
            ["loss"]
        );
        assert!(matches!(
            row.set_tag_regex("(", &mut store),
            Err(SelectorError::InvalidRegex(_))
        ));
        assert_eq!(row.tag_regex(), "^loss$");
    }

    #[test]
    fn remove_clears_persistence() {
        let mut store = MemoryStore::new();
        let mut row = attached("1", false, &store);
        row.set_runs(named_runs(2), &mut store).unwrap();
        row.set_tag_regex("loss", &mut store).unwrap();
        row.remove(&mut store).unwrap();
        assert!(!store.contains("gr1"));
        assert!(!store.contains("gt1"));
    }

    #[test]
    fn id_arrays_are_compact() {
        let ids = [0, 35, 36, 1_000_000, -5];
        let encoded = encode_id_array(&ids);
        assert_eq!(encoded, "0,z,10,lfls,-5");
        assert_eq!(decode_id_array(&encoded), ids);
        assert_eq!(decode_id_array("a,??,b"), [10, 11]);
    }

    #[test]
    fn run_color_only_when_enabled() {
        let mut scale = ColorScale::default();
        scale.set_domain(&["run0"]);
        let plain = DataSelectRow::new(Some("1".into()), Experiment::default(), true);
        let colored = plain.clone().with_run_coloring(true);
        let r = run(0, "run0");
        assert_eq!(plain.run_color(&r, &scale), None);
        assert_eq!(colored.run_color(&r, &scale), scale.color_for("run0").ok());
    }

    #[test]
    fn runs_without_ids_survive_a_subset_selection() {
        let mut store = MemoryStore::new();
        let mut row = attached("3", false, &store);
        let mut runs = named_runs(3);
        runs[2].id = None;
        row.set_runs(runs.clone(), &mut store).unwrap();

        // Run 2's id is its name.
        let selection = row.set_selected(&["0", "run2"], &mut store).unwrap();
        assert_eq!(selection.runs.len(), 2);
        assert_eq!(store.get("gr3", ""), "$names:run0,run2");

        let mut again = attached("3", false, &store);
        let restored = again.set_runs(runs, &mut store).unwrap();
        assert_eq!(restored, selection);
    }
}
