use super::model::{Run, ScalarDataset};

/// Anything that can list the runs of one experiment.
pub trait RunSource {
    fn runs(&self) -> Vec<Run>;
}

impl RunSource for ScalarDataset {
    /// Runs in name order; ids are positions in that order.
    fn runs(&self) -> Vec<Run> {
        self.series
            .iter()
            .enumerate()
            .map(|(i, (name, tags))| Run {
                id: Some(i as i64),
                name: name.clone(),
                start_time: self.start_time(name),
                tags: tags.keys().cloned().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Datum;

    #[test]
    fn runs_carry_ids_tags_and_start_time() {
        let mut ds = ScalarDataset::default();
        ds.push("b", "loss", Datum::new(0, 50.0, 1.0));
        ds.push("a", "loss", Datum::new(0, 20.0, 1.0));
        ds.push("a", "accuracy", Datum::new(0, 10.0, 0.5));

        let runs = ds.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, Some(0));
        assert_eq!(runs[0].name, "a");
        assert_eq!(runs[0].start_time, Some(10.0));
        assert_eq!(runs[0].tags, vec!["accuracy", "loss"]);
        assert_eq!(runs[1].id, Some(1));
    }
}
