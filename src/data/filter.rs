use super::model::{LabelRow, LabelTable};

// ---------------------------------------------------------------------------
// Pure-compound selection
// ---------------------------------------------------------------------------

/// Sample ids of the pure samples labelled with one compound class.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundGroup {
    /// Position of the class among the label table's class columns.
    pub index: usize,
    pub class_name: String,
    pub sample_ids: Vec<String>,
}

impl CompoundGroup {
    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }
}

/// Rows whose one-hot label vector has exactly one compound.
pub fn pure_samples(table: &LabelTable) -> Vec<&LabelRow> {
    table.rows.iter().filter(|row| row.n_comp() == 1.0).collect()
}

/// One group per class column, in header order.
///
/// A group is always returned, even when it is empty, so callers can report
/// classes without any pure sample.
pub fn compound_groups(table: &LabelTable) -> Vec<CompoundGroup> {
    let pures = pure_samples(table);
    table
        .class_names()
        .iter()
        .enumerate()
        .map(|(index, class_name)| CompoundGroup {
            index,
            class_name: class_name.clone(),
            sample_ids: pures
                .iter()
                .filter(|row| row.indicators.get(index).is_some_and(|&v| v != 0.0))
                .map(|row| row.sample_id.clone())
                .collect(),
        })
        .collect()
}
