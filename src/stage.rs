//! View pipeline stages.
//!
//! A view is computed by running borrowed records through a chain of
//! stages: one [`FilterStage`] per active filter, then an optional
//! [`SortStage`]. Stages never touch the underlying dataset; they only
//! reorder or drop references to its records.

use std::cmp::Ordering;

use crate::record::Record;
use crate::view::{Coercion, FilterSpec, SortDirection, SortSpec};

/// A step in the view pipeline.
pub trait Stage {
    /// Process the current record sequence, returning the next one.
    fn apply<'a>(&self, records: Vec<&'a Record>) -> Vec<&'a Record>;

    /// The display name of this stage.
    fn name(&self) -> String;
}

/// Record counts observed around one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrace {
    pub name: String,
    pub input_count: usize,
    pub output_count: usize,
}

/// Keeps records whose `column` equals `value` exactly.
///
/// A record without the column never matches.
#[derive(Debug, Clone)]
pub struct FilterStage {
    column: String,
    value: String,
}

impl FilterStage {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.column) == Some(self.value.as_str())
    }
}

impl Stage for FilterStage {
    fn apply<'a>(&self, mut records: Vec<&'a Record>) -> Vec<&'a Record> {
        records.retain(|r| self.matches(r));
        records
    }

    fn name(&self) -> String {
        format!("FILTER {} = {:?}", self.column, self.value)
    }
}

/// Stable sort on one column.
#[derive(Debug, Clone)]
pub struct SortStage {
    key: String,
    direction: SortDirection,
    coercion: Coercion,
}

impl SortStage {
    pub fn new(key: impl Into<String>, direction: SortDirection, coercion: Coercion) -> Self {
        Self {
            key: key.into(),
            direction,
            coercion,
        }
    }

    pub fn compare(&self, left: &Record, right: &Record) -> Ordering {
        let ord = self.coercion.compare(left.get(&self.key), right.get(&self.key));
        self.direction.apply(ord)
    }
}

impl Stage for SortStage {
    fn apply<'a>(&self, mut records: Vec<&'a Record>) -> Vec<&'a Record> {
        records.sort_by(|a, b| self.compare(a, b));
        records
    }

    fn name(&self) -> String {
        format!("SORT {} {} {}", self.key, self.direction, self.coercion)
    }
}

/// Build the stage chain for a filter/sort pair.
pub fn build_stages(filters: &FilterSpec, sort: &SortSpec) -> Vec<Box<dyn Stage>> {
    let mut stages: Vec<Box<dyn Stage>> = filters
        .active()
        .map(|(column, value)| Box::new(FilterStage::new(column, value)) as Box<dyn Stage>)
        .collect();

    if let Some(key) = &sort.key {
        stages.push(Box::new(SortStage::new(
            key.as_str(),
            sort.direction,
            sort.coercion,
        )));
    }

    stages
}

/// Push records through each stage in order, recording counts.
pub fn run_stages<'a>(
    records: Vec<&'a Record>,
    stages: &[Box<dyn Stage>],
) -> (Vec<&'a Record>, Vec<StageTrace>) {
    let mut current = records;
    let mut traces = Vec::with_capacity(stages.len());

    for stage in stages {
        let input_count = current.len();
        current = stage.apply(current);
        let name = stage.name();
        log::trace!("{name}: {input_count} -> {}", current.len());
        traces.push(StageTrace {
            name,
            input_count,
            output_count: current.len(),
        });
    }

    (current, traces)
}
