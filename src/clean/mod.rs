//! Rule-driven cleaning engine.
//!
//! [`clean_dataset`] is a single deterministic pass over an input dataset:
//!
//! 1. validate the rule set and copy the input,
//! 2. drop exact duplicate rows,
//! 3. run each configured column through its string or numeric processor, in
//!    declaration order, against the rows that are still active,
//! 4. split the rows into the clean output and the removed-rows audit output,
//! 5. tally [`CleaningStats`].
//!
//! Processors never touch reasons directly; every flag or removal goes through
//! [`tracker::ViolationTracker`], which is also the only place the working set
//! shrinks.

pub mod behavior;
pub mod numeric_rules;
pub mod string_rules;
pub mod tracker;

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    dataset::{Dataset, Row},
    io_utils,
    rules::{BehaviorKey, ColumnKind, RuleSet},
};

use self::{numeric_rules::NumericActions, tracker::ViolationTracker};

pub const REMOVAL_REASON_COLUMN: &str = "Removal Reason";
pub const FLAG_REASON_COLUMN: &str = "Flag Reason";

/// Row accounting for one cleaning run. `rows_input` counts rows before
/// deduplication, so `rows_input = duplicates_removed + rows_output + rows_removed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_input: usize,
    pub duplicates_removed: usize,
    pub rows_output: usize,
    pub rows_removed: usize,
    pub rows_flagged: usize,
}

impl CleaningStats {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        io_utils::ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self).context("Serializing cleaning stats")?;
        fs::write(path, json).with_context(|| format!("Writing cleaning stats to {path:?}"))
    }
}

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    /// Kept rows plus the `Flag Reason` column.
    pub clean: Dataset,
    /// Removed rows in removal order, plus `Removal Reason` and `Flag Reason`.
    pub removed: Dataset,
    pub stats: CleaningStats,
}

pub fn clean_dataset(input: &Dataset, rules: &RuleSet) -> Result<CleanOutcome> {
    rules.validate().context("Validating rules")?;

    let mut working = input.clone();
    for reserved in [REMOVAL_REASON_COLUMN, FLAG_REASON_COLUMN] {
        if working.drop_column(reserved) {
            warn!("Input already has a '{reserved}' column; its contents are discarded");
        }
    }

    let rows_input = working.len();
    let duplicates_removed = working.dedup_rows();
    if duplicates_removed > 0 {
        debug!("Dropped {duplicates_removed} duplicate row(s)");
    }

    let mut tracker = ViolationTracker::new(working.len());
    let category = working.column_index(&rules.category_column);

    for spec in &rules.columns {
        let Some(column) = working.column_index(&spec.name) else {
            debug!("Column '{}' not present in dataset; skipping", spec.name);
            continue;
        };
        match &spec.kind {
            ColumnKind::String(string_rules) => {
                let action = behavior::resolve(spec, BehaviorKey::Violation, &rules.defaults);
                string_rules::process(
                    &mut working,
                    column,
                    &spec.name,
                    string_rules,
                    action,
                    &mut tracker,
                )?;
            }
            ColumnKind::Numeric(numeric_rules) => {
                let actions = NumericActions {
                    missing: behavior::resolve(spec, BehaviorKey::Missing, &rules.defaults),
                    bounds: behavior::resolve(spec, BehaviorKey::Bounds, &rules.defaults),
                };
                numeric_rules::process(
                    &mut working,
                    column,
                    &spec.name,
                    numeric_rules,
                    category,
                    actions,
                    &mut tracker,
                );
            }
        }
        debug!(
            "Processed column '{}': {} row(s) still active",
            spec.name,
            tracker.active().len()
        );
    }

    Ok(partition(working, &tracker, rows_input, duplicates_removed))
}

fn partition(
    working: Dataset,
    tracker: &ViolationTracker,
    rows_input: usize,
    duplicates_removed: usize,
) -> CleanOutcome {
    let Dataset { headers, rows } = working;
    let mut slots: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
    let mut take = |row: usize| slots[row].take().unwrap_or_default();
    let reason_cell = |text: String| Some(Value::Text(text));

    let mut clean_headers = headers.clone();
    clean_headers.push(FLAG_REASON_COLUMN.to_string());
    let mut rows_flagged = 0usize;
    let mut clean_rows = Vec::with_capacity(tracker.active().len());
    for &row in tracker.active() {
        let flag = tracker.flag_text(row);
        if !flag.is_empty() {
            rows_flagged += 1;
        }
        let mut cells = take(row);
        cells.push(reason_cell(flag));
        clean_rows.push(cells);
    }

    let mut removed_headers = headers;
    removed_headers.push(REMOVAL_REASON_COLUMN.to_string());
    removed_headers.push(FLAG_REASON_COLUMN.to_string());
    let mut removed_rows = Vec::with_capacity(tracker.removed().len());
    for &row in tracker.removed() {
        let mut cells = take(row);
        cells.push(reason_cell(tracker.removal_text(row)));
        cells.push(reason_cell(tracker.flag_text(row)));
        removed_rows.push(cells);
    }

    let stats = CleaningStats {
        rows_input,
        duplicates_removed,
        rows_output: clean_rows.len(),
        rows_removed: removed_rows.len(),
        rows_flagged,
    };
    CleanOutcome {
        clean: Dataset::new(clean_headers, clean_rows),
        removed: Dataset::new(removed_headers, removed_rows),
        stats,
    }
}
