//! Stable multi-column sorting of a dataset.

use std::cmp::Ordering;

use anyhow::{Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::ComparableValue,
    dataset::{Dataset, Row},
};

fn ascending_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortKey {
    pub column: String,
    #[serde(default = "ascending_by_default")]
    pub ascending: bool,
}

impl SortKey {
    pub fn new(column: impl Into<String>, ascending: bool) -> Self {
        Self {
            column: column.into(),
            ascending,
        }
    }

    /// Parses `column[:asc|desc]`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.split(':');
        let column = parts
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Sort directive is missing a column"))?;
        let direction = parts.next().unwrap_or("asc");
        let ascending = match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => true,
            "desc" => false,
            other => {
                return Err(anyhow!("Unknown sort direction '{other}'"));
            }
        };
        Ok(SortKey::new(column, ascending))
    }
}

struct SortInstruction {
    index: usize,
    ascending: bool,
}

/// Sorts rows in place. Keys naming columns absent from the dataset are skipped.
pub fn sort_dataset(dataset: &mut Dataset, keys: &[SortKey]) {
    let plan = keys
        .iter()
        .filter_map(|key| match dataset.column_index(&key.column) {
            Some(index) => Some(SortInstruction {
                index,
                ascending: key.ascending,
            }),
            None => {
                debug!("Sort column '{}' not present; skipping", key.column);
                None
            }
        })
        .collect::<Vec<_>>();
    if plan.is_empty() {
        return;
    }
    dataset.rows.sort_by(|a, b| compare_rows(a, b, &plan));
}

fn compare_rows(a: &Row, b: &Row, plan: &[SortInstruction]) -> Ordering {
    for directive in plan {
        let left = ComparableValue(a.get(directive.index).and_then(Option::as_ref));
        let right = ComparableValue(b.get(directive.index).and_then(Option::as_ref));
        let ord = left.cmp(&right);
        if ord != Ordering::Equal {
            return if directive.ascending {
                ord
            } else {
                ord.reverse()
            };
        }
    }
    Ordering::Equal
}
