//! Read-only audit of a dataset against a rule set.
//!
//! The checks reuse the predicates the cleaning processors use, so a report run
//! on the raw input predicts what cleaning will touch and a report run on the
//! cleaned output should come back quiet. Values are coerced the same way but
//! are never rewritten, and no absolute value is taken; negative counts are
//! reported on their own.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{coerce_number, normalized_text},
    dataset::Dataset,
    rules::{ColumnKind, RuleSet},
};

pub const MISSING_TOKEN: &str = "<missing>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCount {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBoundsCount {
    pub column: String,
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidValues {
    pub column: String,
    /// Distinct offending values, sorted; missing cells appear as [`MISSING_TOKEN`].
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub missing_values: Vec<ColumnCount>,
    pub negative_values: Vec<ColumnCount>,
    pub out_of_bounds: Vec<ColumnCount>,
    pub out_of_category_bounds: Vec<CategoryBoundsCount>,
    pub invalid_values: Vec<InvalidValues>,
}

impl QualityReport {
    /// True when no check found anything beyond missing-value counts.
    pub fn is_clean(&self) -> bool {
        self.negative_values.iter().all(|c| c.count == 0)
            && self.out_of_bounds.iter().all(|c| c.count == 0)
            && self.out_of_category_bounds.iter().all(|c| c.count == 0)
            && self.invalid_values.iter().all(|c| c.values.is_empty())
    }
}

pub fn run_quality_checks(dataset: &Dataset, rules: &RuleSet) -> QualityReport {
    let mut report = QualityReport {
        rows: dataset.len(),
        missing_values: dataset
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnCount {
                column: name.clone(),
                count: dataset.column_values(idx).filter(Option::is_none).count(),
            })
            .collect(),
        ..QualityReport::default()
    };
    let category = dataset.column_index(&rules.category_column);

    for spec in &rules.columns {
        let Some(column) = dataset.column_index(&spec.name) else {
            continue;
        };
        match &spec.kind {
            ColumnKind::Numeric(numeric) => {
                let numbers = dataset
                    .column_values(column)
                    .map(coerce_number)
                    .collect::<Vec<_>>();
                report.negative_values.push(ColumnCount {
                    column: spec.name.clone(),
                    count: numbers.iter().flatten().filter(|v| **v < 0.0).count(),
                });
                if let Some(bounds) = &numeric.bounds {
                    report.out_of_bounds.push(ColumnCount {
                        column: spec.name.clone(),
                        count: numbers.iter().filter(|v| bounds.is_violated_by(**v)).count(),
                    });
                }
                let Some(category) = category else {
                    continue;
                };
                for (key, bounds) in &numeric.category_bounds {
                    let count = numbers
                        .iter()
                        .enumerate()
                        .filter(|(row, value)| {
                            dataset
                                .cell(*row, category)
                                .is_some_and(|cat| normalized_text(cat) == *key)
                                && bounds.is_violated_by(**value)
                        })
                        .count();
                    report.out_of_category_bounds.push(CategoryBoundsCount {
                        column: spec.name.clone(),
                        category: key.clone(),
                        count,
                    });
                }
            }
            ColumnKind::String(string) => {
                if string.white_list.is_none() && string.black_list.is_empty() {
                    continue;
                }
                let values = dataset
                    .column_values(column)
                    .map(|cell| cell.map(normalized_text))
                    .filter(|text| {
                        !string.is_allowed(text.as_deref()) || string.is_forbidden(text.as_deref())
                    })
                    .map(|text| text.unwrap_or_else(|| MISSING_TOKEN.to_string()))
                    .unique()
                    .sorted()
                    .collect();
                report.invalid_values.push(InvalidValues {
                    column: spec.name.clone(),
                    values,
                });
            }
        }
    }
    report
}
