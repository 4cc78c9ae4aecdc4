use itertools::Itertools;
use serde::Serialize;

use crate::{
    clean::numeric_rules::mean,
    data::{coerce_number, normalized_text},
    dataset::Dataset,
    quality::MISSING_TOKEN,
    rules::{ColumnKind, RuleSet},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericKpi {
    pub column: String,
    /// Number of parseable values.
    pub count: usize,
    pub total: f64,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub numeric: Vec<NumericKpi>,
    pub category_column: Option<String>,
    /// Row counts per category value, largest first and ties by name.
    pub count_by_category: Vec<(String, usize)>,
}

pub fn compute_kpis(dataset: &Dataset, rules: &RuleSet) -> Kpis {
    let numeric = rules
        .columns
        .iter()
        .filter(|spec| matches!(spec.kind, ColumnKind::Numeric(_)))
        .filter_map(|spec| {
            let column = dataset.column_index(&spec.name)?;
            let values = dataset
                .column_values(column)
                .filter_map(coerce_number)
                .collect::<Vec<_>>();
            Some(NumericKpi {
                column: spec.name.clone(),
                count: values.len(),
                total: values.iter().sum(),
                mean: mean(&values),
            })
        })
        .collect();

    let Some(category) = dataset.column_index(&rules.category_column) else {
        return Kpis {
            numeric,
            ..Kpis::default()
        };
    };
    let count_by_category = dataset
        .column_values(category)
        .map(|cell| cell.map_or_else(|| MISSING_TOKEN.to_string(), normalized_text))
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect();
    Kpis {
        numeric,
        category_column: Some(rules.category_column.clone()),
        count_by_category,
    }
}
