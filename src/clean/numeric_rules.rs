use std::collections::HashMap;

use log::{debug, warn};

use super::tracker::ViolationTracker;
use crate::{
    data::{Value, coerce_number, normalized_text},
    dataset::Dataset,
    rules::{Action, Bounds, FillNa, NumericRules},
};

/// Resolved actions for one numeric column.
#[derive(Debug, Clone, Copy)]
pub struct NumericActions {
    pub missing: Action,
    pub bounds: Action,
}

/// Coerces, repairs, and bound-checks one numeric column over the active rows.
/// `category` is the index of the partition column when the dataset has one.
pub fn process(
    dataset: &mut Dataset,
    column: usize,
    name: &str,
    rules: &NumericRules,
    category: Option<usize>,
    actions: NumericActions,
    tracker: &mut ViolationTracker,
) {
    coerce_column(dataset, column, tracker.active());

    let missing_reason = format!("{name}: missing value");
    match rules.fill_na {
        Some(FillNa::Remove) => {
            let mask = tracker.select(|row| dataset.cell(row, column).is_none());
            tracker.apply(&mask, &missing_reason, Action::Remove);
        }
        Some(fill @ (FillNa::Mean | FillNa::Median)) => {
            fill_missing(dataset, column, name, category, fill, tracker.active());
        }
        Some(FillNa::Ignore) => {}
        None => {
            if matches!(actions.missing, Action::Remove | Action::Flag) {
                let mask = tracker.select(|row| dataset.cell(row, column).is_none());
                tracker.apply(&mask, &missing_reason, actions.missing);
            }
        }
    }

    map_present(dataset, column, tracker.active(), f64::abs);

    let mut checks: Vec<(&Bounds, String, Option<&str>)> = Vec::new();
    if let Some(bounds) = rules.bounds.as_ref() {
        checks.push((bounds, format!("{name}: outside global bounds"), None));
    }
    if !rules.category_bounds.is_empty() {
        if category.is_some() {
            checks.extend(rules.category_bounds.iter().map(|(key, bounds)| {
                (
                    bounds,
                    format!("{name}: outside bounds for category {key}"),
                    Some(key.as_str()),
                )
            }));
        } else {
            debug!("Category bounds for '{name}' skipped: no category column in dataset");
        }
    }

    match actions.bounds {
        Action::Clip => {
            for (bounds, _, key) in &checks {
                let rows = tracker.select(|row| in_scope(dataset, row, category, *key));
                map_present(dataset, column, &rows, |value| bounds.clamp(value));
            }
        }
        Action::Remove | Action::Flag => {
            // Every bounds mask sees the same rows, so one row can collect
            // the global and the category reason.
            let passes = checks
                .iter()
                .map(|(bounds, reason, key)| {
                    let mask = tracker.select(|row| {
                        in_scope(dataset, row, category, *key)
                            && bounds.is_violated_by(number_at(dataset, row, column))
                    });
                    (mask, reason.clone())
                })
                .collect::<Vec<_>>();
            tracker.apply_together(&passes, actions.bounds);
        }
        Action::Ignore => {}
    }
}

fn in_scope(dataset: &Dataset, row: usize, category: Option<usize>, key: Option<&str>) -> bool {
    match (key, category) {
        (None, _) => true,
        (Some(key), Some(category)) => dataset
            .cell(row, category)
            .is_some_and(|value| normalized_text(value) == key),
        (Some(_), None) => false,
    }
}

fn number_at(dataset: &Dataset, row: usize, column: usize) -> Option<f64> {
    dataset.cell(row, column).and_then(Value::as_number)
}

fn coerce_column(dataset: &mut Dataset, column: usize, rows: &[usize]) {
    for &row in rows {
        if let Some(cell) = dataset.rows[row].get_mut(column) {
            *cell = coerce_number(cell.as_ref()).map(Value::Number);
        }
    }
}

fn map_present(dataset: &mut Dataset, column: usize, rows: &[usize], op: impl Fn(f64) -> f64) {
    for &row in rows {
        if let Some(Some(Value::Number(value))) = dataset.rows[row].get_mut(column) {
            *value = op(*value);
        }
    }
}

fn fill_missing(
    dataset: &mut Dataset,
    column: usize,
    name: &str,
    category: Option<usize>,
    fill: FillNa,
    rows: &[usize],
) {
    let statistic = |values: &mut Vec<f64>| match fill {
        FillNa::Median => median(values),
        _ => mean(values),
    };

    let group_of = |dataset: &Dataset, row: usize| -> Option<String> {
        category.and_then(|c| dataset.cell(row, c).map(normalized_text))
    };

    let mut whole_column = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for &row in rows {
        if let Some(value) = number_at(dataset, row, column) {
            whole_column.push(value);
            if let Some(group) = group_of(dataset, row) {
                groups.entry(group).or_default().push(value);
            }
        }
    }
    let fallback = statistic(&mut whole_column);
    let group_stats: HashMap<String, Option<f64>> = groups
        .into_iter()
        .map(|(group, mut values)| {
            let stat = statistic(&mut values);
            (group, stat)
        })
        .collect();

    let mut unfilled = 0usize;
    for &row in rows {
        if dataset.cell(row, column).is_some() {
            continue;
        }
        let replacement = group_of(dataset, row)
            .and_then(|group| group_stats.get(&group).copied().flatten())
            .or(fallback);
        match (replacement, dataset.rows[row].get_mut(column)) {
            (Some(value), Some(cell)) => *cell = Some(Value::Number(value)),
            _ => unfilled += 1,
        }
    }
    if unfilled > 0 {
        warn!("Column '{name}' has no values to fill {unfilled} missing cell(s) from");
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len().is_multiple_of(2) {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn dataset(rows: Vec<Vec<&str>>) -> Dataset {
        Dataset::from_raw(["Category", "Amount"], rows)
    }

    fn amounts(dataset: &Dataset) -> Vec<Option<f64>> {
        dataset
            .column_values(1)
            .map(|v| v.and_then(Value::as_number))
            .collect()
    }

    fn run(
        dataset: &mut Dataset,
        rules: &NumericRules,
        missing: Action,
        bounds: Action,
    ) -> ViolationTracker {
        let mut tracker = ViolationTracker::new(dataset.len());
        process(
            dataset,
            1,
            "Amount",
            rules,
            Some(0),
            NumericActions { missing, bounds },
            &mut tracker,
        );
        tracker
    }

    #[test]
    fn median_fill_uses_category_partition() {
        let mut data = dataset(vec![
            vec!["A", "10"],
            vec!["A", "20"],
            vec!["A", ""],
            vec!["B", "100"],
        ]);
        let rules = NumericRules {
            fill_na: Some(FillNa::Median),
            ..NumericRules::default()
        };
        run(&mut data, &rules, Action::Ignore, Action::Ignore);
        assert_eq!(amounts(&data)[2], Some(15.0));
    }

    #[test]
    fn empty_category_group_falls_back_to_whole_column() {
        let mut data = dataset(vec![vec!["A", "10"], vec!["B", "30"], vec!["C", ""]]);
        let rules = NumericRules {
            fill_na: Some(FillNa::Mean),
            ..NumericRules::default()
        };
        run(&mut data, &rules, Action::Ignore, Action::Ignore);
        assert_eq!(amounts(&data)[2], Some(20.0));
    }

    #[test]
    fn unparseable_values_become_missing_and_can_be_removed() {
        let mut data = dataset(vec![vec!["A", "abc"], vec!["A", "5"]]);
        let rules = NumericRules {
            fill_na: Some(FillNa::Remove),
            ..NumericRules::default()
        };
        let tracker = run(&mut data, &rules, Action::Ignore, Action::Ignore);
        assert_eq!(tracker.active(), &[1]);
        assert_eq!(tracker.removal_text(0), "Amount: missing value");
    }

    #[test]
    fn missing_action_applies_without_fill_policy() {
        let mut data = dataset(vec![vec!["A", ""], vec!["A", "5"]]);
        let tracker = run(
            &mut data,
            &NumericRules::default(),
            Action::Flag,
            Action::Ignore,
        );
        assert_eq!(tracker.active(), &[0, 1]);
        assert_eq!(tracker.flag_text(0), "Amount: missing value");
    }

    #[test]
    fn values_are_made_absolute_before_bounds() {
        let mut data = dataset(vec![vec!["A", "-150"], vec!["A", "-5"]]);
        let rules = NumericRules {
            bounds: Some(Bounds::new(0.0, 100.0)),
            ..NumericRules::default()
        };
        let tracker = run(&mut data, &rules, Action::Ignore, Action::Remove);
        assert_eq!(tracker.active(), &[1]);
        assert_eq!(amounts(&data)[1], Some(5.0));
        assert_eq!(tracker.removal_text(0), "Amount: outside global bounds");
    }

    #[test]
    fn clip_clamps_to_global_then_category_bounds() {
        let mut data = dataset(vec![
            vec!["A", "300"],
            vec!["A", "5"],
            vec!["B", "5"],
            vec!["B", ""],
        ]);
        let rules = NumericRules {
            bounds: Some(Bounds::new(0.0, 200.0)),
            category_bounds: BTreeMap::from([("A".to_string(), Bounds::new(50.0, 150.0))]),
            ..NumericRules::default()
        };
        let tracker = run(&mut data, &rules, Action::Ignore, Action::Clip);
        assert_eq!(
            amounts(&data),
            vec![Some(150.0), Some(50.0), Some(5.0), None]
        );
        assert_eq!(tracker.active(), &[0, 1, 2, 3]);
        assert_eq!(tracker.flag_text(0), "");
    }

    #[test]
    fn category_bounds_apply_inside_global_bounds() {
        let mut data = dataset(vec![vec!["A", "75"], vec!["B", "75"]]);
        let rules = NumericRules {
            bounds: Some(Bounds::new(0.0, 100.0)),
            category_bounds: BTreeMap::from([("A".to_string(), Bounds::new(10.0, 50.0))]),
            ..NumericRules::default()
        };
        let tracker = run(&mut data, &rules, Action::Ignore, Action::Flag);
        assert_eq!(
            tracker.flag_text(0),
            "Amount: outside bounds for category A"
        );
        assert_eq!(tracker.flag_text(1), "");
    }

    #[test]
    fn global_and_category_reasons_accumulate() {
        let mut data = dataset(vec![vec!["A", "500"]]);
        let rules = NumericRules {
            bounds: Some(Bounds::new(0.0, 100.0)),
            category_bounds: BTreeMap::from([("A".to_string(), Bounds::new(10.0, 50.0))]),
            ..NumericRules::default()
        };
        let tracker = run(&mut data, &rules, Action::Ignore, Action::Flag);
        assert_eq!(
            tracker.flag_text(0),
            "Amount: outside global bounds | Amount: outside bounds for category A"
        );
    }

    #[test]
    fn removal_collects_global_and_category_reasons() {
        let mut data = dataset(vec![vec!["A", "500"], vec!["A", "75"], vec!["B", "20"]]);
        let rules = NumericRules {
            bounds: Some(Bounds::new(0.0, 100.0)),
            category_bounds: BTreeMap::from([("A".to_string(), Bounds::new(10.0, 50.0))]),
            ..NumericRules::default()
        };
        let tracker = run(&mut data, &rules, Action::Ignore, Action::Remove);
        assert_eq!(tracker.active(), &[2]);
        assert_eq!(tracker.removed(), &[0, 1]);
        assert_eq!(
            tracker.removal_text(0),
            "Amount: outside global bounds | Amount: outside bounds for category A"
        );
        assert_eq!(
            tracker.removal_text(1),
            "Amount: outside bounds for category A"
        );
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
        assert_eq!(mean(&[1.0, 2.0]), Some(1.5));
    }
}
