use anyhow::{Context, Result};

use super::tracker::ViolationTracker;
use crate::{
    data::{Value, normalized_text},
    dataset::Dataset,
    rules::{Action, StringRules},
};

/// Trims the column's active cells, then evaluates each string rule against
/// the rows still in the working set.
pub fn process(
    dataset: &mut Dataset,
    column: usize,
    name: &str,
    rules: &StringRules,
    action: Action,
    tracker: &mut ViolationTracker,
) -> Result<()> {
    normalize(dataset, column, tracker.active());
    let dataset: &Dataset = dataset;

    let text = |dataset: &Dataset, row: usize| -> Option<String> {
        dataset.cell(row, column).map(normalized_text)
    };

    if rules.white_list.is_some() {
        let mask = tracker.select(|row| !rules.is_allowed(text(dataset, row).as_deref()));
        tracker.apply(&mask, &format!("{name}: not in whitelist"), action);
    }

    if !rules.black_list.is_empty() {
        let mask = tracker.select(|row| rules.is_forbidden(text(dataset, row).as_deref()));
        tracker.apply(&mask, &format!("{name}: in blacklist"), action);
    }

    let substring_checks: [(&[String], &str, fn(&str, &str) -> bool); 3] = [
        (&rules.contains, "contains", |value, needle| value.contains(needle)),
        (&rules.starts_with, "starts with", |value, needle| {
            value.starts_with(needle)
        }),
        (&rules.ends_with, "ends with", |value, needle| value.ends_with(needle)),
    ];
    for (needles, label, test) in substring_checks {
        for needle in needles {
            let mask = tracker.select(|row| {
                text(dataset, row).is_some_and(|value| test(&value, needle))
            });
            tracker.apply(&mask, &format!("{name}: {label} '{needle}'"), action);
        }
    }

    let patterns = rules
        .compiled_patterns()
        .with_context(|| format!("Compiling regex rules for column '{name}'"))?;
    for (pattern, regex) in &patterns {
        let mask = tracker.select(|row| {
            text(dataset, row).is_some_and(|value| !regex.is_match(&value))
        });
        tracker.apply(&mask, &format!("{name}: does not match regex '{pattern}'"), action);
    }

    Ok(())
}

fn normalize(dataset: &mut Dataset, column: usize, rows: &[usize]) {
    for &row in rows {
        if let Some(Some(value)) = dataset.rows[row].get_mut(column) {
            let trimmed = normalized_text(value);
            *value = Value::Text(trimmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rules: &StringRules, action: Action, values: &[&str]) -> (Dataset, ViolationTracker) {
        let mut dataset = Dataset::from_raw(
            ["Code"],
            values.iter().map(|v| vec![*v]).collect::<Vec<_>>(),
        );
        let mut tracker = ViolationTracker::new(dataset.len());
        process(&mut dataset, 0, "Code", rules, action, &mut tracker).unwrap();
        (dataset, tracker)
    }

    #[test]
    fn whitelist_is_checked_after_trimming() {
        let rules = StringRules {
            white_list: Some(vec!["A".into(), "B".into()]),
            ..StringRules::default()
        };
        let (dataset, tracker) = run(&rules, Action::Remove, &["  A ", "Z", ""]);
        assert_eq!(tracker.active(), &[0]);
        assert_eq!(dataset.cell(0, 0), Some(&Value::Text("A".into())));
        assert_eq!(tracker.removal_text(1), "Code: not in whitelist");
        assert_eq!(tracker.removal_text(2), "Code: not in whitelist");
    }

    #[test]
    fn substring_rules_flag_values_carrying_the_substring() {
        let rules = StringRules {
            contains: vec!["-".into()],
            starts_with: vec!["X".into(), "XY".into()],
            ends_with: vec!["9".into()],
            ..StringRules::default()
        };
        let (_, tracker) = run(&rules, Action::Flag, &["XY-9", "X1", "AB", ""]);
        assert_eq!(
            tracker.flag_text(0),
            "Code: contains '-' | Code: starts with 'X' | \
             Code: starts with 'XY' | Code: ends with '9'"
        );
        assert_eq!(tracker.flag_text(1), "Code: starts with 'X'");
        assert_eq!(tracker.flag_text(2), "");
        assert_eq!(tracker.flag_text(3), "");
    }

    #[test]
    fn regex_must_match_the_whole_value() {
        let rules = StringRules {
            regex: vec!["[A-Z]{2}\\d".into()],
            ..StringRules::default()
        };
        let (_, tracker) = run(&rules, Action::Remove, &["AB1", "AB12", "", "xAB1"]);
        assert_eq!(tracker.active(), &[0, 2]);
        assert_eq!(
            tracker.removal_text(1),
            "Code: does not match regex '[A-Z]{2}\\d'"
        );
    }

    #[test]
    fn later_rules_only_see_remaining_rows() {
        let rules = StringRules {
            white_list: Some(vec!["Invalid".into(), "ok".into()]),
            black_list: vec!["Invalid".into(), "nope".into()],
            ..StringRules::default()
        };
        let (_, tracker) = run(&rules, Action::Remove, &["nope", "Invalid", "ok"]);
        assert_eq!(tracker.removal_text(0), "Code: not in whitelist");
        assert_eq!(tracker.removal_text(1), "Code: in blacklist");
        assert_eq!(tracker.active(), &[2]);
    }

    #[test]
    fn ignore_leaves_rows_untouched() {
        let rules = StringRules {
            black_list: vec!["bad".into()],
            ..StringRules::default()
        };
        let (_, tracker) = run(&rules, Action::Ignore, &["bad"]);
        assert_eq!(tracker.active(), &[0]);
        assert_eq!(tracker.flag_text(0), "");
    }
}
