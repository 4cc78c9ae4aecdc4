//! Per-row reason bookkeeping and the shrinking set of active rows.
//!
//! Rows are identified by their stable index into the deduplicated working
//! dataset. Reasons are kept as ordered lists per row and only joined into
//! text when the outputs are assembled.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::rules::Action;

pub const REASON_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Default)]
pub struct ViolationTracker {
    active: Vec<usize>,
    removal: BTreeMap<usize, Vec<String>>,
    flags: BTreeMap<usize, Vec<String>>,
    removed_order: Vec<usize>,
}

impl ViolationTracker {
    pub fn new(row_count: usize) -> Self {
        Self {
            active: (0..row_count).collect(),
            ..Self::default()
        }
    }

    /// Rows still in the working set, in input order.
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    /// Rows removed so far, in the order they were removed.
    pub fn removed(&self) -> &[usize] {
        &self.removed_order
    }

    pub fn is_removed(&self, row: usize) -> bool {
        self.removal.contains_key(&row)
    }

    /// Builds a mask over the active rows.
    pub fn select(&self, mut predicate: impl FnMut(usize) -> bool) -> Vec<usize> {
        self.active
            .iter()
            .copied()
            .filter(|&row| predicate(row))
            .collect()
    }

    /// Records `reason` against every row in `mask`. `Remove` also takes the
    /// rows out of the working set; `Clip` and `Ignore` are value-level and
    /// leave no trace here.
    pub fn apply(&mut self, mask: &[usize], reason: &str, action: Action) {
        if mask.is_empty() {
            return;
        }
        match action {
            Action::Flag => {
                for &row in mask {
                    if self.is_removed(row) {
                        continue;
                    }
                    push_unique(self.flags.entry(row).or_default(), reason);
                }
                debug!("Flagged {} row(s): {reason}", mask.len());
            }
            Action::Remove => {
                let mut newly_removed = HashSet::with_capacity(mask.len());
                for &row in mask {
                    if self.is_removed(row) {
                        continue;
                    }
                    push_unique(self.removal.entry(row).or_default(), reason);
                    self.removed_order.push(row);
                    newly_removed.insert(row);
                }
                self.active.retain(|row| !newly_removed.contains(row));
                debug!("Removed {} row(s): {reason}", newly_removed.len());
            }
            Action::Clip | Action::Ignore => {}
        }
    }

    /// Applies several masks built over the same working set. With `Remove`,
    /// a row matched by more than one mask keeps every matching reason and
    /// leaves the working set once, after the last mask.
    pub fn apply_together(&mut self, passes: &[(Vec<usize>, String)], action: Action) {
        if action != Action::Remove {
            for (mask, reason) in passes {
                self.apply(mask, reason, action);
            }
            return;
        }
        let mut newly_removed = HashSet::new();
        for (mask, reason) in passes {
            for &row in mask {
                if self.is_removed(row) && !newly_removed.contains(&row) {
                    continue;
                }
                push_unique(self.removal.entry(row).or_default(), reason);
                if newly_removed.insert(row) {
                    self.removed_order.push(row);
                }
            }
            if !mask.is_empty() {
                debug!("Removed {} row(s): {reason}", mask.len());
            }
        }
        self.active.retain(|row| !newly_removed.contains(row));
    }

    pub fn removal_reasons(&self, row: usize) -> &[String] {
        self.removal.get(&row).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn flag_reasons(&self, row: usize) -> &[String] {
        self.flags.get(&row).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn removal_text(&self, row: usize) -> String {
        self.removal_reasons(row).join(REASON_SEPARATOR)
    }

    pub fn flag_text(&self, row: usize) -> String {
        self.flag_reasons(row).join(REASON_SEPARATOR)
    }
}

fn push_unique(reasons: &mut Vec<String>, reason: &str) {
    if !reasons.iter().any(|existing| existing == reason) {
        reasons.push(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_is_a_no_op() {
        let mut tracker = ViolationTracker::new(3);
        tracker.apply(&[], "x: in blacklist", Action::Remove);
        assert_eq!(tracker.active(), &[0, 1, 2]);
        assert!(tracker.removed().is_empty());
    }

    #[test]
    fn flag_keeps_rows_and_dedups_reasons() {
        let mut tracker = ViolationTracker::new(3);
        tracker.apply(&[1], "Description: in blacklist", Action::Flag);
        tracker.apply(&[1], "Description: in blacklist", Action::Flag);
        tracker.apply(&[1, 2], "Amount: outside global bounds", Action::Flag);
        assert_eq!(tracker.active(), &[0, 1, 2]);
        assert_eq!(
            tracker.flag_text(1),
            "Description: in blacklist | Amount: outside global bounds"
        );
        assert_eq!(tracker.flag_text(0), "");
    }

    #[test]
    fn remove_shrinks_working_set_in_capture_order() {
        let mut tracker = ViolationTracker::new(4);
        tracker.apply(&[2], "Category: not in whitelist", Action::Remove);
        tracker.apply(&[0, 3], "Amount: missing value", Action::Remove);
        assert_eq!(tracker.active(), &[1]);
        assert_eq!(tracker.removed(), &[2, 0, 3]);
        assert_eq!(tracker.removal_text(2), "Category: not in whitelist");
        assert_eq!(tracker.select(|_| true), vec![1]);
    }

    #[test]
    fn removed_rows_are_not_captured_twice() {
        let mut tracker = ViolationTracker::new(2);
        tracker.apply(&[0], "a", Action::Remove);
        tracker.apply(&[0], "b", Action::Remove);
        tracker.apply(&[0], "c", Action::Flag);
        assert_eq!(tracker.removed(), &[0]);
        assert_eq!(tracker.removal_reasons(0), &["a".to_string()]);
        assert!(tracker.flag_reasons(0).is_empty());
    }

    #[test]
    fn masks_applied_together_merge_removal_reasons() {
        let mut tracker = ViolationTracker::new(3);
        tracker.apply(&[2], "Category: not in whitelist", Action::Remove);
        let passes = vec![
            (vec![0], "Amount: outside global bounds".to_string()),
            (vec![0, 1, 2], "Amount: outside bounds for category A".to_string()),
        ];
        tracker.apply_together(&passes, Action::Remove);
        assert!(tracker.active().is_empty());
        assert_eq!(tracker.removed(), &[2, 0, 1]);
        assert_eq!(
            tracker.removal_text(0),
            "Amount: outside global bounds | Amount: outside bounds for category A"
        );
        assert_eq!(tracker.removal_text(2), "Category: not in whitelist");
    }

    #[test]
    fn clip_and_ignore_record_nothing() {
        let mut tracker = ViolationTracker::new(2);
        tracker.apply(&[0, 1], "Amount: outside global bounds", Action::Clip);
        tracker.apply(&[0, 1], "Amount: outside global bounds", Action::Ignore);
        assert_eq!(tracker.active(), &[0, 1]);
        assert!(tracker.flag_reasons(0).is_empty());
        assert!(tracker.removal_reasons(1).is_empty());
    }
}
