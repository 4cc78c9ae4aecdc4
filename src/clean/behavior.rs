use crate::rules::{Action, BehaviorKey, ColumnSpec, DefaultBehavior};

/// Resolves the action for one behavior key: column override, then the
/// per-type default, then `ignore`.
pub fn resolve(column: &ColumnSpec, key: BehaviorKey, defaults: &DefaultBehavior) -> Action {
    column
        .behavior
        .get(key)
        .or_else(|| defaults.for_type(column.column_type()).get(key))
        .unwrap_or(Action::Ignore)
}
