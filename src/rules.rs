//! Rule set model: per-column rules, behavior overrides, and defaults.
//!
//! A rule set is loaded from YAML (or JSON when the file extension is
//! `.json`) and validated before any row is touched. Columns are kept as an
//! ordered list because declaration order decides the order in which reasons
//! accumulate on a row.
//!
//! ```yaml
//! category_column: Category
//! defaults:
//!   string: { violation: remove }
//!   numeric: { bounds: clip }
//! columns:
//!   - name: Category
//!     type: string
//!     rules: { white_list: [A, B, C] }
//!   - name: Amount
//!     type: numeric
//!     rules:
//!       fill_na: median
//!       bounds: [0, 200]
//!       category_bounds: { A: [50, 200] }
//!     behavior: { bounds: remove }
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};
use thiserror::Error;

use crate::sort::SortKey;

pub const DEFAULT_CATEGORY_COLUMN: &str = "Category";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Remove,
    Flag,
    Clip,
    Ignore,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Remove => "remove",
            Action::Flag => "flag",
            Action::Clip => "clip",
            Action::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remove" => Ok(Action::Remove),
            "flag" => Ok(Action::Flag),
            "clip" => Ok(Action::Clip),
            "ignore" => Ok(Action::Ignore),
            other => Err(format!(
                "unknown action '{other}' (expected remove, flag, clip, or ignore)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKey {
    Violation,
    Missing,
    Bounds,
}

impl BehaviorKey {
    pub const ALL: [BehaviorKey; 3] = [
        BehaviorKey::Violation,
        BehaviorKey::Missing,
        BehaviorKey::Bounds,
    ];

    /// Actions a processor knows how to carry out for this key.
    pub fn permitted_actions(self) -> &'static [Action] {
        match self {
            BehaviorKey::Violation | BehaviorKey::Missing => {
                &[Action::Remove, Action::Flag, Action::Ignore]
            }
            BehaviorKey::Bounds => &[Action::Remove, Action::Flag, Action::Clip, Action::Ignore],
        }
    }

    pub fn applies_to(self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (BehaviorKey::Violation, ColumnType::String)
                | (BehaviorKey::Missing | BehaviorKey::Bounds, ColumnType::Numeric)
        )
    }
}

impl fmt::Display for BehaviorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BehaviorKey::Violation => "violation",
            BehaviorKey::Missing => "missing",
            BehaviorKey::Bounds => "bounds",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Numeric,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => f.write_str("string"),
            ColumnType::Numeric => f.write_str("numeric"),
        }
    }
}

/// Behavior key to action mapping. Empty strings in the source file count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Behavior {
    #[serde(default, deserialize_with = "non_empty_action", skip_serializing_if = "Option::is_none")]
    pub violation: Option<Action>,
    #[serde(default, deserialize_with = "non_empty_action", skip_serializing_if = "Option::is_none")]
    pub missing: Option<Action>,
    #[serde(default, deserialize_with = "non_empty_action", skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Action>,
}

impl Behavior {
    pub fn get(&self, key: BehaviorKey) -> Option<Action> {
        match key {
            BehaviorKey::Violation => self.violation,
            BehaviorKey::Missing => self.missing,
            BehaviorKey::Bounds => self.bounds,
        }
    }

    pub fn set(&mut self, key: BehaviorKey, action: Action) {
        let slot = match key {
            BehaviorKey::Violation => &mut self.violation,
            BehaviorKey::Missing => &mut self.missing,
            BehaviorKey::Bounds => &mut self.bounds,
        };
        *slot = Some(action);
    }

    fn configured(&self) -> impl Iterator<Item = (BehaviorKey, Action)> + '_ {
        BehaviorKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|action| (key, action)))
    }
}

fn non_empty_action<'de, D>(deserializer: D) -> Result<Option<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Fallback actions per column type, consulted when a column has no override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultBehavior {
    #[serde(default)]
    pub string: Behavior,
    #[serde(default)]
    pub numeric: Behavior,
}

impl DefaultBehavior {
    pub fn for_type(&self, column_type: ColumnType) -> &Behavior {
        match column_type {
            ColumnType::String => &self.string,
            ColumnType::Numeric => &self.numeric,
        }
    }
}

/// Inclusive numeric range, written as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// True only for present values outside the range.
    pub fn is_violated_by(&self, value: Option<f64>) -> bool {
        value.is_some_and(|v| !self.contains(v))
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn ensure_valid(&self, context: impl Fn() -> String) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NonFiniteBounds { context: context() });
        }
        if self.min > self.max {
            return Err(ConfigError::InvertedBounds {
                context: context(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl From<[f64; 2]> for Bounds {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Bounds> for [f64; 2] {
    fn from(bounds: Bounds) -> Self {
        [bounds.min, bounds.max]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillNa {
    Ignore,
    Remove,
    Mean,
    Median,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringRules {
    pub white_list: Option<Vec<String>>,
    pub black_list: Vec<String>,
    pub contains: Vec<String>,
    pub starts_with: Vec<String>,
    pub ends_with: Vec<String>,
    pub regex: Vec<String>,
}

impl StringRules {
    /// Missing values are never in the whitelist.
    pub fn is_allowed(&self, value: Option<&str>) -> bool {
        match &self.white_list {
            None => true,
            Some(list) => value.is_some_and(|v| list.iter().any(|allowed| allowed == v)),
        }
    }

    pub fn is_forbidden(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.black_list.iter().any(|blocked| blocked == v))
    }

    /// Compiles each `regex` entry as a full-value (anchored) match.
    pub fn compiled_patterns(&self) -> Result<Vec<(String, Regex)>, regex::Error> {
        self.regex
            .iter()
            .map(|pattern| {
                let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
                Ok((pattern.clone(), anchored))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericRules {
    pub fill_na: Option<FillNa>,
    pub bounds: Option<Bounds>,
    pub category_bounds: BTreeMap<String, Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    String(StringRules),
    Numeric(NumericRules),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawColumnSpec")]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub behavior: Behavior,
}

impl ColumnSpec {
    pub fn string(name: impl Into<String>, rules: StringRules) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::String(rules),
            behavior: Behavior::default(),
        }
    }

    pub fn numeric(name: impl Into<String>, rules: NumericRules) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric(rules),
            behavior: Behavior::default(),
        }
    }

    pub fn with_behavior(mut self, key: BehaviorKey, action: Action) -> Self {
        self.behavior.set(key, action);
        self
    }

    pub fn column_type(&self) -> ColumnType {
        match self.kind {
            ColumnKind::String(_) => ColumnType::String,
            ColumnKind::Numeric(_) => ColumnType::Numeric,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawColumnSpec {
    name: String,
    #[serde(rename = "type")]
    column_type: ColumnType,
    #[serde(default)]
    rules: RawRules,
    #[serde(default)]
    behavior: Behavior,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRules {
    white_list: Option<Vec<String>>,
    black_list: Option<Vec<String>>,
    contains: Option<Vec<String>>,
    starts_with: Option<Vec<String>>,
    ends_with: Option<Vec<String>>,
    regex: Option<Vec<String>>,
    fill_na: Option<FillNa>,
    bounds: Option<Bounds>,
    category_bounds: Option<BTreeMap<String, Bounds>>,
}

impl TryFrom<RawColumnSpec> for ColumnSpec {
    type Error = ConfigError;

    fn try_from(raw: RawColumnSpec) -> Result<Self, Self::Error> {
        let RawColumnSpec {
            name,
            column_type,
            rules,
            behavior,
        } = raw;
        let not_applicable = |rule: &'static str| ConfigError::RuleNotApplicable {
            column: name.clone(),
            rule,
            column_type,
        };
        let kind = match column_type {
            ColumnType::String => {
                let numeric_only = [
                    ("fill_na", rules.fill_na.is_some()),
                    ("bounds", rules.bounds.is_some()),
                    ("category_bounds", rules.category_bounds.is_some()),
                ];
                if let Some((rule, _)) = numeric_only.into_iter().find(|(_, set)| *set) {
                    return Err(not_applicable(rule));
                }
                ColumnKind::String(StringRules {
                    white_list: rules.white_list,
                    black_list: rules.black_list.unwrap_or_default(),
                    contains: rules.contains.unwrap_or_default(),
                    starts_with: rules.starts_with.unwrap_or_default(),
                    ends_with: rules.ends_with.unwrap_or_default(),
                    regex: rules.regex.unwrap_or_default(),
                })
            }
            ColumnType::Numeric => {
                let string_only = [
                    ("white_list", rules.white_list.is_some()),
                    ("black_list", rules.black_list.is_some()),
                    ("contains", rules.contains.is_some()),
                    ("starts_with", rules.starts_with.is_some()),
                    ("ends_with", rules.ends_with.is_some()),
                    ("regex", rules.regex.is_some()),
                ];
                if let Some((rule, _)) = string_only.into_iter().find(|(_, set)| *set) {
                    return Err(not_applicable(rule));
                }
                ColumnKind::Numeric(NumericRules {
                    fill_na: rules.fill_na,
                    bounds: rules.bounds,
                    category_bounds: rules.category_bounds.unwrap_or_default(),
                })
            }
        };
        Ok(ColumnSpec {
            name,
            kind,
            behavior,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("column name cannot be empty")]
    EmptyColumnName,
    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),
    #[error("category column name cannot be empty")]
    EmptyCategoryColumn,
    #[error("rule '{rule}' does not apply to {column_type} column '{column}'")]
    RuleNotApplicable {
        column: String,
        rule: &'static str,
        column_type: ColumnType,
    },
    #[error("behavior '{key}' does not apply to {column_type} columns ({context})")]
    BehaviorNotApplicable {
        context: String,
        key: BehaviorKey,
        column_type: ColumnType,
    },
    #[error("action '{action}' is not valid for behavior '{key}' ({context})")]
    InvalidAction {
        context: String,
        key: BehaviorKey,
        action: Action,
    },
    #[error("bounds for {context} have min {min} greater than max {max}")]
    InvertedBounds { context: String, min: f64, max: f64 },
    #[error("bounds for {context} must be finite numbers")]
    NonFiniteBounds { context: String },
    #[error("invalid regex '{pattern}' for column '{column}': {message}")]
    InvalidRegex {
        column: String,
        pattern: String,
        message: String,
    },
}

fn default_category_column() -> String {
    DEFAULT_CATEGORY_COLUMN.to_string()
}

/// Immutable configuration for one cleaning run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default = "default_category_column")]
    pub category_column: String,
    #[serde(default)]
    pub defaults: DefaultBehavior,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            category_column: default_category_column(),
            defaults: DefaultBehavior::default(),
            columns: Vec::new(),
            sort: Vec::new(),
        }
    }
}

impl RuleSet {
    pub fn new(columns: Vec<ColumnSpec>, defaults: DefaultBehavior) -> Self {
        Self {
            columns,
            defaults,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening rules file {path:?}"))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let rules = if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        };
        rules.with_context(|| format!("Loading rules from {path:?}"))
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let rules: RuleSet = serde_yaml::from_str(input).context("Parsing rules YAML")?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let rules: RuleSet = serde_json::from_str(input).context("Parsing rules JSON")?;
        rules.validate()?;
        Ok(rules)
    }

    /// Rejects configurations the processors cannot carry out faithfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.category_column.trim().is_empty() {
            return Err(ConfigError::EmptyCategoryColumn);
        }
        for column_type in [ColumnType::String, ColumnType::Numeric] {
            let context = format!("defaults.{column_type}");
            check_behavior(self.defaults.for_type(column_type), column_type, &context)?;
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(ConfigError::EmptyColumnName);
            }
            if !seen.insert(column.name.as_str()) {
                return Err(ConfigError::DuplicateColumn(column.name.clone()));
            }
            let context = format!("column '{}'", column.name);
            check_behavior(&column.behavior, column.column_type(), &context)?;
            match &column.kind {
                ColumnKind::String(rules) => {
                    for pattern in &rules.regex {
                        Regex::new(pattern).map_err(|err| ConfigError::InvalidRegex {
                            column: column.name.clone(),
                            pattern: pattern.clone(),
                            message: err.to_string(),
                        })?;
                    }
                }
                ColumnKind::Numeric(rules) => {
                    if let Some(bounds) = &rules.bounds {
                        bounds.ensure_valid(|| format!("column '{}'", column.name))?;
                    }
                    for (category, bounds) in &rules.category_bounds {
                        bounds.ensure_valid(|| {
                            format!("column '{}' category '{category}'", column.name)
                        })?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_behavior(
    behavior: &Behavior,
    column_type: ColumnType,
    context: &str,
) -> Result<(), ConfigError> {
    for (key, action) in behavior.configured() {
        if !key.applies_to(column_type) {
            return Err(ConfigError::BehaviorNotApplicable {
                context: context.to_string(),
                key,
                column_type,
            });
        }
        if !key.permitted_actions().contains(&action) {
            return Err(ConfigError::InvalidAction {
                context: context.to_string(),
                key,
                action,
            });
        }
    }
    Ok(())
}
