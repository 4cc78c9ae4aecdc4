#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use csv_scrub::{dataset::Dataset, rules::RuleSet};
use encoding_rs::UTF_8;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads the bundled sample transactions.
pub fn sample_dataset() -> Dataset {
    Dataset::read_csv(&fixture_path("sample_data.csv"), b',', UTF_8).expect("read sample data")
}

pub fn sample_rules() -> RuleSet {
    RuleSet::load(&fixture_path("rules.yml")).expect("load sample rules")
}

/// Renders one column of a dataset the way it would be written to CSV.
pub fn column_text(dataset: &Dataset, name: &str) -> Vec<String> {
    let column = dataset.column_index(name).expect("column present");
    dataset
        .column_values(column)
        .map(|cell| cell.map(|v| v.as_display()).unwrap_or_default())
        .collect()
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read workspace file")
    }
}
