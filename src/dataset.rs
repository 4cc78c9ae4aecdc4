//! In-memory tabular dataset used by the cleaning engine and its collaborators.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    data::{Value, parse_cell},
    io_utils,
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Builds a dataset from raw string fields, treating empty fields as missing.
    pub fn from_raw<H, R, S, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: IntoIterator<Item = Vec<C>>,
        C: AsRef<str>,
    {
        let headers = headers
            .into_iter()
            .map(|h| h.as_ref().to_string())
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(|cell| parse_cell(cell.as_ref())).collect())
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column)).and_then(Option::as_ref)
    }

    /// Iterates the cells of one column in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).and_then(Option::as_ref))
    }

    /// Removes a column by name, returning whether it existed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.headers.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        true
    }

    /// Drops exact full-row duplicates, keeping the first occurrence. Returns
    /// the number of rows discarded.
    pub fn dedup_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Row> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    pub fn read_csv(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        if !io_utils::is_dash(path) && !path.exists() {
            bail!("File not found: {}", path.display());
        }
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let mut rows = Vec::new();
        for (ordinal, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", ordinal + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", ordinal + 2))?;
            rows.push(decoded.iter().map(|field| parse_cell(field)).collect());
        }
        debug!(
            "Read {} row(s) across {} column(s) from {:?}",
            rows.len(),
            headers.len(),
            path
        );
        Ok(Self { headers, rows })
    }

    pub fn write_csv(&self, path: &Path, delimiter: u8) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(path, delimiter)?;
        writer
            .write_record(self.headers.iter())
            .context("Writing output headers")?;
        for (idx, row) in self.rows.iter().enumerate() {
            let record = self.render_row(row);
            writer
                .write_record(record.iter())
                .with_context(|| format!("Writing output row {}", idx + 2))?;
        }
        writer.flush().context("Flushing output")?;
        Ok(())
    }

    fn render_row(&self, row: &Row) -> Vec<String> {
        (0..self.headers.len())
            .map(|idx| {
                row.get(idx)
                    .and_then(Option::as_ref)
                    .map(Value::as_display)
                    .unwrap_or_default()
            })
            .collect()
    }
}
