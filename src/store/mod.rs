use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::info;

use crate::error::{CollectorError, Result};
use crate::models::{ListingRecord, columns};

/// Rows of listing data sharing one ordered column set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<IndexMap<String, String>>,
}

impl Table {
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Short rows are padded with blanks; longer ones would lose cells on the next save
            if record.len() > headers.len() {
                let line = record.position().map_or(0, |p| p.line());
                return Err(CollectorError::Table(format!(
                    "line {} has {} cells but the header names {} columns",
                    line,
                    record.len(),
                    headers.len()
                )));
            }
            let row = headers
                .iter()
                .enumerate()
                .map(|(i, column)| (column.clone(), record.get(i).unwrap_or_default().to_string()))
                .collect();
            rows.push(row);
        }

        let table = Self {
            columns: headers,
            rows,
        };
        if !table.rows.is_empty() && !table.columns.iter().any(|c| c == columns::ASSET_URI) {
            return Err(CollectorError::Table(format!(
                "existing table has no {} column",
                columns::ASSET_URI
            )));
        }

        Ok(table)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(writer);

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|column| row.get(column).map_or("", String::as_str)),
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Listing identifiers already present in the table.
    pub fn identifiers(&self) -> HashSet<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(columns::ASSET_URI))
            .filter(|uri| !uri.is_empty())
            .cloned()
            .collect()
    }

    /// Appends records that are not in the table yet and extends the column
    /// set with their new keys. Existing rows are never touched.
    ///
    /// Returns the number of rows appended.
    pub fn merge(&mut self, records: &[ListingRecord]) -> usize {
        let mut known = self.identifiers();
        let mut appended = 0;

        for record in records {
            if !known.insert(record.asset_uri().to_string()) {
                continue;
            }

            extend_columns(&mut self.columns, record.keys());
            self.rows.push(record.to_row());
            appended += 1;
        }

        appended
    }
}

/// Appends the keys missing from `columns`, in first-seen order.
fn extend_columns<'a>(columns: &mut Vec<String>, keys: impl IntoIterator<Item = &'a str>) {
    for key in keys {
        if !columns.iter().any(|c| c == key) {
            info!("Adding column '{}' to table", key);
            columns.push(key.to_string());
        }
    }
}

/// The CSV file a table is persisted to between runs
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the table, or an empty one if the file does not exist yet.
    pub fn load(&self) -> Result<Table> {
        match File::open(&self.path) {
            Ok(file) => {
                let table = Table::read_from(file)?;
                if table.is_empty() {
                    info!("{} has no rows yet", self.path.display());
                } else {
                    info!("Loaded {} rows from {}", table.len(), self.path.display());
                }
                Ok(table)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No existing table at {}, starting fresh", self.path.display());
                Ok(Table::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the table next to the target and renames it into place.
    pub fn save(&self, table: &Table) -> Result<()> {
        replace_file(&self.path, |file| table.write_to(file))?;

        info!("Wrote {} rows to {}", table.len(), self.path.display());
        Ok(())
    }
}

/// Fills `<path>.tmp` with `write` and renames it over `path`. The temporary
/// file is removed again when `write` fails.
fn replace_file(path: &Path, write: impl FnOnce(File) -> Result<()>) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    if let Err(e) = write(File::create(&tmp_path)?) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
