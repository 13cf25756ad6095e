//! CSV export of table rows

use anyhow::Result;
use chrono::NaiveDateTime;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::row::{Row, RowSchema};
use super::workflow::ListMode;

/// Write a label header followed by one record per row, in schema order
pub fn write_csv<'a, W, I>(schema: &RowSchema, rows: I, writer: W) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Row>,
{
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(schema.fields.iter().map(|f| f.label.as_str()))?;

    let mut written = 0;
    for row in rows {
        csv.write_record(schema.fields.iter().map(|f| row.text(&f.name)))?;
        written += 1;
    }
    csv.flush()?;
    Ok(written)
}

/// Timestamped file name for an export of the given mode
pub fn export_file_name(mode: ListMode, now: NaiveDateTime) -> String {
    format!("cases-{}-{}.csv", mode.slug(), now.format("%Y%m%d-%H%M%S"))
}

/// Export rows into `dir`, creating it as needed; returns the written path
pub fn export_to_dir<'a, I>(
    schema: &RowSchema,
    rows: I,
    dir: &Path,
    mode: ListMode,
    now: NaiveDateTime,
) -> Result<(PathBuf, usize)>
where
    I: IntoIterator<Item = &'a Row>,
{
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(mode, now));
    let file = fs::File::create(&path)?;
    let written = write_csv(schema, rows, file)?;
    tracing::info!("Exported {written} rows to {}", path.display());
    Ok((path, written))
}
