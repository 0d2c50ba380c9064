//! CSV export
//!
//! Rows are rendered with a header line taken from the column labels. Cells
//! containing a comma, quote or newline are quoted with inner quotes doubled.
//! Records are separated by `\n` with no trailing newline.

use std::fmt;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeZone;
use csv::QuoteStyle;
use csv::Terminator;
use csv::Writer;
use csv::WriterBuilder;

use super::TableState;
use super::Transform;
use crate::error::Error;
use crate::model::Fields;
use crate::model::Value;

/// One exported column.
#[derive(Clone)]
pub struct ExportColumn {
    pub key: String,
    pub header: String,
    transform: Option<Transform>,
}

impl ExportColumn {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            transform: None,
        }
    }

    /// Maps the cell value before it is written.
    pub fn with_transform(mut self, transform: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    fn cell<R: Fields>(&self, row: &R) -> String {
        let value = row.field(&self.key).unwrap_or(Value::Null);
        match &self.transform {
            Some(transform) => transform(&value).to_display_string(),
            None => value.to_display_string(),
        }
    }
}

impl fmt::Debug for ExportColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportColumn")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Renders rows to CSV text.
pub fn export_csv<'a, R, I>(rows: I, columns: &[ExportColumn]) -> Result<String, Error>
where
    R: Fields + 'a,
    I: IntoIterator<Item = &'a R>,
{
    match columns {
        [] => Ok(String::new()),
        [column] => {
            // The csv writer renders a lone empty field as `""`.
            let mut lines = vec![render_record([column.header.as_str()])?];
            for row in rows {
                let cell = column.cell(row);
                lines.push(if cell.is_empty() { cell } else { render_record([cell])? });
            }
            Ok(lines.join("\n"))
        }
        _ => {
            let mut writer = csv_writer(Vec::new());
            writer.write_record(columns.iter().map(|c| c.header.as_str()))?;
            for row in rows {
                writer.write_record(columns.iter().map(|c| c.cell(row)))?;
            }
            finish(writer)
        }
    }
}

fn csv_writer(buffer: Vec<u8>) -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(buffer)
}

fn render_record<I, T>(fields: I) -> Result<String, Error>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv_writer(Vec::new());
    writer.write_record(fields)?;
    finish(writer)
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, Error> {
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| Error::InvalidOperation(e.to_string()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Renders the filtered and sorted rows of a table, ignoring pagination.
pub fn export_table<R: Fields>(table: &TableState<R>, columns: &[ExportColumn]) -> Result<String, Error> {
    export_csv(table.filtered_data(), columns)
}

/// `export_<YYYY-MM-DD>_<HH-MM-SS>.csv` for the given instant.
pub fn default_export_filename<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("export_{}.csv", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Writes CSV text to `dir/filename`, using the default name when none is
/// given. Returns the written path.
pub fn write_export(dir: &Path, filename: Option<&str>, contents: &str) -> Result<PathBuf, Error> {
    let name = match filename {
        Some(name) => name.to_string(),
        None => default_export_filename(&chrono::Local::now()),
    };
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    log::debug!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::Row;

    #[test]
    fn test_quotes_only_when_needed() {
        let rows = vec![Row::new().set("a", "say \"hi\"").set("b", "line\nbreak").set("c", "plain")];
        let columns = [
            ExportColumn::new("a", "A"),
            ExportColumn::new("b", "B"),
            ExportColumn::new("c", "C"),
        ];
        assert_eq!(
            export_csv(&rows, &columns).unwrap(),
            "A,B,C\n\"say \"\"hi\"\"\",\"line\nbreak\",plain"
        );
    }

    #[test]
    fn test_missing_and_null_cells_are_empty() {
        let rows = vec![Row::new().set("a", Value::Null)];
        let columns = [ExportColumn::new("a", "A"), ExportColumn::new("b", "B")];
        assert_eq!(export_csv(&rows, &columns).unwrap(), "A,B\n,");
    }

    #[test]
    fn test_single_column_empty_cell_is_bare() {
        let rows = vec![Row::new().set("a", Value::Null), Row::new().set("a", "x,y")];
        let columns = [ExportColumn::new("a", "A")];
        assert_eq!(export_csv(&rows, &columns).unwrap(), "A\n\n\"x,y\"");
    }

    #[test]
    fn test_transform_applies_before_stringify() {
        let rows = vec![Row::new().set("active", true)];
        let columns = [ExportColumn::new("active", "Active")
            .with_transform(|v| Value::from(if v == &Value::Bool(true) { "Yes" } else { "No" }))];
        assert_eq!(export_csv(&rows, &columns).unwrap(), "Active\nYes");
    }

    #[test]
    fn test_header_only() {
        let columns = [ExportColumn::new("a", "A")];
        assert_eq!(export_csv(&Vec::<Row>::new(), &columns).unwrap(), "A");
    }

    #[test]
    fn test_default_filename() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(default_export_filename(&at), "export_2024-03-09_14-05-07.csv");
    }
}
