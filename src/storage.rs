use crate::error::{Error, Result};
use crate::models::{Indicator, TidyRow};
use csv::WriterBuilder;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fs::{self, File};
use std::path::Path;

/// A row type with a fixed, declared column list.
///
/// Column order in [`Record::HEADER`] must match the field order produced by
/// the type's `Serialize` impl.
pub trait Record: Serialize {
    const HEADER: &'static [&'static str];
}

impl Record for TidyRow {
    const HEADER: &'static [&'static str] = &["country", "year", "value"];
}

impl Record for Indicator {
    const HEADER: &'static [&'static str] = &["id", "label"];
}

/// Write rows as CSV with a header line, returning the number of data rows.
///
/// Rows are consumed lazily. Empty input fails with [`Error::EmptyDataset`]
/// before the target file is touched. The file is created (or truncated) in
/// place; a failure part-way through leaves the partially written file behind.
pub fn write_csv<R, I, P>(path: P, rows: I) -> Result<usize>
where
    R: Record,
    I: IntoIterator<Item = R>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return Err(Error::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(R::HEADER)?;
    let mut written = 0usize;
    for row in rows {
        wtr.serialize(&row)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// Convenience wrapper for data files.
pub fn save_rows<P: AsRef<Path>>(rows: &[TidyRow], path: P) -> Result<usize> {
    write_csv(path, rows.iter().cloned())
}

/// Write the indicator id/label table.
pub fn save_indicators<P: AsRef<Path>>(indicators: &[Indicator], path: P) -> Result<usize> {
    write_csv(path, indicators.iter().copied())
}

/// Prefix cells that a spreadsheet would evaluate as a formula.
pub fn guard_formula(s: &str) -> Cow<'_, str> {
    if s.starts_with(['=', '+', '-', '@']) {
        Cow::Owned(format!("'{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

pub(crate) fn ser_text<T, S>(value: &T, serializer: S) -> core::result::Result<S::Ok, S::Error>
where
    T: AsRef<str> + ?Sized,
    S: Serializer,
{
    serializer.serialize_str(&guard_formula(value.as_ref()))
}
