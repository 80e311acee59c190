//! CSV-backed dataset source and augmented-output sink.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DatasetLocator;
use crate::error::CompareError;
use crate::model::{
    AugmentedTable, Dataset, DatasetRow, Record, COL_BEAM, COL_CHI_SQUARE, COL_EVENT, COL_NDF,
    COL_RUN,
};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Shared flag that aborts in-flight loads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub cancel: Option<CancelToken>,
    pub timeout: Option<Duration>,
}

/// Rows between deadline checks.
const DEADLINE_POLL_ROWS: usize = 1024;

struct LoadGuard<'a> {
    dataset: &'a str,
    cancel: Option<&'a CancelToken>,
    deadline: Option<Instant>,
}

impl LoadGuard<'_> {
    /// `index` is the zero-based row about to be read.
    fn check(&self, index: usize) -> Result<(), CompareError> {
        if self.cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(CompareError::Cancelled { dataset: self.dataset.into() });
        }
        if index % DEADLINE_POLL_ROWS == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(CompareError::TimedOut { dataset: self.dataset.into() });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Expand a locator's file pattern into the matching paths, sorted.
pub fn resolve_files(locator: &DatasetLocator) -> Result<Vec<PathBuf>, CompareError> {
    // An existing file is taken literally, even if its name holds glob metacharacters.
    let literal = Path::new(&locator.file);
    if literal.is_file() {
        return Ok(vec![literal.to_path_buf()]);
    }

    let paths = glob::glob(&locator.file).map_err(|e| {
        CompareError::ConfigValidation(format!("{}: bad file pattern '{}': {e}", locator.table, locator.file))
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| CompareError::Io(e.to_string()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(CompareError::Io(format!(
            "{}: no file matches '{}'",
            locator.table, locator.file
        )));
    }
    Ok(files)
}

/// Load every file of a locator into one dataset. Loading is eager; all files
/// must share the first file's header.
pub fn load_dataset(locator: &DatasetLocator, options: &LoadOptions) -> Result<Dataset, CompareError> {
    let files = resolve_files(locator)?;
    let guard = LoadGuard {
        dataset: &locator.table,
        cancel: options.cancel.as_ref(),
        deadline: options.timeout.map(|t| Instant::now() + t),
    };

    let mut dataset: Option<Dataset> = None;
    for path in &files {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| CompareError::Io(format!("cannot read {}: {e}", path.display())))?;

        match dataset.as_mut() {
            None => {
                let mut ds = Dataset { name: locator.table.clone(), columns: Vec::new(), rows: Vec::new() };
                read_into(&mut ds, reader, &guard, true, path)?;
                dataset = Some(ds);
            }
            Some(ds) => read_into(ds, reader, &guard, false, path)?,
        }
    }

    let dataset = dataset.ok_or_else(|| CompareError::Logic("resolved file list was empty".into()))?;
    log::debug!("{}: loaded {} row(s) from {} file(s)", dataset.name, dataset.len(), files.len());
    Ok(dataset)
}

/// Parse a dataset from in-memory CSV text.
pub fn read_dataset_str(table: &str, csv_data: &str) -> Result<Dataset, CompareError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    let guard = LoadGuard { dataset: table, cancel: None, deadline: None };
    let mut ds = Dataset { name: table.into(), columns: Vec::new(), rows: Vec::new() };
    read_into(&mut ds, reader, &guard, true, Path::new("<memory>"))?;
    Ok(ds)
}

fn read_into<R: std::io::Read>(
    ds: &mut Dataset,
    mut reader: csv::Reader<R>,
    guard: &LoadGuard<'_>,
    first: bool,
    path: &Path,
) -> Result<(), CompareError> {
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CompareError::Io(format!("{}: {e}", path.display())))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if first {
        ds.columns = headers;
    } else if headers != ds.columns {
        return Err(CompareError::HeaderMismatch {
            dataset: ds.name.clone(),
            file: path.display().to_string(),
        });
    }

    let idx = |name: &str| -> Result<usize, CompareError> {
        ds.columns.iter().position(|h| h == name).ok_or_else(|| CompareError::MissingColumn {
            dataset: ds.name.clone(),
            column: name.into(),
        })
    };

    let event_idx = idx(COL_EVENT)?;
    let run_idx = idx(COL_RUN)?;
    let beam_idx = idx(COL_BEAM)?;
    let chisq_idx = idx(COL_CHI_SQUARE)?;
    let ndf_idx = idx(COL_NDF)?;

    let file = path.display().to_string();
    for (i, result) in reader.records().enumerate() {
        guard.check(ds.rows.len())?;
        let at = RowAt { dataset: &ds.name, file: &file, row: i + 1 };

        let record = result.map_err(|e| CompareError::Io(format!("{file}: {e}")))?;
        if record.len() != ds.columns.len() {
            return Err(CompareError::RowLength {
                dataset: ds.name.clone(),
                file: file.clone(),
                row: i + 1,
                expected: ds.columns.len(),
                found: record.len(),
            });
        }

        let parsed = Record {
            event_id: parse(&record, event_idx, COL_EVENT, &at)?,
            run_id: parse(&record, run_idx, COL_RUN, &at)?,
            beam_id: parse(&record, beam_idx, COL_BEAM, &at)?,
            chi_square: parse(&record, chisq_idx, COL_CHI_SQUARE, &at)?,
            ndf: parse(&record, ndf_idx, COL_NDF, &at)?,
        };

        let fields = record.iter().map(|f| f.to_string()).collect();
        ds.rows.push(DatasetRow { record: parsed, fields });
    }

    Ok(())
}

/// Location of a data row, 1-based within its file.
struct RowAt<'a> {
    dataset: &'a str,
    file: &'a str,
    row: usize,
}

fn parse<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    at: &RowAt<'_>,
) -> Result<T, CompareError> {
    let value = record.get(idx).unwrap_or("").trim();
    value.parse().map_err(|_| CompareError::ColumnType {
        dataset: at.dataset.into(),
        file: at.file.into(),
        column: column.into(),
        row: at.row,
        value: value.into(),
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write the augmented table as CSV to any writer.
pub fn write_augmented_to<W: Write>(writer: W, table: &AugmentedTable<'_>) -> Result<(), CompareError> {
    let mut out = csv::Writer::from_writer(writer);
    let io_err = |e: csv::Error| CompareError::Io(format!("cannot write output: {e}"));

    out.write_record(&table.columns).map_err(io_err)?;
    for row in &table.rows {
        let qualities = row.qualities.iter().map(|q| q.to_string());
        let record: Vec<String> = row.source.fields.iter().cloned().chain(qualities).collect();
        out.write_record(&record).map_err(io_err)?;
    }
    out.flush().map_err(|e| CompareError::Io(format!("cannot write output: {e}")))?;
    Ok(())
}

/// Write the augmented table to `path`. Writes a sibling temp file first and
/// renames it into place, so a failed write leaves no partial output.
pub fn write_augmented(path: &Path, table: &AugmentedTable<'_>) -> Result<(), CompareError> {
    let tmp_path = path.with_extension("csv.tmp");
    let file = std::fs::File::create(&tmp_path)
        .map_err(|e| CompareError::Io(format!("cannot create {}: {e}", tmp_path.display())))?;

    if let Err(e) = write_augmented_to(std::io::BufWriter::new(file), table) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        CompareError::Io(format!("cannot move output into {}: {e}", path.display()))
    })
}
