use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::CompareError;
use crate::model::MatchResult;

/// Write every accepted match as one line, secondaries in order.
pub fn write_match_log(path: &Path, results: &[MatchResult]) -> Result<usize, CompareError> {
    let file = File::create(path)
        .map_err(|e| CompareError::Io(format!("cannot open log file {}: {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    let mut lines = 0;
    for result in results {
        for entry in &result.log {
            writeln!(out, "{entry}").map_err(|e| CompareError::Io(e.to_string()))?;
            lines += 1;
        }
    }
    out.flush().map_err(|e| CompareError::Io(e.to_string()))?;
    Ok(lines)
}

/// Like [`write_match_log`], but a failure only disables logging for the run.
pub fn write_match_log_or_warn(path: &Path, results: &[MatchResult]) -> Option<usize> {
    match write_match_log(path, results) {
        Ok(lines) => {
            log::info!("wrote {lines} match line(s) to {}", path.display());
            Some(lines)
        }
        Err(e) => {
            log::warn!("{e}; match logging disabled for this run");
            None
        }
    }
}
