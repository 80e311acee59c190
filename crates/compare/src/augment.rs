use crate::config::{quality_column, CHI_SQUARE_EPSILON, NO_MATCH_QUALITY};
use crate::error::CompareError;
use crate::model::{AugmentedRow, AugmentedTable, BestCandidateTable, Dataset, MatchResult};

/// True when two chi-square values are closer than [`CHI_SQUARE_EPSILON`].
pub fn chi_squares_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < CHI_SQUARE_EPSILON
}

/// Rebuild the primary dataset's rows with one quality column per secondary.
///
/// Every row of the unreduced primary is considered. Rows sharing a key get
/// the same quality values. Unless `preserve_all` is set, only rows whose
/// chi-square equals their key's best candidate survive.
pub fn augment<'a>(
    primary: &'a Dataset,
    primary_table: &BestCandidateTable,
    results: &[MatchResult],
    preserve_all: bool,
) -> Result<AugmentedTable<'a>, CompareError> {
    let scheme = primary_table.scheme();
    if let Some(r) = results.iter().find(|r| r.scheme != scheme) {
        return Err(CompareError::SchemeMismatch { expected: scheme, found: r.scheme });
    }

    let mut columns = primary.columns.clone();
    columns.extend(results.iter().map(|r| quality_column(&r.table)));

    let mut rows = Vec::new();
    for row in &primary.rows {
        let key = scheme.key_for(&row.record);

        let best = primary_table.get(&key).ok_or_else(|| {
            CompareError::Logic(format!(
                "{}: key {key:?} missing from its own best-candidate table",
                primary.name
            ))
        })?;

        if !preserve_all && !chi_squares_equal(row.record.chi_square, best.chi_square) {
            continue;
        }

        let qualities = results
            .iter()
            .map(|r| r.quality(&key).unwrap_or(NO_MATCH_QUALITY))
            .collect();

        rows.push(AugmentedRow { source: row, qualities });
    }

    Ok(AugmentedTable { columns, rows })
}
