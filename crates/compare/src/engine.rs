use rayon::prelude::*;

use crate::augment::augment;
use crate::config::{quality_column, CompareConfig};
use crate::error::CompareError;
use crate::matcher::match_tables;
use crate::model::{
    AugmentedTable, BestCandidateTable, CompareMeta, CompareSummary, Dataset, DatasetSummary,
    MatchResult, SecondarySummary,
};
use crate::reduce::reduce;
use crate::source::{load_dataset, LoadOptions};

/// Pipeline phases. Each is a complete barrier before the next starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loaded,
    Reduced,
    Matched,
    Augmented,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Reduced => write!(f, "reduced"),
            Self::Matched => write!(f, "matched"),
            Self::Augmented => write!(f, "augmented"),
        }
    }
}

/// Loaded datasets: one primary and the secondaries in config order.
pub struct CompareInput {
    pub primary: Dataset,
    pub secondaries: Vec<Dataset>,
}

pub struct CompareOutcome<'a> {
    pub table: AugmentedTable<'a>,
    pub primary_table: BestCandidateTable,
    pub results: Vec<MatchResult>,
    pub summary: CompareSummary,
}

/// Load every dataset named by the config, each on its own worker.
pub fn load_input(config: &CompareConfig, options: &LoadOptions) -> Result<CompareInput, CompareError> {
    let (primary, secondaries) = rayon::join(
        || load_dataset(&config.primary, options),
        || {
            config
                .secondaries
                .par_iter()
                .map(|locator| load_dataset(locator, options))
                .collect::<Result<Vec<_>, _>>()
        },
    );

    let input = CompareInput { primary: primary?, secondaries: secondaries? };
    log::info!(
        "{}: primary '{}' {} row(s), {} secondary dataset(s)",
        Phase::Loaded,
        input.primary.name,
        input.primary.len(),
        input.secondaries.len(),
    );
    Ok(input)
}

/// Run reduction, matching and augmentation over pre-loaded datasets.
pub fn run<'a>(config: &CompareConfig, input: &'a CompareInput) -> Result<CompareOutcome<'a>, CompareError> {
    if input.secondaries.is_empty() {
        return Err(CompareError::ConfigValidation(
            "at least one secondary dataset is required".into(),
        ));
    }
    for sec in &input.secondaries {
        let column = quality_column(&sec.name);
        if input.primary.columns.contains(&column) {
            return Err(CompareError::ConfigValidation(format!(
                "primary '{}' already has a '{column}' column",
                input.primary.name
            )));
        }
    }

    let scheme = config.scheme;

    // Every reduction is independent; no table is read until all are built.
    let (primary_table, secondary_tables) = rayon::join(
        || reduce(&input.primary, scheme),
        || {
            input
                .secondaries
                .par_iter()
                .map(|ds| reduce(ds, scheme))
                .collect::<Vec<_>>()
        },
    );
    log::info!(
        "{}: {} best candidate(s) in '{}' ({scheme})",
        Phase::Reduced,
        primary_table.len(),
        input.primary.name,
    );

    // The primary table is frozen; passes only read it.
    let results = input
        .secondaries
        .par_iter()
        .zip(secondary_tables.par_iter())
        .map(|(ds, table)| match_tables(&ds.name, &primary_table, table, config.logging))
        .collect::<Result<Vec<_>, _>>()?;

    let total_matches: usize = results.iter().map(|r| r.stats.matches).sum();
    for (ds, result) in input.secondaries.iter().zip(&results) {
        log::info!(
            "{}: '{}' {} match(es) out of {} key(s)",
            Phase::Matched,
            ds.name,
            result.stats.matches,
            primary_table.len(),
        );
    }

    let table = augment(&input.primary, &primary_table, &results, config.preserve_combos)?;
    log::info!(
        "{}: {} of {} primary row(s) retained",
        Phase::Augmented,
        table.rows.len(),
        input.primary.len(),
    );

    let summary = CompareSummary {
        meta: CompareMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            scheme,
            preserve_combos: config.preserve_combos,
        },
        primary: DatasetSummary {
            table: input.primary.name.clone(),
            rows: input.primary.len(),
            best_candidates: primary_table.len(),
        },
        secondaries: input
            .secondaries
            .iter()
            .zip(&secondary_tables)
            .zip(&results)
            .map(|((ds, t), r)| SecondarySummary {
                table: ds.name.clone(),
                rows: ds.len(),
                best_candidates: t.len(),
                column: quality_column(&ds.name),
                stats: r.stats,
            })
            .collect(),
        total_matches,
        output_rows: table.rows.len(),
        output_columns: table.columns.clone(),
    };

    Ok(CompareOutcome { table, primary_table, results, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetLocator, NO_MATCH_QUALITY};
    use crate::key::KeyScheme;
    use crate::model::Record;

    fn config(n: usize) -> CompareConfig {
        CompareConfig::new(
            DatasetLocator::new("h1.csv", "h1"),
            (0..n)
                .map(|i| DatasetLocator::new(format!("h{}.csv", i + 2), format!("h{}", i + 2)))
                .collect(),
        )
    }

    fn primary() -> Dataset {
        Dataset::from_records(
            "h1",
            [Record::new(1, 10, 1, 5.0, 2), Record::new(1, 10, 1, 3.0, 2)],
        )
    }

    #[test]
    fn secondaries_are_independent() {
        let input = CompareInput {
            primary: primary(),
            secondaries: vec![
                Dataset::from_records("h2", [Record::new(1, 10, 1, 4.0, 2)]),
                Dataset::from_records("h3", [Record::new(1, 11, 1, 4.0, 2)]),
            ],
        };
        let out = run(&config(2), &input).unwrap();
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(out.table.rows[0].qualities, vec![2.0, NO_MATCH_QUALITY]);
        assert_eq!(out.summary.total_matches, 1);
        assert_eq!(out.summary.secondaries[0].stats.matches, 1);
        assert_eq!(out.summary.secondaries[1].stats.run_mismatches, 1);
        assert_eq!(out.summary.output_columns.len(), 7);
    }

    #[test]
    fn summary_counts() {
        let input = CompareInput {
            primary: primary(),
            secondaries: vec![Dataset::from_records(
                "h2",
                [Record::new(1, 10, 1, 4.0, 2), Record::new(1, 10, 2, 1.0, 2)],
            )],
        };
        let mut cfg = config(1);
        cfg.scheme = KeyScheme::ByEventAndBeam;
        cfg.preserve_combos = true;
        let out = run(&cfg, &input).unwrap();
        assert_eq!(out.summary.primary.rows, 2);
        assert_eq!(out.summary.primary.best_candidates, 1);
        assert_eq!(out.summary.secondaries[0].best_candidates, 2);
        assert_eq!(out.summary.output_rows, 2);
        assert!(out.summary.meta.preserve_combos);
        assert_eq!(out.primary_table.scheme(), KeyScheme::ByEventAndBeam);
    }

    #[test]
    fn chained_primary_column_collision() {
        let mut chained = primary();
        chained.columns.push("h2_chisq_ndf".into());
        for row in &mut chained.rows {
            row.fields.push("1".into());
        }
        let input = CompareInput {
            primary: chained,
            secondaries: vec![Dataset::from_records("h2", [Record::new(1, 10, 1, 4.0, 2)])],
        };
        let err = run(&config(1), &input).err().unwrap();
        assert!(matches!(err, CompareError::ConfigValidation(_)));
    }

    #[test]
    fn logging_collects_entries() {
        let input = CompareInput {
            primary: primary(),
            secondaries: vec![Dataset::from_records("h2", [Record::new(1, 10, 1, 4.0, 2)])],
        };
        let mut cfg = config(1);
        cfg.logging = true;
        let out = run(&cfg, &input).unwrap();
        assert_eq!(out.results[0].log.len(), 1);
        assert_eq!(out.results[0].log[0].event_id, 1);
    }
}
