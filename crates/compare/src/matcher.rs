use std::collections::BTreeMap;

use crate::error::CompareError;
use crate::model::{BestCandidateTable, MatchLogEntry, MatchResult, MatchStats};

/// Join the primary's best candidates against one secondary's best candidates.
///
/// A key matches only when both tables hold it and the two candidates share a
/// run id. Beam ids are not compared: under `ByEventAndBeam` they are part of
/// the key, under `ByEvent` they may differ. A secondary candidate with
/// `ndf == 0` is counted in `zero_ndf` and treated as a non-match.
pub fn match_tables(
    table: &str,
    primary: &BestCandidateTable,
    secondary: &BestCandidateTable,
    record_log: bool,
) -> Result<MatchResult, CompareError> {
    if primary.scheme() != secondary.scheme() {
        return Err(CompareError::SchemeMismatch {
            expected: primary.scheme(),
            found: secondary.scheme(),
        });
    }

    let mut qualities = BTreeMap::new();
    let mut stats = MatchStats::default();
    let mut log = Vec::new();

    for (key, primary_rec) in primary.iter() {
        let Some(secondary_rec) = secondary.get(key) else {
            stats.absent += 1;
            continue;
        };

        if secondary_rec.run_id != primary_rec.run_id {
            stats.run_mismatches += 1;
            continue;
        }

        if secondary_rec.ndf == 0 {
            stats.zero_ndf += 1;
            continue;
        }

        qualities.insert(*key, secondary_rec.chi_square / secondary_rec.ndf as f32);
        stats.matches += 1;

        if record_log {
            log.push(MatchLogEntry {
                event_id: key.event_id(),
                primary_run: primary_rec.run_id,
                secondary_run: secondary_rec.run_id,
                primary_beam: primary_rec.beam_id,
                secondary_beam: secondary_rec.beam_id,
            });
        }
    }

    if stats.zero_ndf > 0 {
        log::warn!(
            "{table}: {} candidate(s) with kin_ndf = 0 treated as no match",
            stats.zero_ndf
        );
    }
    log::debug!(
        "{table}: {} matched, {} run mismatches, {} absent",
        stats.matches,
        stats.run_mismatches,
        stats.absent,
    );

    Ok(MatchResult {
        table: table.to_string(),
        scheme: primary.scheme(),
        qualities,
        stats,
        log,
    })
}
