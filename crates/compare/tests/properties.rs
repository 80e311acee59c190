// Property-based tests for reduction, matching and retention.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use proptest::prelude::*;
use hypomatch_compare::augment::{augment, chi_squares_equal};
use hypomatch_compare::config::NO_MATCH_QUALITY;
use hypomatch_compare::key::KeyScheme;
use hypomatch_compare::matcher::match_tables;
use hypomatch_compare::model::{Dataset, Record};
use hypomatch_compare::reduce::reduce;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small id ranges so keys collide often. Chi-squares are drawn from a coarse
/// grid so ties happen and distinct values are far apart.
fn arb_record() -> impl Strategy<Value = Record> {
    (0u64..6, 10u32..12, 1u32..3, 0u32..40, 0u32..4)
        .prop_map(|(event, run, beam, chisq, ndf)| Record::new(event, run, beam, chisq as f32 * 0.5, ndf))
}

fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(arb_record(), 0..40)
}

fn arb_scheme() -> impl Strategy<Value = KeyScheme> {
    prop_oneof![Just(KeyScheme::ByEvent), Just(KeyScheme::ByEventAndBeam)]
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn reduction_is_minimal(records in arb_records(), scheme in arb_scheme()) {
        let ds = Dataset::from_records("p", records.clone());
        let table = reduce(&ds, scheme);

        let keys: BTreeSet<_> = records.iter().map(|r| scheme.key_for(r)).collect();
        prop_assert_eq!(table.len(), keys.len());

        for r in &records {
            let best = table.get(&scheme.key_for(r)).unwrap();
            prop_assert!(best.chi_square <= r.chi_square);
        }
    }

    #[test]
    fn reduction_is_idempotent(records in arb_records(), scheme in arb_scheme()) {
        let once = reduce(&Dataset::from_records("p", records), scheme);
        let twice = reduce(&once.to_dataset("p"), scheme);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn ties_keep_first_seen(records in arb_records(), scheme in arb_scheme()) {
        let table = reduce(&Dataset::from_records("p", records.clone()), scheme);
        for (key, best) in table.iter() {
            let first = records
                .iter()
                .find(|r| scheme.key_for(r) == *key && r.chi_square == best.chi_square)
                .unwrap();
            prop_assert_eq!(first, best);
        }
    }
}

// ---------------------------------------------------------------------------
// Matching + augmentation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn match_count_is_keys_with_equal_runs(
        primary in arb_records(),
        secondary in arb_records(),
        scheme in arb_scheme(),
    ) {
        let pt = reduce(&Dataset::from_records("p", primary), scheme);
        let st = reduce(&Dataset::from_records("s", secondary), scheme);
        let result = match_tables("s", &pt, &st, false).unwrap();

        let expected = pt
            .iter()
            .filter(|(k, p)| st.get(k).is_some_and(|s| s.run_id == p.run_id && s.ndf != 0))
            .count();
        prop_assert_eq!(result.stats.matches, expected);
        prop_assert_eq!(result.qualities.len(), expected);
        prop_assert_eq!(
            result.stats.matches + result.stats.run_mismatches + result.stats.absent + result.stats.zero_ndf,
            pt.len()
        );
    }

    #[test]
    fn sentinel_iff_unmatched(
        primary in arb_records(),
        secondaries in prop::collection::vec(arb_records(), 1..4),
        scheme in arb_scheme(),
        preserve in any::<bool>(),
    ) {
        let pds = Dataset::from_records("p", primary);
        let pt = reduce(&pds, scheme);
        let results: Vec<_> = secondaries
            .into_iter()
            .enumerate()
            .map(|(i, recs)| {
                let name = format!("s{i}");
                let st = reduce(&Dataset::from_records(name.clone(), recs), scheme);
                match_tables(&name, &pt, &st, false).unwrap()
            })
            .collect();

        let out = augment(&pds, &pt, &results, preserve).unwrap();
        for row in &out.rows {
            let key = scheme.key_for(&row.source.record);
            prop_assert_eq!(row.qualities.len(), results.len());
            for (q, r) in row.qualities.iter().zip(&results) {
                prop_assert_eq!(*q == NO_MATCH_QUALITY, r.quality(&key).is_none());
            }
        }
    }

    #[test]
    fn retention_keeps_best_rows_only(primary in arb_records(), scheme in arb_scheme()) {
        let pds = Dataset::from_records("p", primary);
        let pt = reduce(&pds, scheme);
        let out = augment(&pds, &pt, &[], false).unwrap();

        let expected = pds
            .records()
            .filter(|r| chi_squares_equal(r.chi_square, pt.get(&scheme.key_for(r)).unwrap().chi_square))
            .count();
        prop_assert_eq!(out.rows.len(), expected);
        prop_assert!(out.rows.len() >= pt.len());

        let all = augment(&pds, &pt, &[], true).unwrap();
        prop_assert_eq!(all.rows.len(), pds.len());
    }
}
