use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::key::{Key, KeyScheme};
use crate::model::{BestCandidateTable, Dataset, Record};

/// Reduce a dataset to its minimal-chi-square record per key.
///
/// Single forward pass in input order. A stored record is replaced only by a
/// strictly smaller chi-square, so on ties the first-seen record wins.
pub fn reduce(dataset: &Dataset, scheme: KeyScheme) -> BestCandidateTable {
    reduce_records(dataset.records(), scheme)
}

pub fn reduce_records<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    scheme: KeyScheme,
) -> BestCandidateTable {
    let mut entries: BTreeMap<Key, Record> = BTreeMap::new();

    for record in records {
        match entries.entry(scheme.key_for(record)) {
            Entry::Vacant(slot) => {
                slot.insert(*record);
            }
            Entry::Occupied(mut slot) => {
                if record.chi_square < slot.get().chi_square {
                    slot.insert(*record);
                }
            }
        }
    }

    BestCandidateTable { scheme, entries }
}
