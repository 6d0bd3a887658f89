//! Spaced-seed fingerprint + clique scan to find reads that are proper
//! prefixes of other reads.
//!
//! The spaced-seed pattern (`101`, repeating over the first 48 bases,
//! keeping 32 of them) must be reproduced exactly: running the deduper twice
//! on the same input has to produce the same deletion set, and any
//! deviation from this exact pattern breaks that determinism.

use crate::constants::FINGERPRINT_BASES;
use crate::error::SffError;
use crate::store::{Iid, Projection, ReadStore};
use rayon::prelude::*;

/// 2-bit code for one base. Anything outside `{A,C,G,T}` (i.e. `N`) is folded
/// to the `A` slot; by this point in the pipeline `N`-bearing reads have
/// already been deleted by the quality filter, so this only matters for
/// deleted/never-filtered reads still carried for IID stability.
fn base_code(b: u8) -> u64 {
    match b {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 0,
    }
}

/// Whether the spaced-seed pattern `101` (repeating) keeps position `i`.
fn pattern_keeps(i: usize) -> bool {
    i % 3 != 1
}

/// Compute the 64-bit spaced-seed fingerprint over the first
/// [`FINGERPRINT_BASES`] bases of `seq`. Precondition: `seq.len() >=
/// FINGERPRINT_BASES` (guaranteed by ingest's length gate).
pub fn fingerprint(seq: &[u8]) -> u64 {
    debug_assert!(seq.len() >= FINGERPRINT_BASES);
    let mut hash: u64 = 0;
    for (i, &b) in seq.iter().take(FINGERPRINT_BASES).enumerate() {
        if pattern_keeps(i) {
            hash = (hash << 2) | base_code(b);
        }
    }
    hash
}

struct Entry {
    fingerprint: u64,
    iid: Iid,
    uid: String,
    len: usize,
    deleted: bool,
    sequence: Vec<u8>,
}

/// Run the dedup pass, deleting prefix-duplicate reads in `store`.
///
/// Cliques (maximal runs of equal fingerprint) are disjoint by construction,
/// so they're dispatched to `rayon`'s pool and compared independently;
/// merging their deletions afterward keeps the store mutation itself
/// single-threaded and ordered.
pub fn run(store: &mut ReadStore) {
    let mut entries: Vec<Entry> = store
        .stream(Projection {
            info: true,
            sequence: true,
            ..Default::default()
        })
        .map(|r| Entry {
            fingerprint: fingerprint(&r.sequence),
            iid: r.iid,
            uid: r.uid,
            len: r.sequence.len(),
            deleted: r.deleted,
            sequence: r.sequence,
        })
        .collect();

    entries.sort_by_key(|e| e.fingerprint);

    let mut cliques: Vec<&[Entry]> = Vec::new();
    let mut start = 0;
    while start < entries.len() {
        let mut end = start + 1;
        while end < entries.len() && entries[end].fingerprint == entries[start].fingerprint {
            end += 1;
        }
        cliques.push(&entries[start..end]);
        start = end;
    }

    let per_clique: Vec<Vec<(Iid, String, String)>> = cliques
        .into_par_iter()
        .map(|clique| {
            let mut out = Vec::new();
            dedupe_clique(clique, &mut out);
            out
        })
        .collect();

    for (iid, uid, survivor_uid) in per_clique.into_iter().flatten() {
        log::info!(
            "{} (of {survivor_uid})",
            SffError::PrefixDuplicate { uid }
        );
        store.delete(iid);
    }
}

/// Evaluate every unordered pair within one fingerprint clique, collecting
/// the IIDs to delete (and the surviving read's UID for each).
fn dedupe_clique(clique: &[Entry], out: &mut Vec<(Iid, String, String)>) {
    for i in 0..clique.len() {
        for j in (i + 1)..clique.len() {
            let (a, b) = if clique[i].len <= clique[j].len() {
                (&clique[i], &clique[j])
            } else {
                (&clique[j], &clique[i])
            };

            if a.deleted && b.deleted {
                continue;
            }
            if a.deleted && a.len < b.len {
                continue;
            }
            if a.len == b.len {
                let (lower, _higher) = if a.iid <= b.iid { (a, b) } else { (b, a) };
                if lower.deleted {
                    continue;
                }
            }

            let cmp_len = a.len.min(b.len);
            if a.sequence[..cmp_len] != b.sequence[..cmp_len] {
                continue;
            }

            if a.len == b.len {
                let (victim, survivor) = if a.iid < b.iid { (a, b) } else { (b, a) };
                out.push((victim.iid, victim.uid.clone(), survivor.uid.clone()));
            } else {
                out.push((a.iid, a.uid.clone(), b.uid.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ReadRecord;

    fn rec(uid: &str, seq: &[u8]) -> ReadRecord {
        let qual = vec![b'5'; seq.len()];
        ReadRecord::new(uid.to_string(), 0, seq.to_vec(), qual)
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let seq = vec![b'A'; 60];
        assert_eq!(fingerprint(&seq), fingerprint(&seq));
    }

    #[test]
    fn fingerprint_selects_32_of_48() {
        let count = (0..FINGERPRINT_BASES).filter(|&i| pattern_keeps(i)).count();
        assert_eq!(count, 32);
    }

    #[test]
    fn deletes_shorter_exact_prefix() {
        let mut store = ReadStore::new();
        let short_seq = vec![b'A'; 60];
        let mut long_seq = vec![b'A'; 70];
        long_seq[65] = b'A'; // still all-A, long_seq starts with short_seq
        let short = store.append(rec("short", &short_seq)).unwrap();
        let long = store.append(rec("long", &long_seq)).unwrap();
        run(&mut store);
        assert!(store.is_deleted(short));
        assert!(!store.is_deleted(long));
    }

    #[test]
    fn keeps_non_prefix_reads_with_same_fingerprint_bases() {
        let mut store = ReadStore::new();
        // Same first 48 bases (all A) but diverging after that: not a prefix relation.
        let mut a = vec![b'A'; 60];
        a[50] = b'C';
        let mut b = vec![b'A'; 60];
        b[50] = b'G';
        let ia = store.append(rec("a", &a)).unwrap();
        let ib = store.append(rec("b", &b)).unwrap();
        run(&mut store);
        assert!(!store.is_deleted(ia));
        assert!(!store.is_deleted(ib));
    }

    #[test]
    fn equal_length_tie_deletes_lower_iid() {
        let mut store = ReadStore::new();
        let seq = vec![b'A'; 64];
        let first = store.append(rec("first", &seq)).unwrap();
        let second = store.append(rec("second", &seq)).unwrap();
        run(&mut store);
        assert!(store.is_deleted(first));
        assert!(!store.is_deleted(second));
    }

    #[test]
    fn deterministic_across_repeated_runs() {
        let mut store = ReadStore::new();
        let short = vec![b'A'; 60];
        let long = vec![b'A'; 70];
        store.append(rec("short", &short)).unwrap();
        store.append(rec("long", &long)).unwrap();
        run(&mut store);
        let after_first: Vec<bool> = (1..=store.len() as Iid)
            .map(|iid| store.is_deleted(iid))
            .collect();
        run(&mut store);
        let after_second: Vec<bool> = (1..=store.len() as Iid)
            .map(|iid| store.is_deleted(iid))
            .collect();
        assert_eq!(after_first, after_second);
    }
}
