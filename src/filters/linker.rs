//! Local alignment against a linker probe, tiered acceptance, and the
//! trim/split/recurse mate-pair construction protocol.

use crate::error::SffError;
use crate::store::{ClearRange, ClearRangeKind, Iid, Orientation, Projection, ReadRecord, ReadStore};

/// Result of one local alignment of `linker` against a read.
#[derive(Debug, Clone, Copy)]
pub struct AlignHit {
    pub beg_i: usize,
    pub end_i: usize,
    pub beg_j: usize,
    pub end_j: usize,
    pub align_len: usize,
    pub matches: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Trace {
    None,
    Diag,
    Up,
    Left,
}

const MATCH_SCORE: i32 = 2;
const MISMATCH_SCORE: i32 = -1;
const GAP_SCORE: i32 = -2;

/// Local (Smith-Waterman-style) alignment of `a` (the linker) against `b`
/// (the read). Unbanded: both inputs are bounded by `AS_READ_MAX_LEN`, so a
/// full O(|a||b|) DP is cheap in practice; a banded variant would only
/// change the search window, not the result for well-formed linker hits.
pub fn local_align(a: &[u8], b: &[u8]) -> AlignHit {
    let rows = a.len() + 1;
    let cols = b.len() + 1;
    let mut score = vec![0i32; rows * cols];
    let mut trace = vec![Trace::None; rows * cols];
    let idx = |i: usize, j: usize| i * cols + j;

    let mut best_score = 0i32;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..rows {
        for j in 1..cols {
            let sub = if a[i - 1] == b[j - 1] {
                MATCH_SCORE
            } else {
                MISMATCH_SCORE
            };
            let diag = score[idx(i - 1, j - 1)] + sub;
            let up = score[idx(i - 1, j)] + GAP_SCORE;
            let left = score[idx(i, j - 1)] + GAP_SCORE;

            let mut s = 0;
            let mut t = Trace::None;
            if diag > s {
                s = diag;
                t = Trace::Diag;
            }
            if up > s {
                s = up;
                t = Trace::Up;
            }
            if left > s {
                s = left;
                t = Trace::Left;
            }
            score[idx(i, j)] = s;
            trace[idx(i, j)] = t;
            if s > best_score {
                best_score = s;
                best_i = i;
                best_j = j;
            }
        }
    }

    let mut i = best_i;
    let mut j = best_j;
    let mut align_len = 0usize;
    let mut matches = 0usize;
    loop {
        match trace[idx(i, j)] {
            Trace::None => break,
            Trace::Diag => {
                if a[i - 1] == b[j - 1] {
                    matches += 1;
                }
                align_len += 1;
                i -= 1;
                j -= 1;
            }
            Trace::Up => {
                align_len += 1;
                i -= 1;
            }
            Trace::Left => {
                align_len += 1;
                j -= 1;
            }
        }
    }

    AlignHit {
        beg_i: i,
        end_i: best_i,
        beg_j: j,
        end_j: best_j,
        align_len,
        matches,
    }
}

/// *good*: at least one of the four acceptance tiers is met.
pub fn is_good(hit: &AlignHit) -> bool {
    let a = hit.align_len;
    let m = hit.matches;
    (a >= 5 && m + 1 >= a)
        || (a >= 15 && m + 2 >= a)
        || (a >= 30 && m + 3 >= a)
        || (a >= 40 && m + 4 >= a)
}

/// *best*: strong enough to act on (trim/split) rather than merely annotate.
pub fn is_best(hit: &AlignHit) -> bool {
    hit.align_len >= 42 && hit.matches + 2 >= hit.align_len
}

const LSIZE_RSIZE_THRESHOLD: usize = 64;

fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            _ => b'N',
        })
        .collect()
}

fn reverse(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Packed clear-range payload for a *good*-but-not-*best* hit, passed
/// downstream to OBT.
#[derive(Debug, Clone, Copy)]
pub struct AnnotateData {
    pub clear_qlt_beg: u32,
    pub clear_qlt_end: u32,
    pub clear_vec_beg: u32,
    pub clear_vec_end: u32,
}

impl AnnotateData {
    fn from_hit(hit: &AlignHit) -> Self {
        Self {
            clear_qlt_beg: ((hit.beg_i as u32) << 8) | hit.end_i as u32,
            clear_qlt_end: ((hit.align_len as u32) << 8) | hit.matches as u32,
            clear_vec_beg: hit.beg_j as u32,
            clear_vec_end: hit.end_j as u32,
        }
    }

    /// Reconstruct the 64-bit value the emitter re-encodes as
    /// `linktrim:0x<16-hex-digits>`.
    pub fn packed_u64(&self) -> u64 {
        ((self.clear_qlt_beg as u64) << 48)
            | ((self.clear_qlt_end as u64) << 32)
            | ((self.clear_vec_beg as u64) << 16)
            | self.clear_vec_end as u64
    }
}

/// One resolved fragment emerging from a mate split: its sequence/quality
/// plus any leftover annotation discovered during its own recursive rescan.
struct MateResult {
    sequence: Vec<u8>,
    quality: Vec<u8>,
    annotate: Option<AnnotateData>,
}

/// Outcome of recursively resolving one read (or candidate mate) against the
/// linker.
enum Resolved {
    Unchanged,
    Annotate(AnnotateData),
    Trimmed(Vec<u8>, Vec<u8>, Option<AnnotateData>),
    Split {
        m1: MateResult,
        m2: MateResult,
        ambiguous: bool,
    },
    /// This candidate wanted to split further but was given no output slots:
    /// it's already the product of an earlier split.
    SplitDenied,
}

/// Recursively resolve `seq`/`qual` against `linker`. `allow_split` is false
/// exactly when this call is itself processing one half of an earlier split,
/// i.e. recursing on a mate with no output slots of its own.
fn resolve(seq: &[u8], qual: &[u8], linker: &[u8], allow_split: bool) -> Resolved {
    let hit = local_align(linker, seq);
    if !is_good(&hit) {
        return Resolved::Unchanged;
    }

    let l_size = hit.beg_j;
    let r_size = seq.len() - hit.end_j;
    let best = is_best(&hit);

    if best && l_size < LSIZE_RSIZE_THRESHOLD {
        let sub_seq = seq[hit.end_j..].to_vec();
        let sub_qual = qual[hit.end_j..].to_vec();
        return match resolve(&sub_seq, &sub_qual, linker, allow_split) {
            Resolved::Unchanged => Resolved::Trimmed(sub_seq, sub_qual, None),
            Resolved::Annotate(a) => Resolved::Trimmed(sub_seq, sub_qual, Some(a)),
            Resolved::Trimmed(s, q, a) => Resolved::Trimmed(s, q, a),
            Resolved::Split { m1, m2, ambiguous } => Resolved::Split { m1, m2, ambiguous },
            Resolved::SplitDenied => Resolved::SplitDenied,
        };
    }

    if best && r_size < LSIZE_RSIZE_THRESHOLD {
        let sub_seq = seq[..hit.beg_j].to_vec();
        let sub_qual = qual[..hit.beg_j].to_vec();
        return match resolve(&sub_seq, &sub_qual, linker, allow_split) {
            Resolved::Unchanged => Resolved::Trimmed(sub_seq, sub_qual, None),
            Resolved::Annotate(a) => Resolved::Trimmed(sub_seq, sub_qual, Some(a)),
            Resolved::Trimmed(s, q, a) => Resolved::Trimmed(s, q, a),
            Resolved::Split { m1, m2, ambiguous } => Resolved::Split { m1, m2, ambiguous },
            Resolved::SplitDenied => Resolved::SplitDenied,
        };
    }

    if best {
        // l_size >= 64 && r_size >= 64: a genuine mate split.
        if !allow_split {
            return Resolved::SplitDenied;
        }
        let m1_seq = reverse_complement(&seq[..l_size]);
        let m1_qual = reverse(&qual[..l_size]);
        let m2_seq = seq[hit.end_j..].to_vec();
        let m2_qual = qual[hit.end_j..].to_vec();

        let r1 = resolve(&m1_seq, &m1_qual, linker, false);
        let r2 = resolve(&m2_seq, &m2_qual, linker, false);

        let ambiguous = matches!(r1, Resolved::SplitDenied) || matches!(r2, Resolved::SplitDenied);
        if ambiguous {
            return Resolved::Split {
                m1: MateResult {
                    sequence: m1_seq,
                    quality: m1_qual,
                    annotate: None,
                },
                m2: MateResult {
                    sequence: m2_seq,
                    quality: m2_qual,
                    annotate: None,
                },
                ambiguous: true,
            };
        }

        let m1 = finalize_mate(r1, m1_seq, m1_qual);
        let m2 = finalize_mate(r2, m2_seq, m2_qual);
        return Resolved::Split {
            m1,
            m2,
            ambiguous: false,
        };
    }

    // good but not best: annotate for OBT, no mutation.
    Resolved::Annotate(AnnotateData::from_hit(&hit))
}

fn finalize_mate(resolved: Resolved, fallback_seq: Vec<u8>, fallback_qual: Vec<u8>) -> MateResult {
    match resolved {
        Resolved::Unchanged => MateResult {
            sequence: fallback_seq,
            quality: fallback_qual,
            annotate: None,
        },
        Resolved::Annotate(a) => MateResult {
            sequence: fallback_seq,
            quality: fallback_qual,
            annotate: Some(a),
        },
        Resolved::Trimmed(s, q, a) => MateResult {
            sequence: s,
            quality: q,
            annotate: a,
        },
        Resolved::Split { .. } | Resolved::SplitDenied => {
            unreachable!("allow_split=false never yields Split/SplitDenied here")
        }
    }
}

fn apply_annotation(record: &mut ReadRecord, annot: &AnnotateData) {
    record.linker_detected_but_not_trimmed = true;
    record.set_clear_range(
        ClearRangeKind::Qlt,
        ClearRange::new(annot.clear_qlt_beg, annot.clear_qlt_end),
    );
    record.set_clear_range(
        ClearRangeKind::Vec,
        ClearRange::new(annot.clear_vec_beg, annot.clear_vec_end),
    );
}

/// Sentinel a split parent's UID is set to once it's replaced by its mates.
pub const UNDEFINED_UID: &str = "";

/// Applies the linker splitter once per live read, in IID order, over
/// `store`. New records from trims/splits are appended past the snapshot
/// range taken at the start, so this single forward pass never revisits
/// records it just created.
pub fn run(store: &mut ReadStore, linker: &str) {
    let linker_bytes = linker.as_bytes();
    let last = store.next_iid();

    for iid in ReadStore::first_iid()..last {
        let Some(record) = store.get(iid, Projection::all()) else {
            continue;
        };
        if record.deleted {
            continue;
        }

        match resolve(&record.sequence, &record.quality, linker_bytes, true) {
            Resolved::Unchanged => {}

            Resolved::Annotate(annot) => {
                let mut updated = record;
                apply_annotation(&mut updated, &annot);
                store.put(iid, updated);
            }

            Resolved::Trimmed(seq, qual, annot) => {
                store.delete(iid);
                let mut survivor = ReadRecord::new(record.uid.clone(), 0, seq, qual);
                survivor.library_iid = record.library_iid;
                if let Some(a) = annot {
                    apply_annotation(&mut survivor, &a);
                }
                let _ = store.append(survivor);
            }

            Resolved::Split { m1, m2, ambiguous } => {
                store.delete(iid);
                let mut parent_undefined = record.clone();
                parent_undefined.uid = UNDEFINED_UID.to_string();
                parent_undefined.deleted = true;
                store.put(iid, parent_undefined);

                let uid1 = format!("{}a", record.uid);
                let uid2 = format!("{}b", record.uid);

                let mut r1 = ReadRecord::new(uid1.clone(), 0, m1.sequence, m1.quality);
                r1.library_iid = record.library_iid;
                r1.orientation = Orientation::Innie;
                if let Some(a) = m1.annotate {
                    apply_annotation(&mut r1, &a);
                }

                let mut r2 = ReadRecord::new(uid2.clone(), 0, m2.sequence, m2.quality);
                r2.library_iid = record.library_iid;
                r2.orientation = Orientation::Innie;
                if let Some(a) = m2.annotate {
                    apply_annotation(&mut r2, &a);
                }

                let iid1 = store.append(r1).expect("fresh suffixed UID");
                let iid2 = store.append(r2).expect("fresh suffixed UID");
                debug_assert_eq!(iid2, iid1 + 1, "mate IIDs must be consecutive");

                let mut m1_stored = store.get(iid1, Projection::all()).unwrap();
                m1_stored.mate_iid = iid2;
                store.put(iid1, m1_stored);
                let mut m2_stored = store.get(iid2, Projection::all()).unwrap();
                m2_stored.mate_iid = iid1;
                store.put(iid2, m2_stored);

                if ambiguous {
                    log::warn!("{}", SffError::LinkerAmbiguous { uid1, uid2 });
                    store.delete(iid1);
                    store.delete(iid2);
                }
            }

            Resolved::SplitDenied => {
                // A top-level live read is always called with allow_split=true,
                // so this branch cannot be reached here.
                unreachable!("top-level resolve always allows split")
            }
        }
    }
}

/// Stable IID reserved for newly-appended mates/survivors, exposed for tests
/// that want to assert on allocation order without poking at internals.
pub fn last_assigned_iid(store: &ReadStore) -> Iid {
    store.next_iid() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LINKER_FLX;
    use crate::store::ReadRecord;

    fn rec(uid: &str, seq: &[u8]) -> ReadRecord {
        let qual = vec![b'5'; seq.len()];
        ReadRecord::new(uid.to_string(), 0, seq.to_vec(), qual)
    }

    #[test]
    fn exact_linker_hit_is_good_and_best() {
        let hit = local_align(LINKER_FLX.as_bytes(), LINKER_FLX.as_bytes());
        assert!(is_good(&hit));
        assert!(is_best(&hit));
        assert_eq!(hit.align_len, LINKER_FLX.len());
        assert_eq!(hit.matches, LINKER_FLX.len());
    }

    #[test]
    fn weak_hit_is_good_not_best() {
        // 41 aligned columns, 41 matches: a=41,m=41 -> good (a>=40,m+4>=a), not best (a<42).
        let hit = AlignHit {
            beg_i: 0,
            end_i: 41,
            beg_j: 0,
            end_j: 41,
            align_len: 41,
            matches: 41,
        };
        assert!(is_good(&hit));
        assert!(!is_best(&hit));
    }

    #[test]
    fn strong_hit_is_best() {
        let hit = AlignHit {
            beg_i: 0,
            end_i: 42,
            beg_j: 0,
            end_j: 42,
            align_len: 42,
            matches: 40,
        };
        assert!(is_best(&hit));
    }

    #[test]
    fn splits_read_into_two_mates_with_consecutive_iids() {
        let mut store = ReadStore::new();
        let left = vec![b'C'; 80];
        let right = vec![b'G'; 76];
        let mut seq = left.clone();
        seq.extend_from_slice(LINKER_FLX.as_bytes());
        seq.extend_from_slice(&right);
        let parent = store.append(rec("P", &seq)).unwrap();

        run(&mut store, LINKER_FLX);

        assert!(store.is_deleted(parent));
        let m1_iid = parent + 1;
        let m2_iid = parent + 2;
        let m1 = store.get(m1_iid, Projection::all()).unwrap();
        let m2 = store.get(m2_iid, Projection::all()).unwrap();
        assert_eq!(m1.uid, "Pa");
        assert_eq!(m2.uid, "Pb");
        assert_eq!(m1.mate_iid, m2_iid);
        assert_eq!(m2.mate_iid, m1_iid);
        assert_eq!(m1.orientation, Orientation::Innie);
        // m1 is the reverse complement of the 80 C's, i.e. 80 G's.
        assert_eq!(m1.sequence, vec![b'G'; 80]);
        assert_eq!(m2.sequence, vec![b'G'; 76]);
    }

    #[test]
    fn trims_when_right_side_too_short_to_split() {
        let mut store = ReadStore::new();
        let left = vec![b'C'; 80];
        let right = vec![b'G'; 30]; // rSize = 30 < 64, so only a trim happens.
        let mut seq = left.clone();
        seq.extend_from_slice(LINKER_FLX.as_bytes());
        seq.extend_from_slice(&right);
        let parent = store.append(rec("P", &seq)).unwrap();

        run(&mut store, LINKER_FLX);

        assert!(store.is_deleted(parent));
        let survivor_iid = parent + 1;
        let survivor = store.get(survivor_iid, Projection::all()).unwrap();
        assert_eq!(survivor.uid, "P");
        assert_eq!(survivor.sequence, left);
        assert_eq!(survivor.mate_iid, 0);
    }

    #[test]
    fn unchanged_when_no_linker_present() {
        let mut store = ReadStore::new();
        let seq = vec![b'A'; 100];
        let iid = store.append(rec("P", &seq)).unwrap();
        run(&mut store, LINKER_FLX);
        assert!(!store.is_deleted(iid));
        let rec2 = store.get(iid, Projection::all()).unwrap();
        assert_eq!(rec2.sequence, seq);
        assert!(!rec2.linker_detected_but_not_trimmed);
    }
}
