//! Converts a decoded SFF read into a store record.

use crate::constants::{AS_READ_MAX_LEN, AS_READ_MIN_LEN};
use crate::error::SffError;
use crate::sff::SffRead;
use crate::store::{ClearRange, ClearRangeKind, ReadRecord, ReadStore};

/// Outcome of attempting to ingest one SFF read.
pub enum IngestOutcome {
    /// The read was appended to the store under this IID.
    Appended(crate::store::Iid),
    /// The read's UID was already registered; it was dropped.
    DuplicateUid,
    /// The read's effective length was below `AS_READ_MIN_LEN`; dropped.
    TooShort,
}

/// Convert one decoded [`SffRead`] into a store record and append it.
///
/// Step order: UID load + collision check, key trim, clear-range init,
/// length gate (reject-too-short / truncate-too-long), Phred→ASCII quality
/// conversion, append.
pub fn ingest_read(store: &mut ReadStore, read: &SffRead, key_length: u16) -> IngestOutcome {
    let uid = read.name.clone();

    if store.lookup_iid(&uid).is_some() {
        log::warn!("Duplicate UID '{uid}', dropping read");
        return IngestOutcome::DuplicateUid;
    }

    let key_length = key_length as usize;
    let total_bases = read.number_of_bases as usize;
    let effective_len = total_bases.saturating_sub(key_length);

    if effective_len < AS_READ_MIN_LEN {
        log::warn!(
            "{}",
            SffError::ReadTooShort {
                uid,
                len: effective_len,
                min: AS_READ_MIN_LEN,
            }
        );
        return IngestOutcome::TooShort;
    }

    let mut sequence: Vec<u8> = read.bases[key_length.min(read.bases.len())..]
        .iter()
        .map(|b| b.to_ascii_uppercase())
        .collect();
    let mut quality: Vec<u8> = read.quality_scores[key_length.min(read.quality_scores.len())..]
        .iter()
        .map(|&phred| phred.wrapping_add(b'0'))
        .collect();

    let mut effective_len = effective_len;
    if effective_len > AS_READ_MAX_LEN {
        log::warn!(
            "{}",
            SffError::ReadTooLong {
                uid: uid.clone(),
                len: effective_len,
                max: AS_READ_MAX_LEN,
            }
        );
        sequence.truncate(AS_READ_MAX_LEN);
        quality.truncate(AS_READ_MAX_LEN);
        effective_len = AS_READ_MAX_LEN;
    }

    let mut record = ReadRecord::new(uid, 0, sequence, quality);
    let end = effective_len as u32;
    for kind in [ClearRangeKind::Latest, ClearRangeKind::Qlt, ClearRangeKind::Vec] {
        record.set_clear_range(kind, ClearRange::new(0, end));
    }

    let iid = store
        .append(record)
        .expect("UID collision already checked above");
    IngestOutcome::Appended(iid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sff_read(name: &str, key: &str, effective: usize) -> SffRead {
        let bases: Vec<u8> = key
            .bytes()
            .chain(std::iter::repeat(b'A').take(effective))
            .collect();
        let quality = vec![20u8; bases.len()];
        SffRead {
            name: name.to_string(),
            number_of_bases: bases.len() as u32,
            clip_quality_left: 0,
            clip_quality_right: 0,
            clip_adapter_left: 0,
            clip_adapter_right: 0,
            bases,
            quality_scores: quality,
        }
    }

    #[test]
    fn accepts_boundary_min_length() {
        let mut store = ReadStore::new();
        let read = make_sff_read("r1", "TCAG", AS_READ_MIN_LEN);
        match ingest_read(&mut store, &read, 4) {
            IngestOutcome::Appended(iid) => {
                let rec = store.get(iid, crate::store::Projection::all()).unwrap();
                assert_eq!(rec.sequence.len(), AS_READ_MIN_LEN);
            }
            _ => panic!("expected acceptance"),
        }
    }

    #[test]
    fn rejects_one_below_min_length() {
        let mut store = ReadStore::new();
        let read = make_sff_read("r1", "TCAG", AS_READ_MIN_LEN - 1);
        assert!(matches!(
            ingest_read(&mut store, &read, 4),
            IngestOutcome::TooShort
        ));
    }

    #[test]
    fn truncates_one_above_max_length() {
        let mut store = ReadStore::new();
        let read = make_sff_read("r1", "TCAG", AS_READ_MAX_LEN + 1);
        match ingest_read(&mut store, &read, 4) {
            IngestOutcome::Appended(iid) => {
                let rec = store.get(iid, crate::store::Projection::all()).unwrap();
                assert_eq!(rec.sequence.len(), AS_READ_MAX_LEN);
                assert_eq!(rec.clear_range(ClearRangeKind::Latest).end as usize, AS_READ_MAX_LEN);
            }
            _ => panic!("expected acceptance with truncation"),
        }
    }

    #[test]
    fn duplicate_uid_is_dropped() {
        let mut store = ReadStore::new();
        let read = make_sff_read("r1", "TCAG", AS_READ_MIN_LEN);
        ingest_read(&mut store, &read, 4);
        assert!(matches!(
            ingest_read(&mut store, &read, 4),
            IngestOutcome::DuplicateUid
        ));
    }

    #[test]
    fn quality_converted_to_printable() {
        let mut store = ReadStore::new();
        let read = make_sff_read("r1", "TCAG", AS_READ_MIN_LEN);
        if let IngestOutcome::Appended(iid) = ingest_read(&mut store, &read, 4) {
            let rec = store.get(iid, crate::store::Projection::all()).unwrap();
            assert_eq!(rec.quality[0], 20 + b'0');
        } else {
            panic!("expected acceptance");
        }
    }
}
