//! Marks any live read containing an ambiguous base `N` as deleted.

use crate::error::SffError;
use crate::store::{Projection, ReadStore};

/// Single linear pass over every live read.
pub fn run(store: &mut ReadStore) {
    let to_delete: Vec<_> = store
        .stream_live(Projection {
            sequence: true,
            ..Default::default()
        })
        .filter(|r| r.sequence.iter().any(|&b| b == b'N' || b == b'n'))
        .map(|r| (r.iid, r.uid))
        .collect();

    for (iid, uid) in to_delete {
        log::info!("{}", SffError::ReadContainsN { uid });
        store.delete(iid);
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
    fn deletes_reads_with_n() {
        let mut store = ReadStore::new();
        let clean = store.append(rec("clean", b"ACGTACGT")).unwrap();
        let dirty = store.append(rec("dirty", b"ACGTNACGT")).unwrap();
        run(&mut store);
        assert!(!store.is_deleted(clean));
        assert!(store.is_deleted(dirty));
    }

    #[test]
    fn lowercase_n_also_triggers() {
        let mut store = ReadStore::new();
        let iid = store.append(rec("r", b"acgtnacgt")).unwrap();
        run(&mut store);
        assert!(store.is_deleted(iid));
    }

    #[test]
    fn skips_already_deleted_reads() {
        let mut store = ReadStore::new();
        let iid = store.append(rec("r", b"ACGT")).unwrap();
        store.delete(iid);
        run(&mut store); // must not panic or double-process
        assert!(store.is_deleted(iid));
    }
}
