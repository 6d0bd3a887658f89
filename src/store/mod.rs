//! In-memory read store.
//!
//! Assigns stable [`Iid`]s, maintains the UID↔IID bidirectional mapping,
//! persists sequence/quality in the compact encoding from [`codec`], and
//! supports delete/update while preserving identifier stability: an IID is
//! never renumbered or reused, and a deleted record keeps its sequence and
//! identifiers for later comparison. Modeled on an explicit struct owning
//! its own monotonic-id counter and backing storage, generalized from an
//! on-disk append-only log to an in-memory vector of records plus a compact
//! side-table for sequence/quality.

pub mod codec;

use crate::error::{Result, SffError};
use std::collections::HashMap;

/// Internal ID: a positive, monotonically increasing integer. `0` means "no
/// such read."
pub type Iid = u32;

/// External ID: an opaque token derived from the SFF read name.
pub type Uid = String;

/// Clear-range kinds a read can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearRangeKind {
    Latest,
    Qlt,
    Vec,
}

const CLEAR_RANGE_KINDS: [ClearRangeKind; 3] =
    [ClearRangeKind::Latest, ClearRangeKind::Qlt, ClearRangeKind::Vec];

/// Read-pair orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Unknown,
    Innie,
}

/// A half-open clear range `[beg, end)`, or the empty encoding `(1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearRange {
    pub beg: u32,
    pub end: u32,
}

impl ClearRange {
    pub const EMPTY: ClearRange = ClearRange { beg: 1, end: 0 };

    pub fn new(beg: u32, end: u32) -> Self {
        Self { beg, end }
    }

    pub fn is_empty(&self) -> bool {
        self.beg > self.end
    }
}

impl Default for ClearRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// The canonical in-store read entity.
#[derive(Debug, Clone)]
pub struct ReadRecord {
    pub uid: Uid,
    pub iid: Iid,
    pub library_iid: Iid,
    pub orientation: Orientation,
    pub deleted: bool,
    pub linker_detected_but_not_trimmed: bool,
    pub mate_iid: Iid,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
    pub clear_ranges: HashMap<ClearRangeKind, ClearRange>,
    /// Free-text source annotation (e.g. `linktrim:0x...`), mirrored into
    /// the FRG `src` field by the emitter.
    pub source: Option<String>,
}

impl ReadRecord {
    pub fn new(uid: Uid, iid: Iid, sequence: Vec<u8>, quality: Vec<u8>) -> Self {
        let mut clear_ranges = HashMap::new();
        let end = sequence.len() as u32;
        for kind in CLEAR_RANGE_KINDS {
            clear_ranges.insert(kind, ClearRange::new(0, end));
        }
        Self {
            uid,
            iid,
            library_iid: 1,
            orientation: Orientation::Unknown,
            deleted: false,
            linker_detected_but_not_trimmed: false,
            mate_iid: 0,
            sequence,
            quality,
            clear_ranges,
            source: None,
        }
    }

    pub fn clear_range(&self, kind: ClearRangeKind) -> ClearRange {
        self.clear_ranges
            .get(&kind)
            .copied()
            .unwrap_or(ClearRange::EMPTY)
    }

    pub fn set_clear_range(&mut self, kind: ClearRangeKind, range: ClearRange) {
        self.clear_ranges.insert(kind, range);
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Bitset selecting which parts of a record [`ReadStore::get`] decodes.
/// Everything is eagerly available in this in-memory implementation, so the
/// projection mainly documents intent the way the on-disk teacher's
/// per-column stores would require it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projection {
    pub info: bool,
    pub sequence: bool,
    pub quality: bool,
    pub source: bool,
}

impl Projection {
    pub fn all() -> Self {
        Self {
            info: true,
            sequence: true,
            quality: true,
            source: true,
        }
    }
}

/// Backing slot for one record: the record itself plus its packed
/// sequence+quality encoding, kept in sync on every mutation.
struct Slot {
    record: ReadRecord,
    packed: Vec<u8>,
}

/// The in-memory read store.
pub struct ReadStore {
    slots: Vec<Slot>,
    uid_to_iid: HashMap<Uid, Iid>,
}

impl ReadStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            uid_to_iid: HashMap::new(),
        }
    }

    /// First IID that would ever be assigned.
    pub fn first_iid() -> Iid {
        1
    }

    /// One past the last assigned IID (i.e. the next IID `append` would
    /// return), regardless of deletions.
    pub fn next_iid(&self) -> Iid {
        self.slots.len() as Iid + 1
    }

    /// Insert `record` (whose `.iid` is ignored and overwritten), returning
    /// the freshly assigned IID. Fails with `DuplicateUid` if the UID is
    /// already registered; amortized O(1).
    pub fn append(&mut self, mut record: ReadRecord) -> Result<Iid> {
        if self.uid_to_iid.contains_key(&record.uid) {
            return Err(SffError::DuplicateUid { uid: record.uid });
        }
        let iid = self.next_iid();
        record.iid = iid;
        let packed = codec::encode(&record.sequence, &record.quality);
        self.uid_to_iid.insert(record.uid.clone(), iid);
        self.slots.push(Slot { record, packed });
        Ok(iid)
    }

    /// O(1) UID → IID lookup.
    pub fn lookup_iid(&self, uid: &str) -> Option<Iid> {
        self.uid_to_iid.get(uid).copied()
    }

    fn index_of(iid: Iid) -> usize {
        (iid - 1) as usize
    }

    /// Decode and return a clone of the record at `iid`, re-deriving
    /// sequence/quality from the packed encoding per `projection`.
    pub fn get(&self, iid: Iid, projection: Projection) -> Option<ReadRecord> {
        let slot = self.slots.get(Self::index_of(iid))?;
        let mut record = slot.record.clone();
        if projection.sequence || projection.quality {
            let (seq, qual) = codec::decode(&slot.packed, slot.record.sequence.len());
            if projection.sequence {
                record.sequence = seq;
            }
            if projection.quality {
                record.quality = qual;
            }
        }
        Some(record)
    }

    /// In-place update. Preserves the IID; the UID may change, in which case
    /// `uid_to_iid` is updated to match (the old UID's mapping is dropped,
    /// the new one points at `iid`).
    pub fn put(&mut self, iid: Iid, record: ReadRecord) {
        let idx = Self::index_of(iid);
        let packed = codec::encode(&record.sequence, &record.quality);
        if let Some(slot) = self.slots.get_mut(idx) {
            if slot.record.uid != record.uid {
                self.uid_to_iid.remove(&slot.record.uid);
                self.uid_to_iid.insert(record.uid.clone(), iid);
            }
            slot.packed = packed;
            slot.record = record;
        }
    }

    /// Mark `iid` deleted; the identifier remains registered and the
    /// sequence is retained.
    pub fn delete(&mut self, iid: Iid) {
        if let Some(slot) = self.slots.get_mut(Self::index_of(iid)) {
            slot.record.deleted = true;
        }
    }

    pub fn is_deleted(&self, iid: Iid) -> bool {
        self.slots
            .get(Self::index_of(iid))
            .map(|s| s.record.deleted)
            .unwrap_or(true)
    }

    /// Number of slots ever allocated (live + deleted).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Emit records in IID order.
    pub fn stream(&self, projection: Projection) -> impl Iterator<Item = ReadRecord> + '_ {
        (Self::first_iid()..self.next_iid()).filter_map(move |iid| self.get(iid, projection))
    }

    /// Emit only live (non-deleted) records, in IID order.
    pub fn stream_live(&self, projection: Projection) -> impl Iterator<Item = ReadRecord> + '_ {
        self.stream(projection).filter(|r| !r.deleted)
    }
}

impl Default for ReadStore {
    fn default() -> Self {
        Self::new()
    }
}
