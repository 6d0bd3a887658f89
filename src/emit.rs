//! Renders the final fragment-message stream: one VER record, one LIB
//! record, then one FRG per live read (plus one LKG per mate pair), emitted
//! in a single forward IID-order pass.

use crate::library::LibraryRecord;
use crate::store::{ClearRangeKind, Orientation, Projection, ReadStore};
use std::collections::HashMap;
use std::io::{self, Write};

fn write_clear(w: &mut impl Write, tag: &str, beg: u32, end: u32) -> io::Result<()> {
    writeln!(w, "{tag}:{beg},{end}")
}

fn write_bit(w: &mut impl Write, tag: &str, set: bool) -> io::Result<()> {
    writeln!(w, "{tag}:{}", if set { 1 } else { 0 })
}

fn write_block(w: &mut impl Write, lines: &[u8]) -> io::Result<()> {
    w.write_all(lines)?;
    writeln!(w, ".")
}

/// Emit the whole message stream for `store`'s live reads to `out`.
pub fn run(store: &ReadStore, library: &LibraryRecord, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{{VER")?;
    writeln!(out, "ver:2")?;
    writeln!(out, "}}")?;

    writeln!(out, "{{LIB")?;
    writeln!(out, "act:A")?;
    writeln!(out, "acc:{}", library.uid)?;
    writeln!(
        out,
        "ori:{}",
        match library.orientation {
            Orientation::Innie => "I",
            Orientation::Unknown => "U",
        }
    )?;
    writeln!(out, "mea:{:.3}", library.mean)?;
    writeln!(out, "std:{:.3}", library.stddev)?;
    write_block(out, b"src:\n")?;
    writeln!(out, "nft:0")?;
    write_block(out, b"fea:\n")?;
    write_bit(out, "forceBOGunitigger", library.policy.force_bog_unitigger)?;
    write_bit(out, "discardReadsWithNs", library.policy.discard_reads_with_ns)?;
    write_bit(out, "doNotQVTrim", library.policy.do_not_qv_trim)?;
    write_bit(out, "goodBadQVThreshold", library.policy.good_bad_qv_threshold)?;
    write_bit(out, "deletePerfectPrefixes", library.policy.delete_perfect_prefixes)?;
    write_bit(
        out,
        "doNotTrustHomopolymerRuns",
        library.policy.do_not_trust_homopolymer_runs,
    )?;
    write_bit(out, "hpsIsFlowGram", library.policy.hps_is_flow_gram)?;
    write_bit(out, "isNotRandom", library.policy.is_not_random)?;
    write_bit(out, "doNotOverlapTrim", library.policy.do_not_overlap_trim)?;
    writeln!(out, "}}")?;

    let mut uid_of: HashMap<u32, String> = HashMap::new();

    for record in store.stream_live(Projection::all()) {
        uid_of.insert(record.iid, record.uid.clone());

        let (clq, clv, src) = if record.linker_detected_but_not_trimmed {
            let qlt = record.clear_range(ClearRangeKind::Qlt);
            let vec = record.clear_range(ClearRangeKind::Vec);
            let packed = ((qlt.beg as u64) << 48)
                | ((qlt.end as u64) << 32)
                | ((vec.beg as u64) << 16)
                | vec.end as u64;
            (
                crate::store::ClearRange::EMPTY,
                crate::store::ClearRange::EMPTY,
                Some(format!("linktrim:0x{packed:016x}")),
            )
        } else {
            (
                record.clear_range(ClearRangeKind::Qlt),
                record.clear_range(ClearRangeKind::Vec),
                record.source.clone(),
            )
        };
        let clr = record.clear_range(ClearRangeKind::Latest);

        writeln!(out, "{{FRG")?;
        writeln!(out, "act:A")?;
        writeln!(out, "acc:{}", record.uid)?;
        writeln!(out, "rnd:1")?;
        writeln!(out, "sta:G")?;
        writeln!(out, "lib:{}", library.uid)?;
        writeln!(out, "pla:0")?;
        write_block(out, b"loc:\n")?;
        write_block(out, b"sfx:\n")?;
        write_clear(out, "clr", clr.beg, clr.end)?;
        write_clear(out, "clq", clq.beg, clq.end)?;
        write_clear(out, "clv", clv.beg, clv.end)?;
        writeln!(out, "seq:")?;
        out.write_all(&record.sequence)?;
        writeln!(out)?;
        writeln!(out, ".")?;
        writeln!(out, "qlt:")?;
        out.write_all(&record.quality)?;
        writeln!(out)?;
        writeln!(out, ".")?;
        write_block(out, b"hps:\n")?;
        match &src {
            Some(s) => write_block(out, format!("src:\n{s}\n").as_bytes())?,
            None => write_block(out, b"src:\n")?,
        }
        writeln!(out, "}}")?;

        if record.mate_iid > 0 && record.mate_iid < record.iid {
            if let Some(mate_uid) = uid_of.get(&record.mate_iid) {
                writeln!(out, "{{LKG")?;
                writeln!(out, "act:A")?;
                writeln!(out, "frg1:{mate_uid}")?;
                writeln!(out, "frg2:{}", record.uid)?;
                writeln!(
                    out,
                    "ori:{}",
                    match record.orientation {
                        Orientation::Innie => "I",
                        Orientation::Unknown => "U",
                    }
                )?;
                writeln!(out, "dst:{}", library.uid)?;
                writeln!(out, "}}")?;
            }
        }
    }

    out.flush()
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
    fn emits_ver_lib_frg_blocks() {
        let mut store = ReadStore::new();
        store.append(rec("r1", b"ACGTACGTACGT")).unwrap();
        let lib = LibraryRecord::new("libA".to_string(), None, None);

        let mut buf = Vec::new();
        run(&store, &lib, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("{VER\n"));
        assert!(text.contains("{LIB\n"));
        assert!(text.contains("acc:libA"));
        assert!(text.contains("{FRG\n"));
        assert!(text.contains("acc:r1"));
        assert!(text.contains("ACGTACGTACGT"));
        assert!(text.contains("forceBOGunitigger:1"));
        assert!(text.contains("discardReadsWithNs:1"));
        assert!(text.contains("doNotQVTrim:1"));
        assert!(text.contains("goodBadQVThreshold:1"));
        assert!(text.contains("deletePerfectPrefixes:1"));
        assert!(text.contains("doNotTrustHomopolymerRuns:1"));
        assert!(text.contains("hpsIsFlowGram:1"));
        assert!(text.contains("isNotRandom:0"));
        assert!(text.contains("doNotOverlapTrim:0"));
    }

    #[test]
    fn mate_pair_emits_single_lkg_after_second_mate() {
        let mut store = ReadStore::new();
        let iid1 = store.append(rec("m1", b"ACGTACGTACGT")).unwrap();
        let iid2 = store.append(rec("m2", b"TTTTGGGGCCCC")).unwrap();
        {
            let mut r1 = store.get(iid1, Projection::all()).unwrap();
            r1.mate_iid = iid2;
            r1.orientation = Orientation::Innie;
            store.put(iid1, r1);
            let mut r2 = store.get(iid2, Projection::all()).unwrap();
            r2.mate_iid = iid1;
            r2.orientation = Orientation::Innie;
            store.put(iid2, r2);
        }
        let lib = LibraryRecord::new("libA".to_string(), Some((2000.0, 200.0)), Some("x".to_string()));

        let mut buf = Vec::new();
        run(&store, &lib, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.matches("{LKG").count(), 1);
        assert!(text.contains("frg1:m1"));
        assert!(text.contains("frg2:m2"));
        assert!(text.contains("ori:I"));
        assert!(text.contains("dst:libA"));
    }

    #[test]
    fn annotated_read_emits_empty_clear_ranges_and_linktrim_source() {
        let mut store = ReadStore::new();
        let iid = store.append(rec("r1", b"ACGTACGTACGT")).unwrap();
        {
            let mut r = store.get(iid, Projection::all()).unwrap();
            r.linker_detected_but_not_trimmed = true;
            r.set_clear_range(ClearRangeKind::Qlt, crate::store::ClearRange::new(1, 2));
            r.set_clear_range(ClearRangeKind::Vec, crate::store::ClearRange::new(3, 4));
            store.put(iid, r);
        }
        let lib = LibraryRecord::new("libA".to_string(), None, None);

        let mut buf = Vec::new();
        run(&store, &lib, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("clq:1,0"));
        assert!(text.contains("clv:1,0"));
        assert!(text.contains("src:\nlinktrim:0x"));
    }
}
