//! Library metadata, exactly one per run.

use crate::store::Orientation;

/// The nine fixed assembler policy bits every library carries, regardless of
/// CLI input: this tool always assembles with the best overlap-based
/// unitigger, always discards N-bearing reads and perfect prefix duplicates
/// upstream of the assembler, and never asks the assembler to re-trim
/// quality or homopolymer runs it already trimmed itself.
#[derive(Debug, Clone, Copy)]
pub struct PolicyBits {
    pub force_bog_unitigger: bool,
    pub discard_reads_with_ns: bool,
    pub do_not_qv_trim: bool,
    pub good_bad_qv_threshold: bool,
    pub delete_perfect_prefixes: bool,
    pub do_not_trust_homopolymer_runs: bool,
    pub hps_is_flow_gram: bool,
    pub is_not_random: bool,
    pub do_not_overlap_trim: bool,
}

impl PolicyBits {
    pub const FIXED: PolicyBits = PolicyBits {
        force_bog_unitigger: true,
        discard_reads_with_ns: true,
        do_not_qv_trim: true,
        good_bad_qv_threshold: true,
        delete_perfect_prefixes: true,
        do_not_trust_homopolymer_runs: true,
        hps_is_flow_gram: true,
        is_not_random: false,
        do_not_overlap_trim: false,
    };
}

/// Single-library metadata with orientation and insert-size parameters.
#[derive(Debug, Clone)]
pub struct LibraryRecord {
    pub uid: String,
    pub mean: f64,
    pub stddev: f64,
    pub orientation: Orientation,
    pub linker: Option<String>,
    pub policy: PolicyBits,
}

impl LibraryRecord {
    /// Build the library record from CLI-resolved configuration: orientation
    /// and insert size are INNIE/(mean,stddev) when a linker is given, else
    /// UNKNOWN/(0,0). Policy bits are fixed regardless of input.
    pub fn new(uid: String, insert_size: Option<(f64, f64)>, linker: Option<String>) -> Self {
        let (mean, stddev, orientation) = match (linker.is_some(), insert_size) {
            (true, Some((mean, stddev))) => (mean, stddev, Orientation::Innie),
            _ => (0.0, 0.0, Orientation::Unknown),
        };
        Self {
            uid,
            mean,
            stddev,
            orientation,
            linker,
            policy: PolicyBits::FIXED,
        }
    }
}
