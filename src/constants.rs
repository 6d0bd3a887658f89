//! Fixed numeric constants shared across the pipeline.

/// Magic number for `.sff` files, big-endian encoding of the ASCII `.sff`.
pub const SFF_MAGIC: u32 = 0x2e73_6666;

/// Minimum effective (post-key) read length accepted into the store.
pub const AS_READ_MIN_LEN: usize = 64;

/// Maximum effective read length; longer reads are truncated.
pub const AS_READ_MAX_LEN: usize = 2048;

/// Number of leading bases the prefix-dedup fingerprint is computed over.
pub const FINGERPRINT_BASES: usize = 48;

/// `linker flx`: a palindromic 44bp linker.
pub const LINKER_FLX: &str = "GTTGGAACCGAAAGGGTTTGAATTCAAACCCTTTCGGTTCCAAC";

/// `linker fix`/`titanium`: a 42bp linker.
pub const LINKER_FIX: &str = "TCGTATAACTTCGTATAATGTATGCTATACGAAGTTATTACG";
