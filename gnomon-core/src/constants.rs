// =============================================================================
// =============================================================================

/// Number of reading-frame residues
pub const READING_FRAMES: usize = 3;

/// Number of strands scored by the engine
pub const STRANDS_COUNT: usize = 2;

/// Number of evidence classes tracked per exon/intron bucket
/// (no protein seen on the current gene / protein seen)
pub const EVIDENCE_CLASSES: usize = 2;

/// Alphabet size of the Markov models (A, C, G, T)
pub const ALPHABET_SIZE: usize = 4;

/// Minimum run of N residues that is forced closed for coding
pub const MIN_N_RUN_LENGTH: usize = 10;

// =============================================================================
// =============================================================================

/// Default distance beyond which predecessor scans may stop early
pub const DEFAULT_TOO_FAR_LEN: i32 = 500;

/// Default penalty for every protein island after the first on one gene
pub const DEFAULT_MULTI_PROTEIN_PENALTY: f64 = 20.0;

/// Default penalty for GC donor sites
pub const DEFAULT_NON_CONSENSUS_PENALTY: f64 = 5.0;

/// Artificial bonus used to anchor the parse at a window edge
pub const ANCHOR_BONUS: f64 = 1.0e6;

// =============================================================================
// =============================================================================

/// Donor consensus (biological orientation, first two intron bases)
pub const DONOR_CONSENSUS: [u8; 2] = [b'G', b'T'];

/// Minor donor consensus accepted with a penalty
pub const GC_DONOR_CONSENSUS: [u8; 2] = [b'G', b'C'];

/// Acceptor consensus (biological orientation, last two intron bases)
pub const ACCEPTOR_CONSENSUS: [u8; 2] = [b'A', b'G'];
