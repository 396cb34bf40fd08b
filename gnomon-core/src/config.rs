use crate::constants::{
    DEFAULT_MULTI_PROTEIN_PENALTY, DEFAULT_NON_CONSENSUS_PENALTY, DEFAULT_TOO_FAR_LEN,
};
use crate::types::Pos;

/// Output format options for prediction results.
///
/// Neither format is an annotation exchange format; both are plain text
/// intended for inspection and tuning.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::config::OutputFormat;
///
/// assert_eq!(OutputFormat::from_name("states"), Some(OutputFormat::States));
/// assert_eq!(OutputFormat::from_name("gff"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per exon with gene id, strand, coordinates and frame information.
    Table,

    /// The diagnostic dump: every state on the best path with its score
    /// decomposition (branch, length, region, terminal, evidence penalty).
    States,
}

impl OutputFormat {
    /// Parse a format name as accepted on the command line
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "table" | "tbl" => Some(Self::Table),
            "states" | "dump" => Some(Self::States),
            _ => None,
        }
    }
}

/// Run-time tuning of the engine for one prediction window.
///
/// Statistical parameters live in [`crate::model::ModelSet`]; this struct only
/// carries the scalars and flags that a caller adjusts per window (walls,
/// anchors) or per run (penalties, pruning).
///
/// # Examples
///
/// ```rust
/// use gnomon_core::config::EngineConfig;
///
/// // A window cut out of the middle of a contig: genes may run off both edges.
/// let config = EngineConfig {
///     left_wall: false,
///     right_wall: false,
///     ..Default::default()
/// };
/// assert!(!config.left_wall);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Penalty charged for every protein alignment after the first one
    /// that a single gene picks up.
    ///
    /// **Default**: `20.0`
    pub multi_protein_penalty: f64,

    /// Penalty subtracted from the donor score of GC donor sites.
    ///
    /// **Default**: `5.0`
    pub non_consensus_penalty: f64,

    /// Accept GC donors as statistical splice candidates.
    ///
    /// **Default**: `true`
    pub allow_gc_donors: bool,

    /// Predecessors closer than this many bases are always evaluated; beyond
    /// it the scan stops once the best remaining predecessor cannot win.
    ///
    /// **Default**: `500`
    pub too_far_len: Pos,

    /// Treat lower-case (soft-masked) residues as repeats closed for coding
    /// unless evidence covers them.
    ///
    /// **Default**: `false`
    pub mask_repeats: bool,

    /// The left window edge is a definite intergenic boundary.
    ///
    /// **Default**: `true`
    pub left_wall: bool,

    /// The right window edge is a definite intergenic boundary.
    ///
    /// **Default**: `true`
    pub right_wall: bool,

    /// Force the parse to start with an intergenic state at the left edge.
    ///
    /// **Default**: `false`
    pub left_anchor: bool,

    /// Force the parse to end with an intergenic state at the right edge.
    ///
    /// **Default**: `false`
    pub right_anchor: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            multi_protein_penalty: DEFAULT_MULTI_PROTEIN_PENALTY,
            non_consensus_penalty: DEFAULT_NON_CONSENSUS_PENALTY,
            allow_gc_donors: true,
            too_far_len: DEFAULT_TOO_FAR_LEN,
            mask_repeats: false,
            left_wall: true,
            right_wall: true,
            left_anchor: false,
            right_anchor: false,
        }
    }
}
