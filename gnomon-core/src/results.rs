use bio::bio_types::strand::Strand;

use crate::hmm::{BAD_SCORE, ScoreParts, StateKind};
use crate::types::{GeneModel, Interval};

/// Gene prediction results for one window.
///
/// # Fields
///
/// - `genes`: predicted gene models in coordinate order
/// - `states`: the chosen path with its score decomposition
/// - `score`: best path score, [`BAD_SCORE`] when no legal parse exists
///
/// # Examples
///
/// ```rust
/// use gnomon_core::GeneFinder;
/// use gnomon_core::model::{ModelRegistry, ModelSet};
///
/// let finder = GeneFinder::new(ModelRegistry::single(ModelSet::uniform()));
/// let prediction = finder.predict("seq1", &[b'C'; 500], &[], None)?;
///
/// println!("{}: {} genes, score {:.2}", prediction.seq_id, prediction.genes.len(), prediction.score);
/// assert!(prediction.has_path());
/// # Ok::<(), gnomon_core::types::GnomonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Sequence identifier from the FASTA header.
    pub seq_id: String,

    /// Predicted window, contig coordinates.
    pub window: Interval,

    /// GC content of the window as a fraction (0.0 to 1.0).
    pub gc_content: f64,

    /// Score of the best path.
    pub score: f64,

    /// Log-sum-exp of the best paths ending in intergenic states on either
    /// strand.
    pub combined_score: f64,

    pub genes: Vec<GeneModel>,

    pub states: Vec<StateRecord>,
}

impl Prediction {
    #[must_use]
    pub fn has_path(&self) -> bool {
        self.score > BAD_SCORE
    }
}

/// One state of the chosen path, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub kind: StateKind,
    pub strand: Strand,
    pub phase: u8,
    /// Segment covered by the state, contig coordinates
    pub range: Interval,
    /// Cumulative path score up to and including this state
    pub score: f64,
    pub parts: ScoreParts,
    pub open_left: bool,
    pub open_right: bool,
}
