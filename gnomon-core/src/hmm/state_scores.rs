//! Length, region and terminal scores of a state.

use bio::bio_types::strand::Strand;

use super::{StateKey, StateKind, frame_residue};
use crate::constants::READING_FRAMES;
use crate::model::{LengthDistribution, LengthModels};
use crate::scoring::SeqScores;
use crate::types::Pos;

/// Which length score applies to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMode {
    /// Both ends are inside the window
    Exact,
    /// One end runs off the window edge
    Closing,
    /// Both ends run off the window edges
    Through,
}

impl LengthMode {
    #[must_use]
    pub const fn new(open_left: bool, open_right: bool) -> Self {
        match (open_left, open_right) {
            (true, true) => Self::Through,
            (false, false) => Self::Exact,
            _ => Self::Closing,
        }
    }
}

#[must_use]
pub fn length_distribution(lengths: &LengthModels, kind: StateKind) -> &LengthDistribution {
    match kind {
        StateKind::Intergenic => &lengths.intergenic,
        StateKind::Intron => &lengths.intron,
        StateKind::SingleExon => &lengths.single_exon,
        StateKind::FirstExon => &lengths.first_exon,
        StateKind::InternalExon => &lengths.internal_exon,
        StateKind::LastExon => &lengths.last_exon,
    }
}

#[must_use]
pub fn length_score(lengths: &LengthModels, kind: StateKind, len: Pos, mode: LengthMode) -> Option<f64> {
    let distribution = length_distribution(lengths, kind);
    match mode {
        LengthMode::Exact => distribution.score(len),
        LengthMode::Closing => distribution.closing_score(len),
        LengthMode::Through => distribution.through_score(len),
    }
}

/// No in-frame stop (or masked base) keeps frame `r` from coding `[a, s]`.
///
/// Exons carrying the gene's stop codon exclude it: on the plus strand it
/// ends at `s`, on the minus strand it starts at `a`.
#[must_use]
pub fn stops_open(scores: &SeqScores<'_>, kind: StateKind, strand: Strand, r: usize, a: Pos, s: Pos) -> bool {
    match (kind.has_stop_codon(), strand) {
        (true, Strand::Reverse) => scores.last_stop(strand, r, s) <= a,
        (true, _) => scores.last_stop(strand, r, s - 1) < a,
        (false, _) => scores.last_stop(strand, r, s) < a,
    }
}

/// `[a, s]` can not be a region of this kind for any phase, nor for any
/// smaller `a`
#[must_use]
pub fn region_closed(scores: &SeqScores<'_>, kind: StateKind, strand: Strand, a: Pos, s: Pos) -> bool {
    match kind {
        StateKind::Intergenic => !scores.intergenic_allowed(a, s),
        StateKind::Intron => !scores.intron_allowed(strand, a, s),
        _ => {
            !scores.exon_allowed(strand, a, s)
                || (0..READING_FRAMES).all(|r| !stops_open(scores, kind, strand, r, a, s))
        }
    }
}

/// Region score of `[a, s]`, `None` when the region is closed
#[must_use]
pub fn region_score(scores: &SeqScores<'_>, key: StateKey, a: Pos, s: Pos) -> Option<f64> {
    match key.kind {
        StateKind::Intergenic => scores.intergenic_allowed(a, s).then_some(0.0),
        StateKind::Intron => scores.intron_allowed(key.strand, a, s).then_some(0.0),
        kind => {
            let r = frame_residue(key.strand, s, key.phase);
            (scores.exon_allowed(key.strand, a, s) && stops_open(scores, kind, key.strand, r, a, s))
                .then(|| scores.coding_score(key.strand, r, a, s))
        }
    }
}

/// Signal score just past the right end
#[must_use]
pub fn term_score(scores: &SeqScores<'_>, key: StateKey, s: Pos) -> Option<f64> {
    scores.terminal(key.kind.right_signal(key.strand), key.strand, s)
}
