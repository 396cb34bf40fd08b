//! Semi-Markov state taxonomy.
//!
//! Every segment of a parse is one [`HmmState`]: intergenic, one of four exon
//! roles, or intron. A state is identified by its [`StateKey`] (kind, strand,
//! phase) and the coordinate of its last base; its first base is one past the
//! end of its left neighbour, or `0` at the window edge.
//!
//! Exon roles are named in biological order, so on the minus strand a gene
//! reads `LastExon Intron InternalExon ... FirstExon` from left to right:
//!
//! ```text
//! plus:  Intergenic+ FirstExon+ Intron+ InternalExon+ Intron+ LastExon+ Intergenic
//! minus: Intergenic- LastExon-  Intron- InternalExon- Intron- FirstExon- Intergenic
//!        Intergenic± SingleExon± Intergenic
//! ```
//!
//! The strand of an intergenic state is the strand of the gene that follows
//! it.
//!
//! Phase is the codon position (0, 1, 2 in biological order) of the exon's
//! rightmost base, and for introns the codon position of the first coding
//! base to the right of the intron.

pub mod state_scores;
pub mod transitions;

use bio::bio_types::strand::Strand;

use crate::scoring::Signal;
use crate::types::Pos;

/// Score of a path that does not exist
pub const BAD_SCORE: f64 = f64::NEG_INFINITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Intergenic,
    SingleExon,
    FirstExon,
    InternalExon,
    LastExon,
    Intron,
}

impl StateKind {
    pub const ALL: [StateKind; 6] = [
        Self::Intergenic,
        Self::SingleExon,
        Self::FirstExon,
        Self::InternalExon,
        Self::LastExon,
        Self::Intron,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intergenic => "Intergenic",
            Self::SingleExon => "SingleExon",
            Self::FirstExon => "FirstExon",
            Self::InternalExon => "InternalExon",
            Self::LastExon => "LastExon",
            Self::Intron => "Intron",
        }
    }

    #[must_use]
    pub const fn is_exon(self) -> bool {
        matches!(
            self,
            Self::SingleExon | Self::FirstExon | Self::InternalExon | Self::LastExon
        )
    }

    #[must_use]
    pub const fn has_start_codon(self) -> bool {
        matches!(self, Self::SingleExon | Self::FirstExon)
    }

    #[must_use]
    pub const fn has_stop_codon(self) -> bool {
        matches!(self, Self::SingleExon | Self::LastExon)
    }

    /// The exon is the leftmost exon of its gene
    #[must_use]
    pub const fn is_gene_left_end(self, strand: Strand) -> bool {
        match strand {
            Strand::Reverse => self.has_stop_codon(),
            _ => self.has_start_codon(),
        }
    }

    /// The exon is the rightmost exon of its gene
    #[must_use]
    pub const fn is_gene_right_end(self, strand: Strand) -> bool {
        match strand {
            Strand::Reverse => self.has_start_codon(),
            _ => self.has_stop_codon(),
        }
    }

    /// Signal found just past the right end of the state
    #[must_use]
    pub const fn right_signal(self, strand: Strand) -> Signal {
        let reverse = matches!(strand, Strand::Reverse);
        match self {
            Self::Intergenic if reverse => Signal::Stop,
            Self::Intergenic => Signal::Start,
            Self::Intron if reverse => Signal::Donor,
            Self::Intron => Signal::Acceptor,
            kind if kind.is_gene_right_end(strand) => {
                if reverse {
                    Signal::Start
                } else {
                    Signal::Stop
                }
            }
            _ if reverse => Signal::Acceptor,
            _ => Signal::Donor,
        }
    }
}

/// Type of a state: kind, strand and phase.
///
/// Intergenic states always carry phase 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateKey {
    pub kind: StateKind,
    pub strand: Strand,
    pub phase: u8,
}

impl StateKey {
    #[must_use]
    pub const fn intergenic(strand: Strand) -> Self {
        Self {
            kind: StateKind::Intergenic,
            strand,
            phase: 0,
        }
    }

    #[must_use]
    pub const fn intron(strand: Strand, phase: u8) -> Self {
        Self {
            kind: StateKind::Intron,
            strand,
            phase,
        }
    }

    #[must_use]
    pub const fn exon(kind: StateKind, strand: Strand, phase: u8) -> Self {
        Self { kind, strand, phase }
    }
}

/// Reading-frame residue of an exon ending at `stop` with `phase`.
///
/// On the plus strand the base at `i` then has codon position
/// `(i - r) mod 3`, on the minus strand `(r - i) mod 3`.
#[inline]
#[must_use]
pub const fn frame_residue(strand: Strand, stop: Pos, phase: u8) -> usize {
    let phase = phase as Pos;
    match strand {
        Strand::Reverse => (phase + stop).rem_euclid(3) as usize,
        _ => (stop - phase).rem_euclid(3) as usize,
    }
}

/// Score increment of a state over its left neighbour.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreParts {
    pub branch: f64,
    pub length: f64,
    pub region: f64,
    pub term: f64,
    /// Multi-protein penalty, subtracted
    pub penalty: f64,
    /// Artificial bonus of an anchored window edge
    pub anchor: f64,
}

impl ScoreParts {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.branch + self.length + self.region + self.term - self.penalty + self.anchor
    }
}

/// One segment of a parse.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmState {
    pub key: StateKey,
    /// Last base, edited window coordinates
    pub stop: Pos,
    /// 1 once a protein alignment start lies on the gene's path
    pub protein: u8,
    /// Arena index of the left neighbour; `None` at the window edge
    pub left: Option<usize>,
    pub score: f64,
    pub parts: ScoreParts,
    /// The segment continues past the right window edge
    pub open_right: bool,
}

impl HmmState {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StateKind {
        self.key.kind
    }

    #[inline]
    #[must_use]
    pub fn strand(&self) -> Strand {
        self.key.strand
    }

    /// The segment continues past the left window edge
    #[inline]
    #[must_use]
    pub fn open_left(&self) -> bool {
        self.left.is_none()
    }

    /// First base of the segment
    #[must_use]
    pub fn start(&self, arena: &[HmmState]) -> Pos {
        self.left.map_or(0, |left| arena[left].stop + 1)
    }

    #[must_use]
    pub fn is_gene_left_end(&self) -> bool {
        self.kind().is_gene_left_end(self.strand())
    }

    #[must_use]
    pub fn is_gene_right_end(&self) -> bool {
        self.kind().is_gene_right_end(self.strand())
    }
}
