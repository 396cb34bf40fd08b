use bio::bio_types::strand::Strand;

use crate::constants::{ACCEPTOR_CONSENSUS, DONOR_CONSENSUS, GC_DONOR_CONSENSUS};
use crate::model::{ModelSet, SignalModel};
use crate::scoring::tables::Cumulative;
use crate::sequence::{EncodedSequence, encode_base, is_start_codon, is_stop_codon};
use crate::types::Pos;

/// Boundary signals scored by weight matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Start,
    Stop,
    Donor,
    Acceptor,
}

impl Signal {
    pub const ALL: [Signal; 4] = [Self::Start, Self::Stop, Self::Donor, Self::Acceptor];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Start => 0,
            Self::Stop => 1,
            Self::Donor => 2,
            Self::Acceptor => 3,
        }
    }

    /// First consensus base (biological orientation) of a signal that
    /// terminates a state ending at `s`.
    ///
    /// Plus strand: an intergenic state ends just before `ATG`, an exon just
    /// before `GT`, an intron on the `G` of `AG`, and a gene-final exon on the
    /// last stop codon base. Minus strand mirrors this with the consensus
    /// read toward lower coordinates.
    #[must_use]
    pub const fn anchor(self, strand: Strand, s: Pos) -> Pos {
        match (strand, self) {
            (Strand::Reverse, Self::Stop) => s + 3,
            (Strand::Reverse, Self::Acceptor) => s + 2,
            (Strand::Reverse, Self::Donor | Self::Start) => s,
            (_, Self::Start | Self::Donor) => s + 1,
            (_, Self::Acceptor) => s - 1,
            (_, Self::Stop) => s - 2,
        }
    }

    #[must_use]
    pub fn model(self, models: &ModelSet) -> &SignalModel {
        match self {
            Self::Start => &models.start,
            Self::Stop => &models.stop,
            Self::Donor => &models.donor,
            Self::Acceptor => &models.acceptor,
        }
    }
}

/// Consensus found at a signal anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consensus {
    Canonical,
    /// GC donor
    Minor,
}

fn encoded<const K: usize>(bases: [u8; K]) -> [u8; K] {
    bases.map(encode_base)
}

/// Check the consensus bases of `signal` at `anchor`
#[must_use]
pub fn consensus(
    signal: Signal,
    seq: &EncodedSequence,
    strand: Strand,
    anchor: Pos,
) -> Option<Consensus> {
    match signal {
        Signal::Start => seq
            .bio_kmer::<3>(strand, anchor)
            .filter(|&codon| is_start_codon(codon))
            .map(|_| Consensus::Canonical),
        Signal::Stop => seq
            .bio_kmer::<3>(strand, anchor)
            .filter(|&codon| is_stop_codon(codon))
            .map(|_| Consensus::Canonical),
        Signal::Donor => match seq.bio_kmer::<2>(strand, anchor)? {
            pair if pair == encoded(DONOR_CONSENSUS) => Some(Consensus::Canonical),
            pair if pair == encoded(GC_DONOR_CONSENSUS) => Some(Consensus::Minor),
            _ => None,
        },
        Signal::Acceptor => seq
            .bio_kmer::<2>(strand, anchor)
            .filter(|&pair| pair == encoded(ACCEPTOR_CONSENSUS))
            .map(|_| Consensus::Canonical),
    }
}

/// Signal log-odds against the non-coding background under its footprint.
///
/// Returns `None` when the footprint leaves the window.
#[must_use]
pub fn normalized_score(
    model: &SignalModel,
    seq: &EncodedSequence,
    background: &Cumulative,
    strand: Strand,
    anchor: Pos,
) -> Option<f64> {
    let raw = model.raw_score(seq, strand, anchor)?;
    let first = model.footprint_start(strand, anchor);
    let last = match strand {
        Strand::Reverse => first - model.len() as Pos + 1,
        _ => first + model.len() as Pos - 1,
    };
    Some(raw - background.range(first.min(last), first.max(last)))
}
