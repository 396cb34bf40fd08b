//! Transition legality and branch scores between state types.
//!
//! Legality is a table over (left kind, right kind, strand, phase): exon to
//! intron links require matching phases, intron to exon links and gene ends
//! are resolved by kind and strand alone. Phases of exons that follow an
//! intron or an intergenic region are derived from the exon length with the
//! helpers below.

use bio::bio_types::strand::Strand;

use super::{StateKey, StateKind};
use crate::model::Transitions;
use crate::types::Pos;

/// Phase of the intron following an exon of `exon_phase`
#[inline]
#[must_use]
pub const fn intron_phase_after(strand: Strand, exon_phase: u8) -> u8 {
    match strand {
        Strand::Reverse => (exon_phase + 2) % 3,
        _ => (exon_phase + 1) % 3,
    }
}

/// Phase of an exon of `len` bases following an intron of `intron_phase`
#[inline]
#[must_use]
pub const fn exon_phase_after_intron(strand: Strand, intron_phase: u8, len: Pos) -> u8 {
    let q = intron_phase as Pos;
    match strand {
        Strand::Reverse => (q - len + 1).rem_euclid(3) as u8,
        _ => (q + len - 1).rem_euclid(3) as u8,
    }
}

/// Phase of an exon of `len` bases following an intergenic region, `None`
/// when the length is incompatible with the exon's codons
#[must_use]
pub const fn exon_phase_after_intergenic(kind: StateKind, strand: Strand, len: Pos) -> Option<u8> {
    let whole_codons = len % 3 == 0;
    match (strand, kind) {
        (Strand::Reverse, StateKind::LastExon) => Some((3 - len % 3) as u8 % 3),
        (Strand::Reverse, StateKind::SingleExon) if whole_codons => Some(0),
        (Strand::Reverse, _) => None,
        (_, StateKind::FirstExon) => Some(((len - 1) % 3) as u8),
        (_, StateKind::SingleExon) if whole_codons => Some(2),
        _ => None,
    }
}

/// Phase an exon must end with, if its kind fixes one
#[must_use]
pub const fn required_phase(kind: StateKind, strand: Strand) -> Option<u8> {
    if !kind.is_exon() || !kind.is_gene_right_end(strand) {
        return None;
    }
    match strand {
        Strand::Reverse => Some(0),
        _ => Some(2),
    }
}

/// Exon kinds that may follow an intergenic region on `strand`
#[must_use]
pub const fn gene_openers(strand: Strand) -> [StateKind; 2] {
    match strand {
        Strand::Reverse => [StateKind::SingleExon, StateKind::LastExon],
        _ => [StateKind::SingleExon, StateKind::FirstExon],
    }
}

/// Exon kinds that may follow an intron on `strand`
#[must_use]
pub const fn intron_successors(strand: Strand) -> [StateKind; 2] {
    match strand {
        Strand::Reverse => [StateKind::InternalExon, StateKind::FirstExon],
        _ => [StateKind::InternalExon, StateKind::LastExon],
    }
}

/// The right state may directly follow the left one
#[must_use]
pub fn is_legal(left: StateKey, right: StateKey) -> bool {
    use StateKind::*;

    let same_strand = left.strand == right.strand;
    match (left.kind, right.kind) {
        (Intergenic, kind) if kind.is_exon() => {
            same_strand && gene_openers(right.strand).contains(&kind)
        }
        (kind, Intron) if kind.is_exon() => {
            same_strand
                && !kind.is_gene_right_end(left.strand)
                && right.phase == intron_phase_after(left.strand, left.phase)
        }
        (Intron, kind) if kind.is_exon() => {
            same_strand
                && intron_successors(right.strand).contains(&kind)
                && required_phase(kind, right.strand).is_none_or(|phase| phase == right.phase)
        }
        (kind, Intergenic) if kind.is_exon() => kind.is_gene_right_end(left.strand),
        _ => false,
    }
}

/// Log-probability of moving from `left` to `right`, `None` if illegal
#[must_use]
pub fn branch_score(transitions: &Transitions, left: StateKey, right: StateKey) -> Option<f64> {
    if !is_legal(left, right) {
        return None;
    }
    let strand = crate::types::strand_index(right.strand);
    let score = match (left.kind, right.kind) {
        (StateKind::Intergenic, StateKind::SingleExon) => {
            transitions.strand[strand] + transitions.single_exon
        }
        (StateKind::Intergenic, _) => transitions.strand[strand] + transitions.multi_exon,
        (_, StateKind::Intron) => transitions.intron_phase[right.phase as usize],
        (StateKind::Intron, StateKind::InternalExon) => transitions.to_internal,
        (StateKind::Intron, _) => transitions.to_last,
        _ => 0.0,
    };
    Some(score)
}
