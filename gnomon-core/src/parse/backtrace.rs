//! Turn the chosen path into gene models.

use std::collections::HashMap;

use bio::bio_types::strand::Strand;

use crate::evidence::{AlignModel, EvidenceKind};
use crate::hmm::{HmmState, StateKind};
use crate::scoring::SeqScores;
use crate::sequence::is_stop_codon;
use crate::types::{Exon, GeneModel, Interval, Pos};

/// Split a path (left to right arena indices) into genes at intergenic states
pub(crate) fn build_genes(scores: &SeqScores<'_>, states: &[HmmState], path: &[usize]) -> Vec<GeneModel> {
    let mut genes = Vec::new();
    let mut members: Vec<usize> = Vec::new();

    for &index in path {
        if states[index].kind() == StateKind::Intergenic {
            genes.extend(GeneBuilder::new(scores, states, &members).and_then(GeneBuilder::build));
            members.clear();
        } else {
            members.push(index);
        }
    }
    genes.extend(GeneBuilder::new(scores, states, &members).and_then(GeneBuilder::build));
    genes
}

/// Bases to drop at the left and right end so the coding range holds whole codons.
///
/// `head` and `tail` are the outermost members of the gene, `last_exon` its
/// rightmost exon. An open intron at the left edge carries the codon position
/// of the first coding base; at the right edge the last exon's phase applies.
fn edge_trims(states: &[HmmState], head: &HmmState, tail: &HmmState, last_exon: &HmmState) -> (Pos, Pos) {
    let strand = head.strand();
    let left = if head.open_left() {
        let first = if head.kind() == StateKind::Intron {
            Pos::from(head.key.phase)
        } else {
            let span = head.stop - head.start(states);
            let p = Pos::from(head.key.phase);
            let first = match strand {
                Strand::Reverse => p + span,
                _ => p - span,
            };
            first.rem_euclid(3)
        };
        match strand {
            Strand::Reverse => (first + 1) % 3,
            _ => (3 - first) % 3,
        }
    } else {
        0
    };
    let right = if tail.open_right {
        let p = Pos::from(last_exon.key.phase);
        match strand {
            Strand::Reverse => (3 - p) % 3,
            _ => (p + 1) % 3,
        }
    } else {
        0
    };
    (left, right)
}

/// Gene assembly in edited coordinates, mapped to contig coordinates at the end
struct GeneBuilder<'s, 'm> {
    scores: &'s SeqScores<'m>,
    states: &'s [HmmState],
    members: &'s [usize],
    strand: Strand,
    /// Exons as (member position, edited range)
    exons: Vec<(usize, Interval)>,
    /// Introns with exons on both sides
    introns: Vec<Interval>,
}

impl<'s, 'm> GeneBuilder<'s, 'm> {
    fn new(scores: &'s SeqScores<'m>, states: &'s [HmmState], members: &'s [usize]) -> Option<Self> {
        let strand = states[*members.first()?].strand();
        let range = |index: usize| Interval::new(states[index].start(states), states[index].stop);

        let exons: Vec<(usize, Interval)> = members
            .iter()
            .enumerate()
            .filter(|&(_, &index)| states[index].kind().is_exon())
            .map(|(pos, &index)| (pos, range(index)))
            .collect();
        if exons.is_empty() {
            return None;
        }
        let introns = members
            .iter()
            .map(|&index| &states[index])
            .filter(|state| {
                state.kind() == StateKind::Intron && !state.open_left() && !state.open_right
            })
            .map(|state| Interval::new(state.start(states), state.stop))
            .collect();

        Some(Self {
            scores,
            states,
            members,
            strand,
            exons,
            introns,
        })
    }

    fn state(&self, member: usize) -> &HmmState {
        &self.states[self.members[member]]
    }

    fn limits(&self) -> Interval {
        let first = self.exons.first().map_or(0, |(_, range)| range.start);
        let last = self.exons.last().map_or(-1, |(_, range)| range.end);
        Interval::new(first, last)
    }

    /// Coding bases in biological order
    fn coding_positions(&self, cds: Interval) -> Vec<Pos> {
        let mut positions: Vec<Pos> = self
            .exons
            .iter()
            .filter_map(|(_, range)| range.intersection(&cds))
            .flat_map(|range| range.start..=range.end)
            .collect();
        if self.strand == Strand::Reverse {
            positions.reverse();
        }
        positions
    }

    fn to_orig(&self, range: Interval) -> Option<Interval> {
        self.scores.seq_map().range_to_orig(range)
    }

    fn build(self) -> Option<GeneModel> {
        let first = self.state(0);
        let last = self.state(self.members.len() - 1);
        let (right_member, right_range) = self.exons[self.exons.len() - 1];
        let (trim_left, trim_right) = edge_trims(self.states, first, last, self.state(right_member));
        let limits = self.limits();
        let cds = Interval::new(limits.start + trim_left, limits.end - trim_right);

        let mut gene = GeneModel::new(self.strand);
        gene.open_left = first.open_left();
        gene.open_right = last.open_right;
        gene.score = self
            .members
            .iter()
            .map(|&index| self.states[index].parts)
            .map(|parts| parts.total() - parts.anchor)
            .sum();

        let (left_member, left_range) = self.exons[0];
        let left_kind = self.state(left_member).kind();
        let right_kind = self.state(right_member).kind();
        let head = Interval::new(left_range.start, left_range.start + 2);
        let tail = Interval::new(right_range.end - 2, right_range.end);
        let (start_codon, stop_codon) = match self.strand {
            Strand::Reverse => (
                right_kind.has_start_codon().then_some(tail),
                left_kind.has_stop_codon().then_some(head),
            ),
            _ => (
                left_kind.has_start_codon().then_some(head),
                right_kind.has_stop_codon().then_some(tail),
            ),
        };

        let coding = self.coding_positions(cds);
        let premature = self.premature_stops(&coding, stop_codon.is_some());
        let support = self.support(&coding);

        let applied = self.scores.seq_map().applied();
        let orig_limits = self.to_orig(limits)?;
        gene.frameshifts = applied
            .iter()
            .filter(|shift| shift.span().intersects(&orig_limits))
            .cloned()
            .collect();

        for (member, range) in &self.exons {
            let Some(orig) = self.to_orig(*range) else {
                continue;
            };
            let identity = support
                .iter()
                .flat_map(|(_, model)| model.exons.iter())
                .filter(|exon| exon.range().intersects(range))
                .map(|exon| exon.identity)
                .fold(0.0, f64::max);
            gene.exons.push(Exon {
                range: orig,
                splice_left: *member > 0,
                splice_right: *member + 1 < self.members.len(),
                identity,
                frameshifts: applied
                    .iter()
                    .filter(|shift| shift.span().intersects(&orig))
                    .cloned()
                    .collect(),
            });
        }

        gene.reading_frame = self.to_orig(cds).unwrap_or(Interval::new(0, -1));
        gene.start_codon = start_codon.and_then(|codon| self.to_orig(codon));
        gene.stop_codon = stop_codon.and_then(|codon| self.to_orig(codon));
        gene.premature_stops = premature;
        gene.support = support.iter().map(|(index, _)| *index).collect();
        Some(gene)
    }

    /// In-frame stop codons before the terminal one
    fn premature_stops(&self, coding: &[Pos], has_stop: bool) -> Vec<Interval> {
        let seq = self.scores.sequence();
        let mut codons: Vec<&[Pos]> = coding.chunks_exact(3).collect();
        if has_stop {
            codons.pop();
        }
        codons
            .into_iter()
            .filter(|codon| {
                is_stop_codon([codon[0], codon[1], codon[2]].map(|pos| seq.residue(self.strand, pos)))
            })
            .filter_map(|codon| {
                let low = codon.iter().copied().min()?;
                let high = codon.iter().copied().max()?;
                self.to_orig(Interval::new(low, high))
            })
            .collect()
    }

    /// Alignments consistent with the gene's structure and frame
    fn support(&self, coding: &[Pos]) -> Vec<(usize, &'s AlignModel)> {
        self.scores
            .evidence()
            .iter()
            .filter(|(_, model)| self.is_compatible(model, coding))
            .map(|(index, model)| (*index, model))
            .collect()
    }

    fn is_compatible(&self, model: &AlignModel, coding: &[Pos]) -> bool {
        let limits = self.limits();
        if model.strand != self.strand || model.kind == EvidenceKind::Wall {
            return false;
        }
        if !model.limits().is_some_and(|range| range.intersects(&limits)) {
            return false;
        }
        let consistent_introns = model
            .introns()
            .filter(|intron| intron.intersects(&limits))
            .all(|intron| self.introns.contains(&intron));
        let introns_outside_exons = self
            .introns
            .iter()
            .all(|intron| !model.exons.iter().any(|exon| exon.range().intersects(intron)));
        if !consistent_introns || !introns_outside_exons {
            return false;
        }
        if !model.has_cds() {
            return true;
        }

        let offsets: HashMap<Pos, usize> = model
            .coding_positions()
            .into_iter()
            .enumerate()
            .map(|(offset, pos)| (pos, offset))
            .collect();
        // every shared coding base must sit at the same codon position
        let mut shifts = coding
            .iter()
            .enumerate()
            .filter_map(|(gene_offset, pos)| {
                offsets
                    .get(pos)
                    .map(|&model_offset| gene_offset as i64 - model_offset as i64)
            })
            .peekable();
        shifts.peek().is_some() && shifts.all(|shift| shift % 3 == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::evidence::AlignExon;
    use crate::hmm::{ScoreParts, StateKey};
    use crate::model::ModelSet;

    fn state(key: StateKey, stop: Pos, left: Option<usize>, open_right: bool) -> HmmState {
        HmmState {
            key,
            stop,
            protein: 0,
            left,
            score: 0.0,
            parts: ScoreParts::default(),
            open_right,
        }
    }

    fn genes(contig: &[u8], evidence: &[AlignModel], arena: &[HmmState]) -> Vec<GeneModel> {
        let model = ModelSet::uniform();
        let window = Interval::new(0, contig.len() as Pos - 1);
        let scores = SeqScores::new(&model, &EngineConfig::default(), contig, window, evidence).unwrap();
        let path: Vec<usize> = (0..arena.len()).collect();
        build_genes(&scores, arena, &path)
    }

    #[test]
    fn test_open_left_intron_trims_partial_codon() {
        // an in-frame stop at 12..14
        let mut contig = b"CCCCCCCCCCGCTAA".to_vec();
        for _ in 0..8 {
            contig.extend_from_slice(b"GCC");
        }
        contig.extend_from_slice(b"TAACCCCCCCCCC");

        // the exon's first base sits at codon position 1
        let arena = [
            state(StateKey::intron(Strand::Forward, 1), 9, None, false),
            state(StateKey::exon(StateKind::LastExon, Strand::Forward, 2), 41, Some(0), false),
            state(StateKey::intergenic(Strand::Forward), 51, Some(1), true),
        ];
        let genes = genes(&contig, &[], &arena);

        assert_eq!(genes.len(), 1);
        let gene = &genes[0];
        assert!(gene.open_left && !gene.open_right);
        assert_eq!(gene.exons[0].range, Interval::new(10, 41));
        assert_eq!(gene.reading_frame, Interval::new(12, 41));
        assert_eq!(gene.stop_codon, Some(Interval::new(39, 41)));
        assert_eq!(gene.premature_stops, vec![Interval::new(12, 14)]);
    }

    #[test]
    fn test_open_right_intron_trims_partial_codon_on_minus_strand() {
        // stop codon at 10..12 and an in-frame stop at 37..39, both as TTA
        let mut contig = b"CCCCCCCCCCTTA".to_vec();
        for _ in 0..8 {
            contig.extend_from_slice(b"GGC");
        }
        contig.extend_from_slice(b"TTAGCCCCCCCCCCC");

        // the exon's last base sits at codon position 1
        let arena = [
            state(StateKey::intergenic(Strand::Reverse), 9, None, false),
            state(StateKey::exon(StateKind::LastExon, Strand::Reverse, 1), 41, Some(0), false),
            state(StateKey::intron(Strand::Reverse, 0), 51, Some(1), true),
        ];
        let genes = genes(&contig, &[], &arena);

        assert_eq!(genes.len(), 1);
        let gene = &genes[0];
        assert!(!gene.open_left && gene.open_right);
        assert_eq!(gene.exons[0].range, Interval::new(10, 41));
        assert!(gene.exons[0].splice_right);
        assert_eq!(gene.reading_frame, Interval::new(10, 39));
        assert_eq!(gene.stop_codon, Some(Interval::new(10, 12)));
        assert_eq!(gene.start_codon, None);
        assert_eq!(gene.premature_stops, vec![Interval::new(37, 39)]);
    }

    #[test]
    fn test_support_needs_frame_agreement_on_every_shared_base() {
        let mut contig = vec![b'C'; 10];
        contig.extend_from_slice(b"ATG");
        for _ in 0..8 {
            contig.extend_from_slice(b"GCC");
        }
        contig.extend_from_slice(b"TAA");
        contig.extend(std::iter::repeat_n(b'C', 10));

        let arena = [
            state(StateKey::intergenic(Strand::Forward), 9, None, false),
            state(StateKey::exon(StateKind::SingleExon, Strand::Forward, 2), 39, Some(0), false),
            state(StateKey::intergenic(Strand::Forward), 49, Some(1), true),
        ];

        let in_frame = AlignModel::new(Strand::Forward, EvidenceKind::Mrna, vec![AlignExon::new(5, 45)])
            .with_cds(Interval::new(10, 39));
        let supported = genes(&contig, &[in_frame], &arena);
        assert_eq!(supported[0].support, vec![0]);

        // a one-base gap at 21 shifts the alignment's frame after it
        let shifted = AlignModel::new(
            Strand::Forward,
            EvidenceKind::Mrna,
            vec![AlignExon::new(5, 20), AlignExon::new(22, 45)],
        )
        .with_cds(Interval::new(10, 39));
        let unsupported = genes(&contig, &[shifted], &arena);
        assert_eq!(unsupported.len(), 1);
        assert!(unsupported[0].support.is_empty());
    }
}
