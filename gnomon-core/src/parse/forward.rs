//! Sparse forward dynamic program.
//!
//! States are instantiated only at positions where their right signal
//! scores (or at the right window edge). Finished states go into buckets
//! keyed by what may follow them; each bucket keeps, next to its arena
//! indices, the running maximum of its scores so a reverse scan can stop as
//! soon as no older predecessor can win.

use std::cell::Cell;

use bio::bio_types::strand::Strand;
use log::{debug, info};

use crate::constants::{ANCHOR_BONUS, EVIDENCE_CLASSES, READING_FRAMES, STRANDS_COUNT};
use crate::hmm::state_scores::{
    LengthMode, length_distribution, length_score, region_closed, region_score,
};
use crate::hmm::transitions::{
    branch_score, exon_phase_after_intergenic, exon_phase_after_intron, gene_openers,
    intron_phase_after, intron_successors, required_phase,
};
use crate::hmm::{BAD_SCORE, HmmState, ScoreParts, StateKey, StateKind};
use crate::scoring::SeqScores;
use crate::types::{Pos, STRANDS, strand_index};

/// Arena indices of states of one type, in coordinate order
#[derive(Debug, Default)]
struct Bucket {
    states: Vec<usize>,
    /// `mscore[k]` is the best score among `states[..=k]`
    mscore: Vec<f64>,
}

impl Bucket {
    fn push(&mut self, index: usize, score: f64) {
        let best = self.mscore.last().map_or(score, |&prev| prev.max(score));
        self.states.push(index);
        self.mscore.push(best);
    }

    fn len(&self) -> usize {
        self.states.len()
    }
}

/// Per strand: `[phase][protein]`
type PhaseBuckets = [[Bucket; EVIDENCE_CLASSES]; READING_FRAMES];

#[derive(Debug, Default)]
struct Buckets {
    /// Intergenic states by the strand of the next gene
    intergenic: [Bucket; STRANDS_COUNT],
    /// Exons that end a gene
    gene_ends: [Bucket; STRANDS_COUNT],
    /// Exons followed by an intron
    exons: [PhaseBuckets; STRANDS_COUNT],
    introns: [PhaseBuckets; STRANDS_COUNT],
}

impl Buckets {
    fn for_state(&mut self, state: &HmmState) -> &mut Bucket {
        let st = strand_index(state.strand());
        let phase = state.key.phase as usize;
        let protein = state.protein as usize;
        match state.kind() {
            StateKind::Intergenic => &mut self.intergenic[st],
            StateKind::Intron => &mut self.introns[st][phase][protein],
            kind if kind.is_gene_right_end(state.strand()) => &mut self.gene_ends[st],
            _ => &mut self.exons[st][phase][protein],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    key: StateKey,
    protein: u8,
    left: Option<usize>,
    score: f64,
    parts: ScoreParts,
}

/// Best candidate per (phase, protein class) of one state kind and strand
type Best = [[Option<Candidate>; EVIDENCE_CLASSES]; READING_FRAMES];

fn best_score(best: &Best, phase: u8, protein: u8) -> f64 {
    best[phase as usize][protein as usize].map_or(BAD_SCORE, |c| c.score)
}

fn offer(best: &mut Best, candidate: Candidate) {
    let slot = &mut best[candidate.key.phase as usize][candidate.protein as usize];
    if slot.is_none_or(|current| candidate.score > current.score) {
        *slot = Some(candidate);
    }
}

/// States of a finished forward pass
#[derive(Debug)]
pub(crate) struct ForwardOutcome {
    pub states: Vec<HmmState>,
    /// States ending at the right window edge
    pub finals: Vec<usize>,
}

pub(crate) struct ForwardPass<'a, 'm> {
    scores: &'a SeqScores<'m>,
    states: Vec<HmmState>,
    buckets: Buckets,
    finals: Vec<usize>,
    pruned: Cell<usize>,
}

impl<'a, 'm> ForwardPass<'a, 'm> {
    pub fn new(scores: &'a SeqScores<'m>) -> Self {
        Self {
            scores,
            states: Vec::new(),
            buckets: Buckets::default(),
            finals: Vec::new(),
            pruned: Cell::new(0),
        }
    }

    pub fn run(mut self) -> ForwardOutcome {
        let len = self.scores.len();
        let mut signal_positions = 0usize;

        for s in 0..len {
            let mut found: Vec<Candidate> = Vec::new();
            for strand in STRANDS {
                for kind in StateKind::ALL {
                    if let Some(term) = self.scores.terminal(kind.right_signal(strand), strand, s) {
                        found.extend(self.extend(kind, strand, s, term, false));
                    }
                }
            }
            if !found.is_empty() {
                signal_positions += 1;
            }

            let mut finals: Vec<Candidate> = Vec::new();
            if s == len - 1 {
                for strand in STRANDS {
                    for kind in StateKind::ALL {
                        if self.may_end_at_right_edge(kind, strand) {
                            finals.extend(self.extend(kind, strand, s, 0.0, true));
                        }
                    }
                }
            }

            self.append(s, found, false);
            self.append(s, finals, true);
        }

        info!(
            "Scanned {signal_positions} signal positions, instantiated {} states",
            self.states.len()
        );
        for (st, strand) in STRANDS.iter().enumerate() {
            let exons: usize = self.buckets.exons[st].iter().flatten().map(Bucket::len).sum();
            let introns: usize = self.buckets.introns[st].iter().flatten().map(Bucket::len).sum();
            debug!(
                "{strand:?}: {} intergenic, {} gene ends, {exons} exons, {introns} introns",
                self.buckets.intergenic[st].len(),
                self.buckets.gene_ends[st].len(),
            );
        }
        debug!("{} predecessor scans cut by too-far pruning", self.pruned.get());

        ForwardOutcome {
            states: self.states,
            finals: self.finals,
        }
    }

    /// Store the states ending at `s`; they become visible to later positions only
    fn append(&mut self, s: Pos, found: Vec<Candidate>, at_right_edge: bool) {
        for candidate in found {
            let index = self.states.len();
            let state = HmmState {
                key: candidate.key,
                stop: s,
                protein: candidate.protein,
                left: candidate.left,
                score: candidate.score,
                parts: candidate.parts,
                open_right: at_right_edge,
            };
            if at_right_edge {
                self.finals.push(index);
            } else {
                self.buckets.for_state(&state).push(index, state.score);
            }
            self.states.push(state);
        }
    }

    /// Kinds that may run off the left window edge
    fn may_start_at_left_edge(&self, key: StateKey) -> bool {
        let config = self.scores.config();
        if config.left_wall || config.left_anchor {
            return key.kind == StateKind::Intergenic;
        }
        match key.kind {
            StateKind::Intergenic | StateKind::Intron | StateKind::InternalExon => true,
            kind => {
                intron_successors(key.strand).contains(&kind)
                    && required_phase(kind, key.strand) == Some(key.phase)
            }
        }
    }

    /// Kinds that may run off the right window edge
    fn may_end_at_right_edge(&self, kind: StateKind, strand: Strand) -> bool {
        match kind {
            StateKind::Intergenic => true,
            _ if self.scores.config().right_wall => false,
            StateKind::Intron => true,
            kind => !kind.is_gene_right_end(strand),
        }
    }

    /// Best extensions of every predecessor into a state of `kind` ending at `s`
    fn extend(
        &self,
        kind: StateKind,
        strand: Strand,
        s: Pos,
        term: f64,
        at_right_edge: bool,
    ) -> Vec<Candidate> {
        let mut best: Best = Default::default();

        match kind {
            StateKind::Intergenic => {
                for gene_strand in STRANDS {
                    let bucket = &self.buckets.gene_ends[strand_index(gene_strand)];
                    self.scan(bucket, kind, strand, s, term, at_right_edge, &mut best);
                }
            }
            _ if kind.is_exon() && gene_openers(strand).contains(&kind) => {
                let bucket = &self.buckets.intergenic[strand_index(strand)];
                self.scan(bucket, kind, strand, s, term, at_right_edge, &mut best);
            }
            StateKind::Intron => {
                for bucket in self.buckets.exons[strand_index(strand)].iter().flatten() {
                    self.scan(bucket, kind, strand, s, term, at_right_edge, &mut best);
                }
            }
            _ => {
                for bucket in self.buckets.introns[strand_index(strand)].iter().flatten() {
                    self.scan(bucket, kind, strand, s, term, at_right_edge, &mut best);
                }
            }
        }

        self.extend_from_left_edge(kind, strand, s, term, at_right_edge, &mut best);
        best.into_iter().flatten().flatten().collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn scan(
        &self,
        bucket: &Bucket,
        kind: StateKind,
        strand: Strand,
        s: Pos,
        term: f64,
        at_right_edge: bool,
        best: &mut Best,
    ) {
        let scores = self.scores;
        let config = scores.config();
        let lengths = &scores.model().lengths;
        let distribution = length_distribution(lengths, kind);
        let mode = LengthMode::new(false, at_right_edge);
        // closing and through length scores may exceed the distribution peak
        let prunable =
            mode == LengthMode::Exact && matches!(kind, StateKind::Intergenic | StateKind::Intron);

        for k in (0..bucket.len()).rev() {
            let left = &self.states[bucket.states[k]];
            let a = left.stop + 1;
            let len = s - left.stop;
            if len <= 0 {
                continue;
            }
            if len > distribution.max() || region_closed(scores, kind, strand, a, s) {
                break;
            }

            let phase = match kind {
                StateKind::Intergenic => Some(0),
                StateKind::Intron => Some(intron_phase_after(strand, left.key.phase)),
                _ if left.kind() == StateKind::Intergenic => {
                    exon_phase_after_intergenic(kind, strand, len)
                }
                _ => Some(exon_phase_after_intron(strand, left.key.phase, len)),
            };
            let Some(phase) = phase else {
                continue;
            };
            // a stop codon split by the intron
            if left.kind() == StateKind::Intron
                && let Some(exon) = left.left
                && scores.is_split_stop(strand, self.states[exon].stop, a, left.key.phase)
            {
                continue;
            }
            let key = StateKey { kind, strand, phase };
            let target = if kind == StateKind::Intergenic { 0 } else { left.protein };

            // region scores of these kinds are zero, branch scores are
            // log-probabilities and exact length scores peak at max_score
            if prunable
                && s - left.stop > config.too_far_len
                && bucket.mscore[k] + distribution.max_score() + term
                    < best_score(best, phase, target)
            {
                self.pruned.set(self.pruned.get() + 1);
                break;
            }

            let Some(branch) = branch_score(&scores.model().transitions, left.key, key) else {
                continue;
            };
            let Some(length) = length_score(lengths, kind, len, mode) else {
                continue;
            };
            let Some(region) = region_score(scores, key, a, s) else {
                continue;
            };
            let Some((protein, penalty)) = self.protein_class(kind, strand, left.protein, a, s) else {
                continue;
            };

            let parts = ScoreParts {
                branch,
                length,
                region,
                term,
                penalty,
                anchor: 0.0,
            };
            offer(
                best,
                Candidate {
                    key,
                    protein,
                    left: Some(bucket.states[k]),
                    score: left.score + parts.total(),
                    parts,
                },
            );
        }
    }

    /// States with no left neighbour: the segment covers `[0, s]`
    fn extend_from_left_edge(
        &self,
        kind: StateKind,
        strand: Strand,
        s: Pos,
        term: f64,
        at_right_edge: bool,
        best: &mut Best,
    ) {
        let scores = self.scores;
        let config = scores.config();
        let lengths = &scores.model().lengths;
        let mode = LengthMode::new(true, at_right_edge);
        let phases: &[u8] = if kind == StateKind::Intergenic { &[0] } else { &[0, 1, 2] };

        for &phase in phases {
            let key = StateKey { kind, strand, phase };
            if !self.may_start_at_left_edge(key) {
                continue;
            }
            let Some(length) = length_score(lengths, kind, s + 1, mode) else {
                continue;
            };
            let Some(region) = region_score(scores, key, 0, s) else {
                continue;
            };
            let Some((protein, penalty)) = self.protein_class(kind, strand, 0, 0, s) else {
                continue;
            };
            let anchor = if config.left_anchor && kind == StateKind::Intergenic {
                ANCHOR_BONUS
            } else {
                0.0
            };

            let parts = ScoreParts {
                branch: 0.0,
                length,
                region,
                term,
                penalty,
                anchor,
            };
            offer(
                best,
                Candidate {
                    key,
                    protein,
                    left: None,
                    score: parts.total(),
                    parts,
                },
            );
        }
    }

    /// Protein class of the new state and the multi-protein penalty it pays.
    ///
    /// The first protein start on a gene's path is free, every further one
    /// costs the penalty. Introns may not contain protein starts.
    fn protein_class(
        &self,
        kind: StateKind,
        strand: Strand,
        left_protein: u8,
        a: Pos,
        s: Pos,
    ) -> Option<(u8, f64)> {
        let scores = self.scores;
        let penalty = scores.config().multi_protein_penalty;
        match kind {
            StateKind::Intergenic => {
                let starts: i32 = STRANDS
                    .iter()
                    .map(|&strand| scores.protein_starts(strand, a, s))
                    .sum();
                Some((0, penalty * f64::from(starts)))
            }
            StateKind::Intron => {
                (scores.protein_starts(strand, a, s) == 0).then_some((left_protein, 0.0))
            }
            _ => {
                let starts = scores.protein_starts(strand, a, s);
                let free = i32::from(left_protein == 0 && starts > 0);
                Some((
                    left_protein | u8::from(starts > 0),
                    penalty * f64::from(starts - free),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::constants::DEFAULT_TOO_FAR_LEN;
    use crate::model::ModelSet;
    use crate::parse::tests::gcc_model;
    use crate::types::Interval;

    fn outcome(model: &ModelSet, config: &EngineConfig, contig: &[u8]) -> ForwardOutcome {
        let window = Interval::new(0, contig.len() as Pos - 1);
        let scores = SeqScores::new(model, config, contig, window, &[]).unwrap();
        ForwardPass::new(&scores).run()
    }

    #[test]
    fn test_bucket_running_maximum() {
        let mut bucket = Bucket::default();
        bucket.push(0, -3.0);
        bucket.push(1, -1.0);
        bucket.push(2, -5.0);
        assert_eq!(bucket.mscore, vec![-3.0, -1.0, -1.0]);
        assert_eq!(bucket.len(), 3);
    }

    #[test]
    fn test_no_signal_window_has_two_final_intergenic_states() {
        let model = ModelSet::uniform();
        let contig = vec![b'C'; 300];
        let result = outcome(&model, &EngineConfig::default(), &contig);

        assert_eq!(result.finals.len(), 2);
        for &index in &result.finals {
            let state = &result.states[index];
            assert_eq!(state.kind(), StateKind::Intergenic);
            assert!(state.left.is_none());
            assert_eq!(state.stop, 299);
        }
    }

    #[test]
    fn test_open_edges_admit_partial_exons() {
        let model = ModelSet::uniform();
        let contig = vec![b'C'; 300];
        let config = EngineConfig {
            left_wall: false,
            right_wall: false,
            ..Default::default()
        };
        let result = outcome(&model, &config, &contig);

        let kinds: Vec<StateKind> = result
            .finals
            .iter()
            .map(|&index| result.states[index].kind())
            .collect();
        assert!(kinds.contains(&StateKind::InternalExon));
        assert!(kinds.contains(&StateKind::Intron));
        assert!(!kinds.contains(&StateKind::SingleExon));
    }

    /// Pseudo-random contig from a linear congruential generator
    fn random_contig(seed: u64, len: usize) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                b"ACGT"[(state >> 33) as usize % 4]
            })
            .collect()
    }

    #[test]
    fn test_pruning_matches_full_scan() {
        let model = gcc_model();
        let best_final = |contig: &[u8], right_wall: bool, too_far_len: Pos| {
            let config = EngineConfig {
                right_wall,
                too_far_len,
                ..Default::default()
            };
            let result = outcome(&model, &config, contig);
            result
                .finals
                .iter()
                .map(|&index| result.states[index].score)
                .fold(BAD_SCORE, f64::max)
        };

        for seed in 1..=6 {
            // T-rich stretches leave long intergenic gaps between genes
            let mut contig = random_contig(seed, 600);
            contig.extend(std::iter::repeat_n(b'T', 700));
            contig.extend(random_contig(seed + 100, 300));

            for right_wall in [true, false] {
                let pruned = best_final(&contig, right_wall, DEFAULT_TOO_FAR_LEN);
                let full = best_final(&contig, right_wall, Pos::MAX);
                assert!(
                    (pruned - full).abs() < 1e-9,
                    "seed {seed}, right wall {right_wall}: {pruned} != {full}"
                );
            }
        }
    }

    #[test]
    fn test_protein_penalty() {
        let model = ModelSet::uniform();
        let contig = vec![b'C'; 100];
        let window = Interval::new(0, 99);
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, window, &[]).unwrap();
        let pass = ForwardPass::new(&scores);
        assert_eq!(
            pass.protein_class(StateKind::InternalExon, Strand::Forward, 0, 0, 50),
            Some((0, 0.0))
        );
        assert_eq!(
            pass.protein_class(StateKind::Intron, Strand::Forward, 1, 0, 50),
            Some((1, 0.0))
        );
    }
}
