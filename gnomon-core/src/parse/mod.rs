//! Maximum-likelihood parse of one window.
//!
//! [`Parser`] runs the sparse forward program over a [`SeqScores`], picks the
//! best state at the right window edge and walks back to the left edge.
//!
//! ## Examples
//!
//! ```rust
//! use gnomon_core::config::EngineConfig;
//! use gnomon_core::model::ModelSet;
//! use gnomon_core::parse::Parser;
//! use gnomon_core::scoring::SeqScores;
//! use gnomon_core::types::Interval;
//!
//! let model = ModelSet::uniform();
//! let contig = vec![b'C'; 400];
//! let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, Interval::new(0, 399), &[])?;
//!
//! let mut parser = Parser::new(&scores);
//! assert!(parser.genes().is_err());
//!
//! parser.run();
//! assert!(parser.genes()?.is_empty());
//! assert_eq!(parser.state_scores()?.len(), 1);
//! # Ok::<(), gnomon_core::types::GnomonError>(())
//! ```

mod backtrace;
mod forward;

use std::io::Write;

use log::info;

use crate::constants::ANCHOR_BONUS;
use crate::hmm::{BAD_SCORE, HmmState, StateKind};
use crate::results::StateRecord;
use crate::scoring::SeqScores;
use crate::types::{GeneModel, GnomonError, Interval};

use forward::ForwardPass;

#[derive(Debug)]
struct ParseResult {
    states: Vec<HmmState>,
    /// Arena indices of the chosen path, left to right
    path: Vec<usize>,
    score: f64,
    combined_score: f64,
}

/// Numerically stable `ln(sum(exp(x)))`
fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(BAD_SCORE, f64::max);
    if max == BAD_SCORE {
        return BAD_SCORE;
    }
    max + values.iter().map(|value| (value - max).exp()).sum::<f64>().ln()
}

/// Left anchor bonuses collected along the path ending at `index`
fn anchor_bonus(states: &[HmmState], index: usize) -> f64 {
    let mut bonus = 0.0;
    let mut current = Some(index);
    while let Some(i) = current {
        bonus += states[i].parts.anchor;
        current = states[i].left;
    }
    bonus
}

/// Sparse forward parser over one window.
#[derive(Debug)]
pub struct Parser<'a, 'm> {
    scores: &'a SeqScores<'m>,
    result: Option<ParseResult>,
}

impl<'a, 'm> Parser<'a, 'm> {
    #[must_use]
    pub fn new(scores: &'a SeqScores<'m>) -> Self {
        Self {
            scores,
            result: None,
        }
    }

    /// Run the forward pass and backtrace; returns the best path score.
    ///
    /// Running again discards the previous parse and recomputes it.
    pub fn run(&mut self) -> f64 {
        let outcome = ForwardPass::new(self.scores).run();
        let states = outcome.states;
        let right_anchor = self.scores.config().right_anchor;

        let mut best: Option<(usize, f64)> = None;
        for &index in &outcome.finals {
            let state = &states[index];
            let bonus = if right_anchor && state.kind() == StateKind::Intergenic {
                ANCHOR_BONUS
            } else {
                0.0
            };
            let score = state.score + bonus;
            if best.is_none_or(|(_, current)| score > current) {
                best = Some((index, score));
            }
        }

        let mut path = Vec::new();
        let mut current = best.map(|(index, _)| index);
        while let Some(index) = current {
            path.push(index);
            current = states[index].left;
        }
        path.reverse();

        let score = best.map_or(BAD_SCORE, |(index, _)| {
            states[index].score - anchor_bonus(&states, index)
        });
        let intergenic: Vec<f64> = outcome
            .finals
            .iter()
            .filter(|&&index| states[index].kind() == StateKind::Intergenic)
            .map(|&index| states[index].score - anchor_bonus(&states, index))
            .collect();
        let combined_score = log_sum_exp(&intergenic);

        info!(
            "Best path: {} states, score {score:.3} (combined {combined_score:.3})",
            path.len()
        );

        self.result = Some(ParseResult {
            states,
            path,
            score,
            combined_score,
        });
        score
    }

    fn result(&self) -> Result<&ParseResult, GnomonError> {
        self.result.as_ref().ok_or(GnomonError::EngineNotRun)
    }

    /// Best path score, [`BAD_SCORE`] if no legal parse exists
    pub fn score(&self) -> Result<f64, GnomonError> {
        Ok(self.result()?.score)
    }

    pub fn combined_score(&self) -> Result<f64, GnomonError> {
        Ok(self.result()?.combined_score)
    }

    /// States of the chosen path, left to right
    pub fn path(&self) -> Result<Vec<&HmmState>, GnomonError> {
        let result = self.result()?;
        Ok(result.path.iter().map(|&index| &result.states[index]).collect())
    }

    /// Every state instantiated by the last run
    pub fn states(&self) -> Result<&[HmmState], GnomonError> {
        Ok(self.result()?.states.as_slice())
    }

    pub fn genes(&self) -> Result<Vec<GeneModel>, GnomonError> {
        let result = self.result()?;
        Ok(backtrace::build_genes(self.scores, &result.states, &result.path))
    }

    /// Score decomposition of the chosen path in contig coordinates
    pub fn state_scores(&self) -> Result<Vec<StateRecord>, GnomonError> {
        let result = self.result()?;
        let map = self.scores.seq_map();
        let offset = map.window().start;

        Ok(result
            .path
            .iter()
            .map(|&index| {
                let state = &result.states[index];
                let edited = Interval::new(state.start(&result.states), state.stop);
                StateRecord {
                    kind: state.kind(),
                    strand: state.strand(),
                    phase: state.key.phase,
                    range: map
                        .range_to_orig(edited)
                        .unwrap_or_else(|| edited.shifted(offset)),
                    score: state.score,
                    parts: state.parts,
                    open_left: state.open_left(),
                    open_right: state.open_right,
                }
            })
            .collect())
    }

    /// Write the state dump of the chosen path
    pub fn print_info<W: Write>(&self, writer: &mut W) -> Result<(), GnomonError> {
        let records = self.state_scores()?;
        writeln!(writer, "# score {:.4}", self.score()?)?;
        crate::output::write_state_records(writer, None, &records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::constants::{ANCHOR_BONUS, DEFAULT_TOO_FAR_LEN};
    use crate::evidence::{AlignExon, AlignModel, EvidenceKind};
    use crate::model::{MarkovChain, ModelSet};
    use crate::types::Pos;
    use approx::assert_abs_diff_eq;
    use bio::bio_types::strand::Strand;

    /// Order-0 coding chains favouring G, C, C at codon positions 0, 1, 2
    pub(super) fn gcc_model() -> ModelSet {
        let mut model = ModelSet::uniform();
        let favor = |residue: usize| {
            let mut probabilities = vec![0.1; 4];
            probabilities[residue] = 0.7;
            MarkovChain::from_probabilities(0, probabilities).unwrap()
        };
        model.coding.frames = [favor(2), favor(1), favor(1)];
        model.noncoding = MarkovChain::uniform(0);
        model
    }

    /// T flank, ATG, 98 GCC codons, TAA, T flank
    fn single_orf(flank: usize) -> Vec<u8> {
        let mut contig = vec![b'T'; flank];
        contig.extend_from_slice(b"ATG");
        for _ in 0..98 {
            contig.extend_from_slice(b"GCC");
        }
        contig.extend_from_slice(b"TAA");
        contig.extend(std::iter::repeat_n(b'T', flank));
        contig
    }

    fn whole(contig: &[u8]) -> Interval {
        Interval::new(0, contig.len() as Pos - 1)
    }

    #[test]
    fn test_engine_not_run() {
        let model = ModelSet::uniform();
        let contig = vec![b'A'; 50];
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let parser = Parser::new(&scores);

        assert!(matches!(parser.score(), Err(GnomonError::EngineNotRun)));
        assert!(matches!(parser.genes(), Err(GnomonError::EngineNotRun)));
        assert!(matches!(
            parser.print_info(&mut Vec::new()),
            Err(GnomonError::EngineNotRun)
        ));
    }

    #[test]
    fn test_no_signal_window_is_one_intergenic_state() {
        let model = ModelSet::uniform();
        let contig = vec![b'C'; 600];
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        let score = parser.run();

        let path = parser.path().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].kind(), StateKind::Intergenic);
        let expected = model.lengths.intergenic.through_score(600).unwrap();
        assert_abs_diff_eq!(score, expected, epsilon = 1e-9);
        assert!(parser.genes().unwrap().is_empty());
        // both strands end in the same intergenic score
        assert_abs_diff_eq!(
            parser.combined_score().unwrap(),
            expected + 2f64.ln(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_single_orf_gives_one_single_exon_gene() {
        let model = gcc_model();
        let contig = single_orf(200);
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        parser.run();

        let genes = parser.genes().unwrap();
        assert_eq!(genes.len(), 1);
        let gene = &genes[0];
        assert_eq!(gene.strand, Strand::Forward);
        assert_eq!(gene.exons.len(), 1);
        assert_eq!(gene.exons[0].range, Interval::new(200, 499));
        assert!(!gene.exons[0].splice_left && !gene.exons[0].splice_right);
        assert_eq!(gene.start_codon, Some(Interval::new(200, 202)));
        assert_eq!(gene.stop_codon, Some(Interval::new(497, 499)));
        assert_eq!(gene.reading_frame, Interval::new(200, 499));
        assert!(!gene.is_partial());
        assert!(gene.premature_stops.is_empty());

        let kinds: Vec<StateKind> = parser.path().unwrap().iter().map(|state| state.kind()).collect();
        assert_eq!(
            kinds,
            vec![StateKind::Intergenic, StateKind::SingleExon, StateKind::Intergenic]
        );
    }

    #[test]
    fn test_score_decomposition_sums_to_state_scores() {
        let model = gcc_model();
        let contig = single_orf(150);
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        let score = parser.run();

        let states = parser.states().unwrap();
        let path = parser.path().unwrap();
        for state in &path {
            let previous = state.left.map_or(0.0, |left| states[left].score);
            assert_abs_diff_eq!(state.score - previous, state.parts.total(), epsilon = 1e-9);
        }
        let records = parser.state_scores().unwrap();
        let total: f64 = records.iter().map(|record| record.parts.total()).sum();
        assert_abs_diff_eq!(total, score, epsilon = 1e-9);
        assert_abs_diff_eq!(records.last().unwrap().score, score, epsilon = 1e-9);
    }

    #[test]
    fn test_run_is_idempotent() {
        let model = gcc_model();
        let contig = single_orf(120);
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);

        let first = parser.run();
        let first_genes = parser.genes().unwrap();
        let first_states = parser.state_scores().unwrap();
        let second = parser.run();

        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(first_genes, parser.genes().unwrap());
        assert_eq!(first_states, parser.state_scores().unwrap());
    }

    #[test]
    fn test_open_edges_cut_partial_gene() {
        let model = gcc_model();
        // ORF body without start and stop, running off both edges
        let mut contig = Vec::new();
        for _ in 0..100 {
            contig.extend_from_slice(b"GCC");
        }
        let config = EngineConfig {
            left_wall: false,
            right_wall: false,
            ..Default::default()
        };
        let scores = SeqScores::new(&model, &config, &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        parser.run();

        let genes = parser.genes().unwrap();
        assert_eq!(genes.len(), 1);
        let gene = &genes[0];
        assert!(gene.open_left && gene.open_right);
        assert_eq!(gene.start_codon, None);
        assert_eq!(gene.stop_codon, None);
        assert_eq!(gene.reading_frame, Interval::new(0, 299));
    }

    #[test]
    fn test_left_anchor_bonus_is_not_reported() {
        let model = ModelSet::uniform();
        let contig = vec![b'C'; 300];
        let config = EngineConfig {
            left_anchor: true,
            ..Default::default()
        };
        let scores = SeqScores::new(&model, &config, &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        let score = parser.run();

        let path = parser.path().unwrap();
        assert_eq!(path[0].parts.anchor, ANCHOR_BONUS);
        let expected = model.lengths.intergenic.through_score(300).unwrap();
        assert_abs_diff_eq!(score, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_supporting_alignment_is_attached() {
        let model = gcc_model();
        let contig = single_orf(200);
        let mut mrna = AlignModel::new(Strand::Forward, EvidenceKind::Mrna, vec![AlignExon::new(150, 560)])
            .with_cds(Interval::new(200, 499));
        mrna.exons[0].identity = 0.97;
        let minus = AlignModel::new(Strand::Reverse, EvidenceKind::Est, vec![AlignExon::new(300, 400)]);

        let evidence = [minus, mrna];
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &evidence).unwrap();
        let mut parser = Parser::new(&scores);
        parser.run();

        let genes = parser.genes().unwrap();
        assert_eq!(genes.len(), 1);
        assert_eq!(genes[0].support, vec![1]);
        assert_abs_diff_eq!(genes[0].exons[0].identity, 0.97);
    }

    /// Reverse complement of [`single_orf`]
    fn minus_orf(flank: usize) -> Vec<u8> {
        single_orf(flank)
            .iter()
            .rev()
            .map(|&base| match base {
                b'A' => b'T',
                b'C' => b'G',
                b'G' => b'C',
                _ => b'A',
            })
            .collect()
    }

    #[test]
    fn test_minus_strand_orf_gives_one_single_exon_gene() {
        let model = gcc_model();
        let contig = minus_orf(200);
        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        parser.run();

        let genes = parser.genes().unwrap();
        assert_eq!(genes.len(), 1);
        let gene = &genes[0];
        assert_eq!(gene.strand, Strand::Reverse);
        assert_eq!(gene.exons.len(), 1);
        assert_eq!(gene.exons[0].range, Interval::new(200, 499));
        assert_eq!(gene.start_codon, Some(Interval::new(497, 499)));
        assert_eq!(gene.stop_codon, Some(Interval::new(200, 202)));
        assert_eq!(gene.reading_frame, Interval::new(200, 499));
        assert!(gene.premature_stops.is_empty());

        let path = parser.path().unwrap();
        assert_eq!(path[1].kind(), StateKind::SingleExon);
        assert_eq!(path[1].strand(), Strand::Reverse);
    }

    #[test]
    fn test_two_exon_gene_is_spliced() {
        let model = gcc_model();
        // ATG + 49 codons, GT..AG intron of 150 bp, 49 codons + TAA
        let mut contig = vec![b'T'; 200];
        contig.extend_from_slice(b"ATG");
        for _ in 0..49 {
            contig.extend_from_slice(b"GCC");
        }
        contig.extend_from_slice(b"GT");
        contig.extend(std::iter::repeat_n(b'T', 146));
        contig.extend_from_slice(b"AG");
        for _ in 0..49 {
            contig.extend_from_slice(b"GCC");
        }
        contig.extend_from_slice(b"TAA");
        contig.extend(std::iter::repeat_n(b'T', 200));

        let scores = SeqScores::new(&model, &EngineConfig::default(), &contig, whole(&contig), &[]).unwrap();
        let mut parser = Parser::new(&scores);
        parser.run();

        let kinds: Vec<StateKind> = parser.path().unwrap().iter().map(|state| state.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StateKind::Intergenic,
                StateKind::FirstExon,
                StateKind::Intron,
                StateKind::LastExon,
                StateKind::Intergenic
            ]
        );

        let genes = parser.genes().unwrap();
        assert_eq!(genes.len(), 1);
        let gene = &genes[0];
        assert_eq!(gene.strand, Strand::Forward);
        assert_eq!(gene.exons.len(), 2);
        assert_eq!(gene.exons[0].range, Interval::new(200, 349));
        assert!(!gene.exons[0].splice_left && gene.exons[0].splice_right);
        assert_eq!(gene.exons[1].range, Interval::new(500, 649));
        assert!(gene.exons[1].splice_left && !gene.exons[1].splice_right);
        assert_eq!(gene.start_codon, Some(Interval::new(200, 202)));
        assert_eq!(gene.stop_codon, Some(Interval::new(647, 649)));
        assert_eq!(gene.reading_frame, Interval::new(200, 649));
        assert!(gene.premature_stops.is_empty());
    }

    /// Strong ORF at 200..499, T gap, a 40-codon ORF with `good` GCC codons, T tail
    fn strong_and_weak_orf(gap: usize, good: usize, tail: usize) -> Vec<u8> {
        let mut contig = vec![b'T'; 200];
        contig.extend(single_orf(0));
        contig.extend(std::iter::repeat_n(b'T', gap));
        contig.extend_from_slice(b"ATG");
        for codon in 0..38 {
            contig.extend_from_slice(if codon < good { b"GCC" } else { b"AAA" });
        }
        contig.extend_from_slice(b"TAA");
        contig.extend(std::iter::repeat_n(b'T', tail));
        contig
    }

    #[test]
    fn test_too_far_pruning_keeps_best_parse() {
        let model = gcc_model();
        let run = |contig: &[u8], too_far_len: Pos| {
            let config = EngineConfig {
                too_far_len,
                ..Default::default()
            };
            let scores = SeqScores::new(&model, &config, contig, whole(contig), &[]).unwrap();
            let mut parser = Parser::new(&scores);
            let score = parser.run();
            (score, parser.genes().unwrap())
        };

        for gap in [600, 900] {
            for good in [5, 13, 25] {
                for tail in [5, 60] {
                    let contig = strong_and_weak_orf(gap, good, tail);
                    let (pruned, pruned_genes) = run(&contig, DEFAULT_TOO_FAR_LEN);
                    let (full, full_genes) = run(&contig, Pos::MAX);
                    assert_abs_diff_eq!(pruned, full, epsilon = 1e-9);
                    assert_eq!(pruned_genes, full_genes, "gap {gap}, good {good}, tail {tail}");
                }
            }
        }
    }

    #[test]
    fn test_log_sum_exp() {
        assert_eq!(log_sum_exp(&[]), BAD_SCORE);
        assert_eq!(log_sum_exp(&[BAD_SCORE]), BAD_SCORE);
        assert_abs_diff_eq!(log_sum_exp(&[0.0, 0.0]), 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(log_sum_exp(&[-1000.0, 0.0]), 0.0, epsilon = 1e-12);
    }
}
