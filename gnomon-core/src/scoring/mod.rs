//! Per-position score and constraint tables for one prediction window.
//!
//! [`SeqScores`] turns the window's residues, its evidence and a
//! [`ModelSet`] into tables that answer every question the dynamic program
//! asks in O(1):
//!
//! - coding log-odds of any segment in any frame (prefix sums per strand and
//!   frame residue);
//! - normalized signal scores at candidate boundaries;
//! - whether a segment is free of in-frame stops, repeats and evidence
//!   conflicts (running-maximum blocker tables);
//! - how many protein alignments start inside a segment.
//!
//! All coordinates are edited-window coordinates (see
//! [`crate::sequence::SeqMap`]). A state "ends at `s`" when `s` is its last
//! base; the signal that terminates it is located relative to `s` as
//! described in [`Signal::anchor`].

pub mod tables;
pub mod terminals;

use std::collections::HashSet;

use bio::bio_types::strand::Strand;
use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::constants::{READING_FRAMES, STRANDS_COUNT};
use crate::evidence::{AlignModel, EvidenceKind, check_cds_intersections};
use crate::model::ModelSet;
use crate::sequence::{EncodedSequence, SeqMap, is_stop_codon};
use crate::types::{GnomonError, Interval, Pos, STRANDS, strand_index};

pub use tables::{BlockerTable, Cumulative, PrefixCount};
pub use terminals::{Consensus, Signal};

use tables::{alloc_filled, try_array};

/// Codon position of `pos` in the reading frame with residue `frame`
#[inline]
#[must_use]
pub const fn codon_position(strand: Strand, frame: usize, pos: Pos) -> usize {
    let frame = frame as Pos;
    match strand {
        Strand::Reverse => (frame - pos).rem_euclid(3) as usize,
        _ => (pos - frame).rem_euclid(3) as usize,
    }
}

/// Score and constraint tables of one window.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::config::EngineConfig;
/// use gnomon_core::model::ModelSet;
/// use gnomon_core::scoring::{SeqScores, Signal};
/// use gnomon_core::types::Interval;
/// use bio::bio_types::strand::Strand;
///
/// let model = ModelSet::uniform();
/// let contig = b"TTTTTTTTTTATGAAATAATTTTTTTTTTTT";
/// let window = Interval::new(0, contig.len() as i32 - 1);
/// let scores = SeqScores::new(&model, &EngineConfig::default(), contig, window, &[])?;
///
/// // intergenic state ending at 9 is followed by ATG
/// assert_eq!(scores.terminal(Signal::Start, Strand::Forward, 9), Some(0.0));
/// assert_eq!(scores.terminal(Signal::Start, Strand::Forward, 8), None);
/// # Ok::<(), gnomon_core::types::GnomonError>(())
/// ```
#[derive(Debug)]
pub struct SeqScores<'m> {
    model: &'m ModelSet,
    config: EngineConfig,
    seq: EncodedSequence,
    map: SeqMap,
    evidence: Vec<(usize, AlignModel)>,
    coding: [[Cumulative; READING_FRAMES]; STRANDS_COUNT],
    noncoding: [Cumulative; STRANDS_COUNT],
    terminals: [[Vec<Option<f64>>; STRANDS_COUNT]; 4],
    stops: [[BlockerTable; READING_FRAMES]; STRANDS_COUNT],
    not_in_exon: [BlockerTable; STRANDS_COUNT],
    not_in_intron: [BlockerTable; STRANDS_COUNT],
    not_in_intergenic: BlockerTable,
    protein_starts: [PrefixCount; STRANDS_COUNT],
}

impl<'m> SeqScores<'m> {
    /// Build every table for `contig[window]`.
    ///
    /// # Errors
    ///
    /// - [`GnomonError::InvalidWindow`] if the window is not inside the contig
    /// - [`GnomonError::IntersectingCds`] if two alignments in the window
    ///   carry overlapping coding ranges
    /// - [`GnomonError::MemoryLimit`] if the tables cannot be allocated
    pub fn new(
        model: &'m ModelSet,
        config: &EngineConfig,
        contig: &[u8],
        window: Interval,
        evidence: &[AlignModel],
    ) -> Result<Self, GnomonError> {
        if window.start < 0 || window.is_empty() || window.end as usize >= contig.len() {
            return Err(GnomonError::InvalidWindow {
                start: window.start,
                end: window.end,
                length: contig.len(),
            });
        }

        let in_window: Vec<(usize, &AlignModel)> = evidence
            .iter()
            .enumerate()
            .filter(|(_, model)| {
                let inside = model.limits().is_some_and(|limits| window.includes(&limits));
                if !inside {
                    warn!(
                        "Alignment '{}' is outside window {window}; skipped",
                        model.name
                    );
                }
                inside
            })
            .collect();

        let owned: Vec<AlignModel> = in_window.iter().map(|(_, model)| (*model).clone()).collect();
        check_cds_intersections(&owned).map_err(|err| match err {
            GnomonError::IntersectingCds { first, second } => GnomonError::IntersectingCds {
                first: in_window[first].0,
                second: in_window[second].0,
            },
            other => other,
        })?;

        let shifts: Vec<_> = in_window
            .iter()
            .flat_map(|(_, model)| model.frameshifts.iter().cloned())
            .collect();
        let (map, edited) = SeqMap::build(contig, window, &shifts);
        let seq = EncodedSequence::new(&edited)?;
        let len = seq.len();

        let evidence: Vec<(usize, AlignModel)> = in_window
            .iter()
            .filter_map(|&(index, model)| {
                let mapped = map.alignment_to_edited(model);
                if mapped.is_none() {
                    warn!("Alignment '{}' lost its exons after editing; skipped", model.name);
                }
                mapped.map(|mapped| (index, mapped))
            })
            .collect();

        info!(
            "Scoring window {window} ({len} bp edited, {} alignments)",
            evidence.len()
        );

        let background: Vec<Vec<f64>> = STRANDS
            .iter()
            .map(|&strand| {
                let mut scores = alloc_filled(len, 0.0)?;
                for (i, score) in scores.iter_mut().enumerate() {
                    *score = model.noncoding.score_at(&seq, strand, i as Pos);
                }
                Ok(scores)
            })
            .collect::<Result<_, GnomonError>>()?;

        let noncoding: [Cumulative; STRANDS_COUNT] =
            try_array(|st| Cumulative::from_scores(len, |i| background[st][i]))?;
        let coding: [[Cumulative; READING_FRAMES]; STRANDS_COUNT] = try_array(|st| {
            let strand = STRANDS[st];
            try_array(|frame| {
                Cumulative::from_scores(len, |i| {
                    let pos = i as Pos;
                    model
                        .coding
                        .score_at(&seq, strand, pos, codon_position(strand, frame, pos))
                        - background[st][i]
                })
            })
        })?;

        let mut scores = Self {
            model,
            config: config.clone(),
            map,
            evidence,
            coding,
            noncoding,
            terminals: try_array(|_| try_array(|_| alloc_filled(len, None)))?,
            stops: try_array(|_| try_array(|_| BlockerTable::new(len)))?,
            not_in_exon: try_array(|_| BlockerTable::new(len))?,
            not_in_intron: try_array(|_| BlockerTable::new(len))?,
            not_in_intergenic: BlockerTable::new(len)?,
            protein_starts: try_array(|_| PrefixCount::new(len, &[]))?,
            seq,
        };

        scores.record_stops();
        scores.record_masks();
        scores.record_evidence()?;
        scores.finish_blockers();
        scores.score_terminals();

        Ok(scores)
    }

    fn record_stops(&mut self) {
        let tolerated: HashSet<(usize, Pos)> = self
            .evidence
            .iter()
            .flat_map(|(_, model)| {
                let st = strand_index(model.strand);
                model.premature_stops.iter().map(move |&pos| (st, pos))
            })
            .collect();

        let len = self.len();
        for j in 0..len.saturating_sub(2) {
            if let Some(codon) = self.seq.bio_kmer::<3>(Strand::Forward, j) {
                if is_stop_codon(codon) && !tolerated.contains(&(0, j)) {
                    self.stops[0][j.rem_euclid(3) as usize].record(j + 2, j);
                }
            }
            if let Some(codon) = self.seq.bio_kmer::<3>(Strand::Reverse, j + 2) {
                if is_stop_codon(codon) && !tolerated.contains(&(1, j)) {
                    self.stops[1][(j + 2).rem_euclid(3) as usize].record(j + 2, j);
                }
            }
        }
    }

    fn record_masks(&mut self) {
        let coding_ranges: Vec<Interval> = self
            .evidence
            .iter()
            .filter_map(|(_, model)| model.cds)
            .collect();

        if self.config.mask_repeats {
            debug!("{} soft-masked residues", self.seq.repeat_count());
        }
        let mut masked = 0usize;
        for i in 0..self.seq.len() {
            let blocked = (self.config.mask_repeats && self.seq.is_repeat(i)) || self.seq.in_n_run(i);
            let pos = i as Pos;
            if !blocked || coding_ranges.iter().any(|cds| cds.contains(pos)) {
                continue;
            }
            masked += 1;
            for table in self.stops.iter_mut().flatten() {
                table.record(pos, pos);
            }
        }
        if masked > 0 {
            debug!("{masked} masked positions closed for coding");
        }
    }

    fn record_evidence(&mut self) -> Result<(), GnomonError> {
        let mut protein_starts: [Vec<Pos>; STRANDS_COUNT] = [Vec::new(), Vec::new()];

        for (_, model) in &self.evidence {
            let Some(limits) = model.limits() else {
                continue;
            };
            let st = strand_index(model.strand);

            match model.kind {
                EvidenceKind::Nested => continue,
                EvidenceKind::Wall => {
                    for pos in [limits.start, limits.end] {
                        for table in self.not_in_exon.iter_mut().chain(self.not_in_intron.iter_mut()) {
                            table.record(pos, pos);
                        }
                    }
                    continue;
                }
                _ => {}
            }

            for exon in &model.exons {
                self.not_in_intron[st].record(exon.start, exon.end);
            }
            for intron in model.introns() {
                self.not_in_exon[st].record(intron.start, intron.end);
                if model.cds.is_some_and(|cds| cds.includes(&intron)) {
                    self.not_in_intergenic.record(intron.start, intron.end);
                }
            }

            if let Some(cds) = model.cds {
                self.not_in_intergenic.record(cds.start, cds.end);
                for (k, pos) in model.coding_positions().into_iter().enumerate() {
                    let codon_pos = (k % 3) as Pos;
                    let frame = match model.strand {
                        Strand::Reverse => (codon_pos + pos).rem_euclid(3),
                        _ => (pos - codon_pos).rem_euclid(3),
                    } as usize;
                    for (other, table) in self.stops[st].iter_mut().enumerate() {
                        if other != frame {
                            table.record(pos, pos);
                        }
                    }
                    self.not_in_exon[1 - st].record(pos, pos);
                }
            }

            if model.kind.is_protein() {
                protein_starts[st].push(limits.start);
            }
        }

        let len = self.seq.len();
        self.protein_starts = try_array(|st| PrefixCount::new(len, &protein_starts[st]))?;
        Ok(())
    }

    fn finish_blockers(&mut self) {
        self.stops
            .iter_mut()
            .flatten()
            .chain(self.not_in_exon.iter_mut())
            .chain(self.not_in_intron.iter_mut())
            .chain(std::iter::once(&mut self.not_in_intergenic))
            .for_each(BlockerTable::finish);
    }

    /// Boundaries confirmed by an evidence intron: (signal, strand, state end)
    fn confirmed_splices(&self) -> HashSet<(Signal, usize, Pos)> {
        let mut confirmed = HashSet::new();
        for (_, model) in &self.evidence {
            if !model.kind.shapes_genes() {
                continue;
            }
            let st = strand_index(model.strand);
            for intron in model.introns() {
                let (left, right) = match model.strand {
                    Strand::Reverse => (Signal::Acceptor, Signal::Donor),
                    _ => (Signal::Donor, Signal::Acceptor),
                };
                confirmed.insert((left, st, intron.start - 1));
                confirmed.insert((right, st, intron.end));
            }
        }
        confirmed
    }

    fn score_terminals(&mut self) {
        let confirmed = self.confirmed_splices();
        let len = self.len();
        let mut candidates = 0usize;

        for signal in Signal::ALL {
            let model = signal.model(self.model);
            for (st, &strand) in STRANDS.iter().enumerate() {
                for s in 0..len {
                    let anchor = signal.anchor(strand, s);
                    let statistical = terminals::consensus(signal, &self.seq, strand, anchor)
                        .filter(|consensus| {
                            *consensus == Consensus::Canonical || self.config.allow_gc_donors
                        })
                        .and_then(|consensus| {
                            let score = terminals::normalized_score(
                                model,
                                &self.seq,
                                &self.noncoding[st],
                                strand,
                                anchor,
                            )?;
                            let score = match consensus {
                                Consensus::Minor => score - self.config.non_consensus_penalty,
                                Consensus::Canonical => score,
                            };
                            model
                                .threshold()
                                .is_none_or(|threshold| score >= threshold)
                                .then_some(score)
                        });

                    let score = if confirmed.contains(&(signal, st, s)) {
                        Some(statistical.unwrap_or(0.0))
                    } else {
                        statistical
                    };
                    if score.is_some() {
                        candidates += 1;
                    }
                    self.terminals[signal.index()][st][s as usize] = score;
                }
            }
        }
        info!("{candidates} candidate signal positions");
    }

    /// Window length in edited coordinates
    #[must_use]
    pub fn len(&self) -> Pos {
        self.seq.len() as Pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    #[must_use]
    pub const fn model(&self) -> &'m ModelSet {
        self.model
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn sequence(&self) -> &EncodedSequence {
        &self.seq
    }

    #[must_use]
    pub const fn seq_map(&self) -> &SeqMap {
        &self.map
    }

    /// Alignments inside the window in edited coordinates, with their index
    /// in the caller's evidence list
    #[must_use]
    pub fn evidence(&self) -> &[(usize, AlignModel)] {
        &self.evidence
    }

    /// Score of the signal terminating a state that ends at `s`
    #[inline]
    #[must_use]
    pub fn terminal(&self, signal: Signal, strand: Strand, s: Pos) -> Option<f64> {
        usize::try_from(s)
            .ok()
            .and_then(|i| self.terminals[signal.index()][strand_index(strand)].get(i))
            .copied()
            .flatten()
    }

    /// Coding log-odds of `[a, s]` in `frame`
    #[inline]
    #[must_use]
    pub fn coding_score(&self, strand: Strand, frame: usize, a: Pos, s: Pos) -> f64 {
        self.coding[strand_index(strand)][frame].range(a, s)
    }

    /// Non-coding log-probability of `[a, s]`
    #[inline]
    #[must_use]
    pub fn noncoding_score(&self, strand: Strand, a: Pos, s: Pos) -> f64 {
        self.noncoding[strand_index(strand)].range(a, s)
    }

    /// Largest left coordinate of a blocking stop (or masked base) at or before `s`
    #[inline]
    #[must_use]
    pub fn last_stop(&self, strand: Strand, frame: usize, s: Pos) -> Pos {
        self.stops[strand_index(strand)][frame].last(s)
    }

    #[inline]
    #[must_use]
    pub fn exon_allowed(&self, strand: Strand, a: Pos, s: Pos) -> bool {
        self.not_in_exon[strand_index(strand)].is_open(a, s)
    }

    #[inline]
    #[must_use]
    pub fn intron_allowed(&self, strand: Strand, a: Pos, s: Pos) -> bool {
        self.not_in_intron[strand_index(strand)].is_open(a, s)
    }

    #[inline]
    #[must_use]
    pub fn intergenic_allowed(&self, a: Pos, s: Pos) -> bool {
        self.not_in_intergenic.is_open(a, s)
    }

    /// Protein alignments starting inside `[a, s]`
    #[inline]
    #[must_use]
    pub fn protein_starts(&self, strand: Strand, a: Pos, s: Pos) -> i32 {
        self.protein_starts[strand_index(strand)].count(a, s)
    }

    /// A stop codon is formed across the intron between an exon ending at
    /// `exon_end` and the next exon starting at `next_start`.
    ///
    /// `intron_phase` is the codon position of `next_start`.
    #[must_use]
    pub fn is_split_stop(
        &self,
        strand: Strand,
        exon_end: Pos,
        next_start: Pos,
        intron_phase: u8,
    ) -> bool {
        let codon = match (strand, intron_phase) {
            (Strand::Reverse, 0) => [next_start, exon_end, exon_end - 1],
            (Strand::Reverse, 1) => [next_start + 1, next_start, exon_end],
            (Strand::Reverse, _) => return false,
            (_, 1) => [exon_end, next_start, next_start + 1],
            (_, 2) => [exon_end - 1, exon_end, next_start],
            _ => return false,
        };
        let residues = codon.map(|pos| self.seq.residue(strand, pos));
        is_stop_codon(residues)
    }
}
