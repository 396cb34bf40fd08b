use bio::bio_types::strand::Strand;
use serde::{Deserialize, Serialize};

use crate::constants::ALPHABET_SIZE;
use crate::model::markov::{AMBIGUOUS_LOG_PROB, context_index, normalized_logs};
use crate::sequence::{EncodedSequence, N};
use crate::types::{GnomonError, Pos};

/// Serialized form of a weight-array matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalData {
    pub order: usize,
    /// Footprint bases before the signal anchor, biological orientation.
    pub offset: usize,
    /// Sites scoring below this normalized log-odds are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// One conditional table per footprint position.
    pub probabilities: Vec<Vec<f64>>,
}

/// Weight-array matrix scoring a splice, start or stop signal.
///
/// The footprint is `offset` bases before the anchor base (the first base of
/// the consensus in biological orientation) followed by the anchor and the
/// remaining positions. Each position has its own order-`k` conditional table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SignalData", into = "SignalData")]
pub struct SignalModel {
    order: usize,
    offset: usize,
    threshold: Option<f64>,
    log_probs: Vec<Vec<f64>>,
}

impl TryFrom<SignalData> for SignalModel {
    type Error = GnomonError;

    fn try_from(data: SignalData) -> Result<Self, Self::Error> {
        if data.offset >= data.probabilities.len() {
            return Err(GnomonError::InvalidModel(format!(
                "signal offset {} outside footprint of {} positions",
                data.offset,
                data.probabilities.len()
            )));
        }
        let log_probs = data
            .probabilities
            .iter()
            .map(|table| normalized_logs(data.order, table))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            order: data.order,
            offset: data.offset,
            threshold: data.threshold,
            log_probs,
        })
    }
}

impl From<SignalModel> for SignalData {
    fn from(model: SignalModel) -> Self {
        Self {
            order: model.order,
            offset: model.offset,
            threshold: model.threshold,
            probabilities: model
                .log_probs
                .iter()
                .map(|table| table.iter().map(|p| p.exp()).collect())
                .collect(),
        }
    }
}

impl SignalModel {
    /// Order-0 matrix with equal probabilities everywhere and no threshold
    #[must_use]
    pub fn uniform(length: usize, offset: usize) -> Self {
        Self {
            order: 0,
            offset,
            threshold: None,
            log_probs: vec![vec![AMBIGUOUS_LOG_PROB; ALPHABET_SIZE]; length],
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Number of footprint positions
    #[must_use]
    pub fn len(&self) -> usize {
        self.log_probs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log_probs.is_empty()
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// First footprint base for a signal anchored at `anchor`
    #[must_use]
    pub fn footprint_start(&self, strand: Strand, anchor: Pos) -> Pos {
        match strand {
            Strand::Reverse => anchor + self.offset as Pos,
            _ => anchor - self.offset as Pos,
        }
    }

    /// Raw log-probability of the footprint anchored at `anchor`.
    ///
    /// Returns `None` when the footprint or the context of its first bases
    /// leaves the window.
    #[must_use]
    pub fn raw_score(&self, seq: &EncodedSequence, strand: Strand, anchor: Pos) -> Option<f64> {
        let step: Pos = if strand == Strand::Reverse { -1 } else { 1 };
        let first = self.footprint_start(strand, anchor) - step * self.order as Pos;
        let span = self.order + self.len();
        let residues = seq.strand(strand);

        let mut window = Vec::with_capacity(span);
        for j in 0..span {
            let pos = usize::try_from(first + step * j as Pos).ok()?;
            window.push(*residues.get(pos)?);
        }

        let score = self
            .log_probs
            .iter()
            .enumerate()
            .map(|(j, table)| {
                let residue = window[self.order + j];
                match context_index(&window[j..self.order + j]) {
                    Some(row) if residue < N => table[row * ALPHABET_SIZE + residue as usize],
                    _ => AMBIGUOUS_LOG_PROB,
                }
            })
            .sum();
        Some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn donor_like() -> SignalModel {
        // 4-position order-0 matrix that strongly prefers G T at positions 1 and 2
        let mut probabilities = vec![vec![0.25; 4]; 4];
        probabilities[1] = vec![0.01, 0.01, 0.97, 0.01];
        probabilities[2] = vec![0.01, 0.01, 0.01, 0.97];
        SignalModel::try_from(SignalData {
            order: 0,
            offset: 1,
            threshold: Some(0.0),
            probabilities,
        })
        .unwrap()
    }

    #[test]
    fn test_footprint_orientation() {
        let model = donor_like();
        assert_eq!(model.footprint_start(Strand::Forward, 10), 9);
        assert_eq!(model.footprint_start(Strand::Reverse, 10), 11);
    }

    #[test]
    fn test_raw_score_prefers_consensus() {
        let model = donor_like();
        let seq = EncodedSequence::new(b"AAGTAA").unwrap();
        let good = model.raw_score(&seq, Strand::Forward, 2).unwrap();
        let bad = model.raw_score(&seq, Strand::Forward, 1).unwrap();
        assert!(good > bad);
        assert_abs_diff_eq!(
            good,
            2.0 * 0.25f64.ln() + 2.0 * 0.97f64.ln(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_raw_score_minus_strand() {
        let model = donor_like();
        // plus AC at 2..3 reads G T on the minus strand going left from 3
        let seq = EncodedSequence::new(b"TTACTT").unwrap();
        let score = model.raw_score(&seq, Strand::Reverse, 3).unwrap();
        assert_abs_diff_eq!(
            score,
            2.0 * 0.25f64.ln() + 2.0 * 0.97f64.ln(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_raw_score_out_of_window() {
        let model = donor_like();
        let seq = EncodedSequence::new(b"GTAA").unwrap();
        assert!(model.raw_score(&seq, Strand::Forward, 0).is_none());
        assert!(model.raw_score(&seq, Strand::Forward, 3).is_none());
    }

    #[test]
    fn test_offset_must_be_inside_footprint() {
        let data = SignalData {
            order: 0,
            offset: 3,
            threshold: None,
            probabilities: vec![vec![0.25; 4]; 3],
        };
        assert!(SignalModel::try_from(data).is_err());
    }
}
