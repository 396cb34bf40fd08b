use bio::bio_types::strand::Strand;
use serde::{Deserialize, Serialize};

use crate::constants::ALPHABET_SIZE;
use crate::sequence::{EncodedSequence, N};
use crate::types::{GnomonError, Pos};

/// Log-probability used for ambiguous residues and missing context
pub const AMBIGUOUS_LOG_PROB: f64 = -std::f64::consts::LN_2 * 2.0;

/// Highest supported chain order
pub const MAX_ORDER: usize = 8;

/// Serialized form of a Markov chain: conditional probabilities laid out as
/// `probabilities[context * 4 + residue]`, contexts enumerated oldest base
/// most significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainData {
    pub order: usize,
    pub probabilities: Vec<f64>,
}

/// Fixed-order Markov chain over A/C/G/T.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::model::markov::MarkovChain;
///
/// let chain = MarkovChain::uniform(2);
/// assert_eq!(chain.order(), 2);
/// assert!((chain.log_prob(&[0, 1], 3) - 0.25f64.ln()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ChainData", into = "ChainData")]
pub struct MarkovChain {
    order: usize,
    log_probs: Vec<f64>,
}

impl TryFrom<ChainData> for MarkovChain {
    type Error = GnomonError;

    fn try_from(data: ChainData) -> Result<Self, Self::Error> {
        let log_probs = normalized_logs(data.order, &data.probabilities)?;
        Ok(Self {
            order: data.order,
            log_probs,
        })
    }
}

impl From<MarkovChain> for ChainData {
    fn from(chain: MarkovChain) -> Self {
        Self {
            order: chain.order,
            probabilities: chain.log_probs.iter().map(|p| p.exp()).collect(),
        }
    }
}

/// Validate a conditional table and turn each context row into log-probabilities
pub(crate) fn normalized_logs(order: usize, probabilities: &[f64]) -> Result<Vec<f64>, GnomonError> {
    if order > MAX_ORDER {
        return Err(GnomonError::InvalidModel(format!(
            "order {order} exceeds maximum {MAX_ORDER}"
        )));
    }
    let expected = ALPHABET_SIZE.pow(order as u32 + 1);
    if probabilities.len() != expected {
        return Err(GnomonError::InvalidModel(format!(
            "order {order} table needs {expected} entries, found {}",
            probabilities.len()
        )));
    }
    if probabilities.iter().any(|&p| !p.is_finite() || p <= 0.0) {
        return Err(GnomonError::InvalidModel(
            "probabilities must be finite and positive".to_string(),
        ));
    }

    Ok(probabilities
        .chunks(ALPHABET_SIZE)
        .flat_map(|row| {
            let total: f64 = row.iter().sum();
            row.iter().map(move |p| (p / total).ln())
        })
        .collect())
}

/// Row index of a context; `None` if it holds an ambiguous residue
pub(crate) fn context_index(context: &[u8]) -> Option<usize> {
    context.iter().try_fold(0usize, |index, &residue| {
        (residue < N).then_some(index * ALPHABET_SIZE + residue as usize)
    })
}

impl MarkovChain {
    #[must_use]
    pub fn uniform(order: usize) -> Self {
        let size = ALPHABET_SIZE.pow(order as u32 + 1);
        Self {
            order,
            log_probs: vec![AMBIGUOUS_LOG_PROB; size],
        }
    }

    /// Chain built from explicit probabilities
    pub fn from_probabilities(order: usize, probabilities: Vec<f64>) -> Result<Self, GnomonError> {
        Self::try_from(ChainData {
            order,
            probabilities,
        })
    }

    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// `log P(residue | context)`; `context` holds the `order` preceding
    /// residues in biological order
    #[must_use]
    pub fn log_prob(&self, context: &[u8], residue: u8) -> f64 {
        if residue >= N {
            return AMBIGUOUS_LOG_PROB;
        }
        match context_index(context) {
            Some(row) => self.log_probs[row * ALPHABET_SIZE + residue as usize],
            None => AMBIGUOUS_LOG_PROB,
        }
    }

    /// Score of the residue at `pos` given its biological predecessors
    #[must_use]
    pub fn score_at(&self, seq: &EncodedSequence, strand: Strand, pos: Pos) -> f64 {
        let step: Pos = if strand == Strand::Reverse { -1 } else { 1 };
        let first = pos - step * self.order as Pos;
        let residues = seq.strand(strand);

        let mut context = [N; MAX_ORDER];
        let order = self.order;
        for (j, slot) in context[..order].iter_mut().enumerate() {
            match usize::try_from(first + step * j as Pos)
                .ok()
                .and_then(|i| residues.get(i))
            {
                Some(&residue) => *slot = residue,
                None => return AMBIGUOUS_LOG_PROB,
            }
        }
        self.log_prob(&context[..order], seq.residue(strand, pos))
    }
}

/// Three-periodic coding model: one chain per codon position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingModel {
    pub frames: [MarkovChain; 3],
}

impl CodingModel {
    #[must_use]
    pub fn uniform(order: usize) -> Self {
        Self {
            frames: [
                MarkovChain::uniform(order),
                MarkovChain::uniform(order),
                MarkovChain::uniform(order),
            ],
        }
    }

    /// Score of the base at `pos` when it occupies `codon_position`
    #[must_use]
    pub fn score_at(
        &self,
        seq: &EncodedSequence,
        strand: Strand,
        pos: Pos,
        codon_position: usize,
    ) -> f64 {
        self.frames[codon_position].score_at(seq, strand, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rows_are_normalized() {
        let chain = MarkovChain::from_probabilities(0, vec![2.0, 1.0, 1.0, 4.0]).unwrap();
        assert_abs_diff_eq!(chain.log_prob(&[], 0), 0.25f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(chain.log_prob(&[], 3), 0.5f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_tables() {
        assert!(matches!(
            MarkovChain::from_probabilities(1, vec![0.25; 4]),
            Err(GnomonError::InvalidModel(_))
        ));
        assert!(MarkovChain::from_probabilities(0, vec![0.5, 0.5, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_context_index() {
        assert_eq!(context_index(&[]), Some(0));
        assert_eq!(context_index(&[1, 2]), Some(6));
        assert_eq!(context_index(&[1, N]), None);
    }

    #[test]
    fn test_score_at_uses_strand_orientation() {
        // first order chain: P(T | A) high, everything else uniform
        let mut probabilities = vec![0.25; 16];
        probabilities[3] = 5.0;
        let chain = MarkovChain::from_probabilities(1, probabilities).unwrap();
        let seq = EncodedSequence::new(b"AT").unwrap();

        // plus strand: T at 1 preceded by A at 0
        let favored = chain.score_at(&seq, Strand::Forward, 1);
        assert!(favored > 0.25f64.ln());
        // minus strand: position 0 reads comp(A)=T preceded by comp(T)=A at 1
        assert_abs_diff_eq!(chain.score_at(&seq, Strand::Reverse, 0), favored, epsilon = 1e-12);
        // no context available at the window edge
        assert_abs_diff_eq!(chain.score_at(&seq, Strand::Forward, 0), AMBIGUOUS_LOG_PROB);
    }

    #[test]
    fn test_json_round_trip_keeps_probabilities() {
        let chain = MarkovChain::from_probabilities(0, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let json = serde_json::to_string(&chain).unwrap();
        let back: MarkovChain = serde_json::from_str(&json).unwrap();
        for residue in 0..4 {
            assert_abs_diff_eq!(
                back.log_prob(&[], residue),
                chain.log_prob(&[], residue),
                epsilon = 1e-12
            );
        }
    }
}
