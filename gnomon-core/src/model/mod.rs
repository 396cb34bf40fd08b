//! Statistical parameter models.
//!
//! A [`ModelSet`] bundles everything the scorer needs for one GC-content
//! bucket: signal matrices, coding and non-coding Markov chains, length
//! distributions and transition probabilities. Parameter sets are plain data
//! loaded from JSON; derived tables (log-probabilities, Lorentz score tables)
//! are built while deserializing, so a malformed file fails at load time.
//!
//! ## Examples
//!
//! ```rust
//! use gnomon_core::model::ModelSet;
//!
//! let model = ModelSet::uniform();
//! let json = serde_json::to_string(&model)?;
//! let back = ModelSet::from_json(&json)?;
//! assert_eq!(back.lengths.intron.min(), model.lengths.intron.min());
//! # Ok::<(), gnomon_core::types::GnomonError>(())
//! ```

pub mod lorentz;
pub mod markov;
pub mod registry;
pub mod signal;

use serde::{Deserialize, Serialize};

pub use lorentz::LengthDistribution;
pub use markov::{CodingModel, MarkovChain};
pub use registry::{GcBucket, ModelRegistry};
pub use signal::SignalModel;

use crate::constants::STRANDS_COUNT;
use crate::types::GnomonError;

/// Transition probabilities between state types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionProbabilities {
    /// Probability that a gene has a single exon.
    pub single_exon: f64,
    /// Probability that an intron is followed by the gene's last exon.
    pub last_exon: f64,
    /// Probability of each intron phase.
    pub intron_phase: [f64; 3],
    /// Probability that the next gene lies on the plus strand.
    pub plus_strand: f64,
}

impl Default for TransitionProbabilities {
    fn default() -> Self {
        Self {
            single_exon: 0.2,
            last_exon: 0.2,
            intron_phase: [0.5, 0.25, 0.25],
            plus_strand: 0.5,
        }
    }
}

/// Log-space transition scores derived from [`TransitionProbabilities`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TransitionProbabilities", into = "TransitionProbabilities")]
pub struct Transitions {
    probabilities: TransitionProbabilities,
    pub single_exon: f64,
    pub multi_exon: f64,
    pub to_internal: f64,
    pub to_last: f64,
    pub intron_phase: [f64; 3],
    /// Indexed by strand bucket.
    pub strand: [f64; STRANDS_COUNT],
}

impl TryFrom<TransitionProbabilities> for Transitions {
    type Error = GnomonError;

    fn try_from(probabilities: TransitionProbabilities) -> Result<Self, Self::Error> {
        let open_unit = |name: &str, p: f64| {
            if p > 0.0 && p < 1.0 {
                Ok(p)
            } else {
                Err(GnomonError::InvalidModel(format!(
                    "transition probability '{name}' must lie in (0, 1), found {p}"
                )))
            }
        };
        let single = open_unit("single_exon", probabilities.single_exon)?;
        let last = open_unit("last_exon", probabilities.last_exon)?;
        let plus = open_unit("plus_strand", probabilities.plus_strand)?;
        if probabilities.intron_phase.iter().any(|&p| !(p > 0.0)) {
            return Err(GnomonError::InvalidModel(
                "intron phase probabilities must be positive".to_string(),
            ));
        }
        let phase_total: f64 = probabilities.intron_phase.iter().sum();

        Ok(Self {
            single_exon: single.ln(),
            multi_exon: (1.0 - single).ln(),
            to_internal: (1.0 - last).ln(),
            to_last: last.ln(),
            intron_phase: probabilities.intron_phase.map(|p| (p / phase_total).ln()),
            strand: [plus.ln(), (1.0 - plus).ln()],
            probabilities,
        })
    }
}

impl From<Transitions> for TransitionProbabilities {
    fn from(transitions: Transitions) -> Self {
        transitions.probabilities
    }
}

impl Default for Transitions {
    fn default() -> Self {
        Self::try_from(TransitionProbabilities::default())
            .unwrap_or_else(|_| unreachable!("default transition probabilities are valid"))
    }
}

/// Length distribution per segment type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthModels {
    pub intergenic: LengthDistribution,
    pub intron: LengthDistribution,
    pub single_exon: LengthDistribution,
    pub first_exon: LengthDistribution,
    pub internal_exon: LengthDistribution,
    pub last_exon: LengthDistribution,
}

/// Complete parameter set for one GC bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSet {
    pub donor: SignalModel,
    pub acceptor: SignalModel,
    pub start: SignalModel,
    pub stop: SignalModel,
    pub coding: CodingModel,
    pub noncoding: MarkovChain,
    pub lengths: LengthModels,
    pub transitions: Transitions,
}

impl ModelSet {
    /// Neutral parameters: every chain and matrix uniform.
    ///
    /// All signal and region log-odds are zero, so parses are driven by the
    /// length distributions and transition probabilities alone. Useful as a
    /// template for real parameter files.
    #[must_use]
    pub fn uniform() -> Self {
        let lengths = |min, max, step, peak, width| {
            LengthDistribution::new(min, max, step, peak, width)
                .unwrap_or_else(|_| unreachable!("built-in length parameters are valid"))
        };

        Self {
            donor: SignalModel::uniform(9, 3),
            acceptor: SignalModel::uniform(14, 10),
            start: SignalModel::uniform(12, 6),
            stop: SignalModel::uniform(6, 0),
            coding: CodingModel::uniform(2),
            noncoding: MarkovChain::uniform(2),
            lengths: LengthModels {
                intergenic: lengths(1, 200_000, 10, 5_000.0, 4_000.0),
                intron: lengths(20, 100_000, 1, 150.0, 300.0),
                single_exon: lengths(6, 20_000, 1, 1_000.0, 800.0),
                first_exon: lengths(3, 10_000, 1, 150.0, 200.0),
                internal_exon: lengths(3, 10_000, 1, 120.0, 100.0),
                last_exon: lengths(3, 10_000, 1, 200.0, 300.0),
            },
            transitions: Transitions::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, GnomonError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, GnomonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
