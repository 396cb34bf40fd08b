use serde::{Deserialize, Serialize};

use crate::types::{GnomonError, Pos};

const fn unit_step() -> Pos {
    1
}

/// Serialized Lorentz parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LorentzData {
    pub min: Pos,
    pub max: Pos,
    /// Bin width of the precomputed tables.
    #[serde(default = "unit_step")]
    pub step: Pos,
    /// Most likely length.
    pub peak: f64,
    /// Half width at half maximum.
    pub width: f64,
}

/// Lorentz-shaped length distribution with precomputed score tables.
///
/// `p(l) ∝ 1 / (1 + ((l - peak) / width)^2)` on `[min, max]`. Three scores
/// are exposed:
///
/// - [`score`](Self::score): exact length, both ends of the segment known;
/// - [`closing_score`](Self::closing_score): one end is cut by the window,
///   so the segment is at least this long;
/// - [`through_score`](Self::through_score): both ends are cut, the
///   probability that a random segment covers a window of this length.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::model::lorentz::LengthDistribution;
///
/// let lengths = LengthDistribution::new(10, 1000, 1, 200.0, 100.0)?;
/// assert!(lengths.score(200).unwrap() > lengths.score(900).unwrap());
/// assert!(lengths.score(5).is_none());
/// assert_eq!(lengths.closing_score(5), Some(0.0));
/// assert!(lengths.through_score(1001).is_none());
/// # Ok::<(), gnomon_core::types::GnomonError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LorentzData", into = "LorentzData")]
pub struct LengthDistribution {
    params: LorentzData,
    score: Vec<f64>,
    /// `P(l >= bin start)`
    tail: Vec<f64>,
    /// `sum_{l >= bin start} l p(l)`
    tail_moment: Vec<f64>,
    mean: f64,
    max_score: f64,
}

impl TryFrom<LorentzData> for LengthDistribution {
    type Error = GnomonError;

    fn try_from(params: LorentzData) -> Result<Self, Self::Error> {
        if params.min < 1 || params.max < params.min || params.step < 1 {
            return Err(GnomonError::InvalidModel(format!(
                "length range [{}, {}] step {} is invalid",
                params.min, params.max, params.step
            )));
        }
        if !(params.width.is_finite() && params.width > 0.0 && params.peak.is_finite()) {
            return Err(GnomonError::InvalidModel(
                "Lorentz width must be positive".to_string(),
            ));
        }

        let density = |l: Pos| {
            let x = (f64::from(l) - params.peak) / params.width;
            1.0 / (1.0 + x * x)
        };

        let bins = ((params.max - params.min) / params.step + 1) as usize;
        let mut mass = Vec::with_capacity(bins);
        let mut moment = Vec::with_capacity(bins);
        let mut widths = Vec::with_capacity(bins);
        for bin in 0..bins {
            let first = params.min + bin as Pos * params.step;
            let last = (first + params.step - 1).min(params.max);
            let (m, lm) = (first..=last).fold((0.0, 0.0), |(m, lm), l| {
                let p = density(l);
                (m + p, lm + f64::from(l) * p)
            });
            mass.push(m);
            moment.push(lm);
            widths.push(f64::from(last - first + 1));
        }

        let total: f64 = mass.iter().sum();
        let mut tail = vec![0.0; bins];
        let mut tail_moment = vec![0.0; bins];
        let (mut acc, mut acc_moment) = (0.0, 0.0);
        for bin in (0..bins).rev() {
            acc += mass[bin] / total;
            acc_moment += moment[bin] / total;
            tail[bin] = acc;
            tail_moment[bin] = acc_moment;
        }

        let score: Vec<f64> = mass
            .iter()
            .zip(&widths)
            .map(|(m, w)| (m / total / w).ln())
            .collect();
        let max_score = score.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            mean: tail_moment[0],
            params,
            score,
            tail,
            tail_moment,
            max_score,
        })
    }
}

impl From<LengthDistribution> for LorentzData {
    fn from(distribution: LengthDistribution) -> Self {
        distribution.params
    }
}

impl LengthDistribution {
    pub fn new(min: Pos, max: Pos, step: Pos, peak: f64, width: f64) -> Result<Self, GnomonError> {
        Self::try_from(LorentzData {
            min,
            max,
            step,
            peak,
            width,
        })
    }

    #[must_use]
    pub const fn min(&self) -> Pos {
        self.params.min
    }

    #[must_use]
    pub const fn max(&self) -> Pos {
        self.params.max
    }

    /// Best exact-length score, used as an upper bound when pruning
    #[must_use]
    pub const fn max_score(&self) -> f64 {
        self.max_score
    }

    fn bin(&self, len: Pos) -> usize {
        ((len - self.params.min) / self.params.step) as usize
    }

    /// `ln p(len)`
    #[must_use]
    pub fn score(&self, len: Pos) -> Option<f64> {
        (self.params.min..=self.params.max)
            .contains(&len)
            .then(|| self.score[self.bin(len)])
    }

    /// `ln P(l >= len)`
    #[must_use]
    pub fn closing_score(&self, len: Pos) -> Option<f64> {
        if len > self.params.max {
            None
        } else if len <= self.params.min {
            Some(0.0)
        } else {
            Some(self.tail[self.bin(len)].ln())
        }
    }

    /// `ln( sum_{l >= len} (l - len + 1) p(l) / mean )`
    #[must_use]
    pub fn through_score(&self, len: Pos) -> Option<f64> {
        if len > self.params.max {
            return None;
        }
        let shift = f64::from(len.max(1) - 1);
        let covering = if len <= self.params.min {
            self.mean - shift
        } else {
            let bin = self.bin(len);
            self.tail_moment[bin] - shift * self.tail[bin]
        };
        (covering > 0.0).then(|| (covering / self.mean).ln())
    }
}
