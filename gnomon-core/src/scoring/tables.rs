use crate::types::{GnomonError, Pos};

/// Allocate a table up front, surfacing allocation failure as an error
pub(crate) fn alloc_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, GnomonError> {
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| GnomonError::MemoryLimit(len.saturating_mul(std::mem::size_of::<T>())))?;
    table.resize(len, value);
    Ok(table)
}

/// Build `K` tables with a fallible constructor
pub(crate) fn try_array<T, const K: usize>(
    mut make: impl FnMut(usize) -> Result<T, GnomonError>,
) -> Result<[T; K], GnomonError> {
    let mut items = Vec::with_capacity(K);
    for i in 0..K {
        items.push(make(i)?);
    }
    match items.try_into() {
        Ok(array) => Ok(array),
        Err(_) => unreachable!("exactly K items were pushed"),
    }
}

/// Prefix sums of per-position scores.
///
/// `range(a, s)` is the sum over `[a, s]` in O(1).
#[derive(Debug, Clone)]
pub struct Cumulative {
    sums: Vec<f64>,
}

impl Cumulative {
    pub fn from_scores(len: usize, mut score: impl FnMut(usize) -> f64) -> Result<Self, GnomonError> {
        let mut sums = alloc_filled(len + 1, 0.0)?;
        for i in 0..len {
            sums[i + 1] = sums[i] + score(i);
        }
        Ok(Self { sums })
    }

    /// Sum over `[a, s]`; empty ranges sum to zero
    #[inline]
    #[must_use]
    pub fn range(&self, a: Pos, s: Pos) -> f64 {
        if s < a {
            return 0.0;
        }
        self.sums[s as usize + 1] - self.sums[a as usize]
    }
}

/// Prefix counts of marked positions.
#[derive(Debug, Clone)]
pub struct PrefixCount {
    counts: Vec<i32>,
}

impl PrefixCount {
    pub fn new(len: usize, marked: &[Pos]) -> Result<Self, GnomonError> {
        let mut counts = alloc_filled(len + 1, 0)?;
        for &pos in marked {
            if let Ok(i) = usize::try_from(pos) {
                if i < len {
                    counts[i + 1] += 1;
                }
            }
        }
        for i in 0..len {
            counts[i + 1] += counts[i];
        }
        Ok(Self { counts })
    }

    /// Marked positions in `[a, s]`
    #[inline]
    #[must_use]
    pub fn count(&self, a: Pos, s: Pos) -> i32 {
        if s < a {
            return 0;
        }
        self.counts[s as usize + 1] - self.counts[a as usize]
    }
}

/// Running-maximum table of blockers.
///
/// Each blocker is recorded as `(index, value)`: a region `[a, s]` with
/// `index <= s` and `value >= a` is closed. After [`finish`](Self::finish)
/// the table holds, at every position, the largest value recorded at or
/// before it, so openness is a single comparison.
///
/// - a stop codon at `j..j+2` is recorded as `(j + 2, j)`: closed when the
///   region contains the whole codon;
/// - a forbidden interval `[x, y]` is recorded as `(x, y)`: closed when the
///   region overlaps it.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::scoring::tables::BlockerTable;
///
/// let mut stops = BlockerTable::new(30)?;
/// stops.record(12, 10); // stop codon at 10..12
/// stops.finish();
///
/// assert!(stops.is_open(0, 11));
/// assert!(!stops.is_open(5, 20));
/// assert!(stops.is_open(11, 29));
/// # Ok::<(), gnomon_core::types::GnomonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BlockerTable {
    last: Vec<Pos>,
}

impl BlockerTable {
    pub fn new(len: usize) -> Result<Self, GnomonError> {
        Ok(Self {
            last: alloc_filled(len, -1)?,
        })
    }

    /// Record a blocker; indices past the end are ignored, indices before
    /// the start are clamped to it
    pub fn record(&mut self, index: Pos, value: Pos) {
        let Some(slot) = usize::try_from(index.max(0))
            .ok()
            .and_then(|i| self.last.get_mut(i))
        else {
            return;
        };
        *slot = (*slot).max(value);
    }

    /// Turn recorded blockers into running maxima
    pub fn finish(&mut self) {
        for i in 1..self.last.len() {
            self.last[i] = self.last[i].max(self.last[i - 1]);
        }
    }

    /// Largest blocker value recorded at or before `s`
    #[inline]
    #[must_use]
    pub fn last(&self, s: Pos) -> Pos {
        usize::try_from(s)
            .ok()
            .and_then(|i| self.last.get(i).copied())
            .unwrap_or(-1)
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self, a: Pos, s: Pos) -> bool {
        self.last(s) < a
    }
}
