use bio::bio_types::strand::Strand;

use crate::bitmap;
use crate::constants::MIN_N_RUN_LENGTH;
use crate::sequence::{N, complement, encode_base};
use crate::types::{GnomonError, Pos};

/// Residues of one prediction window on both strands.
///
/// Lower-case input marks repeats; runs of at least
/// [`MIN_N_RUN_LENGTH`] ambiguous residues are recorded separately so the
/// scorer can close them for coding.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::sequence::EncodedSequence;
/// use bio::bio_types::strand::Strand;
///
/// let seq = EncodedSequence::new(b"ATGccc")?;
/// assert_eq!(seq.len(), 6);
/// assert!(seq.is_repeat(3));
/// // the minus strand read from position 2 downward is C A T
/// assert_eq!(seq.bio_kmer::<3>(Strand::Reverse, 2), Some([1, 0, 3]));
/// # Ok::<(), gnomon_core::types::GnomonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EncodedSequence {
    plus: Vec<u8>,
    minus: Vec<u8>,
    repeats: Vec<u8>,
    n_runs: Vec<u8>,
}

impl EncodedSequence {
    pub fn new(raw: &[u8]) -> Result<Self, GnomonError> {
        let length = raw.len();
        let mut plus = Vec::with_capacity(length);
        let mut repeats = bitmap::with_capacity(length);
        let mut n_runs = bitmap::with_capacity(length);

        for (i, &c) in raw.iter().enumerate() {
            if !c.is_ascii_alphabetic() {
                return Err(GnomonError::InvalidSequence(format!(
                    "unexpected character '{}' at position {i}",
                    c.escape_ascii()
                )));
            }
            if c.is_ascii_lowercase() {
                bitmap::set_bit(&mut repeats, i);
            }
            plus.push(encode_base(c));
        }

        let mut run_start = 0;
        for i in 0..=length {
            if i < length && plus[i] == N {
                continue;
            }
            if i - run_start >= MIN_N_RUN_LENGTH {
                (run_start..i).for_each(|j| bitmap::set_bit(&mut n_runs, j));
            }
            run_start = i + 1;
        }

        let minus = plus.iter().map(|&residue| complement(residue)).collect();

        Ok(Self {
            plus,
            minus,
            repeats,
            n_runs,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plus.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plus.is_empty()
    }

    /// Residues of one strand in plus-strand coordinates
    #[must_use]
    pub fn strand(&self, strand: Strand) -> &[u8] {
        match strand {
            Strand::Reverse => &self.minus,
            _ => &self.plus,
        }
    }

    /// Residue at `pos`; positions outside the window read as N
    #[must_use]
    pub fn residue(&self, strand: Strand, pos: Pos) -> u8 {
        usize::try_from(pos)
            .ok()
            .and_then(|i| self.strand(strand).get(i).copied())
            .unwrap_or(N)
    }

    /// `K` residues in biological orientation starting at `first`.
    ///
    /// On the minus strand the k-mer is read toward lower coordinates.
    /// Returns `None` when any base falls outside the window.
    #[must_use]
    pub fn bio_kmer<const K: usize>(&self, strand: Strand, first: Pos) -> Option<[u8; K]> {
        let step: Pos = if strand == Strand::Reverse { -1 } else { 1 };
        let residues = self.strand(strand);
        let mut kmer = [N; K];
        for (j, slot) in kmer.iter_mut().enumerate() {
            let pos = usize::try_from(first + step * j as Pos).ok()?;
            *slot = *residues.get(pos)?;
        }
        Some(kmer)
    }

    #[must_use]
    pub fn is_repeat(&self, pos: usize) -> bool {
        bitmap::test_bit(&self.repeats, pos)
    }

    /// Number of soft-masked positions
    #[must_use]
    pub fn repeat_count(&self) -> usize {
        bitmap::count_range(&self.repeats, 0, self.len())
    }

    /// Position lies in a long run of ambiguous residues
    #[must_use]
    pub fn in_n_run(&self, pos: usize) -> bool {
        bitmap::test_bit(&self.n_runs, pos)
    }
}
