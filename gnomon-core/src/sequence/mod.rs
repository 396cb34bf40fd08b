//! Sequence encoding and coordinate utilities.
//!
//! ## Overview
//!
//! Residues are stored one per byte using a 5-symbol alphabet:
//! - A: 0
//! - C: 1
//! - G: 2
//! - T/U: 3
//! - anything else: 4 (N)
//!
//! Both strands are materialized in plus-strand coordinates: the minus-strand
//! array holds the complement of the plus-strand base at the same index, so a
//! minus-strand feature is read right to left.
//!
//! ## Modules
//!
//! - [`encoded`]: double-strand residue buffer with repeat and N masks
//! - [`edit`]: frameshift editing and the original/edited coordinate map
//! - [`io`]: FASTA file reading
//!
//! ## Examples
//!
//! ```rust
//! use gnomon_core::sequence::{encode_base, is_stop_codon, A, G, T};
//!
//! assert_eq!(encode_base(b'g'), G);
//! assert!(is_stop_codon([T, A, G]));
//! assert!(!is_stop_codon([A, T, G]));
//! ```

pub mod edit;
pub mod encoded;
pub mod io;

pub use edit::SeqMap;
pub use encoded::EncodedSequence;
pub use io::*;

pub const A: u8 = 0;
pub const C: u8 = 1;
pub const G: u8 = 2;
pub const T: u8 = 3;
pub const N: u8 = 4;

/// Converts a nucleotide character to its residue code.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::sequence::encode_base;
///
/// assert_eq!(encode_base(b'A'), 0);
/// assert_eq!(encode_base(b'u'), 3);
/// assert_eq!(encode_base(b'R'), 4);
/// ```
#[must_use]
pub const fn encode_base(c: u8) -> u8 {
    match c.to_ascii_uppercase() {
        b'A' => A,
        b'C' => C,
        b'G' => G,
        b'T' | b'U' => T,
        _ => N,
    }
}

/// Residue code back to an upper-case character
#[must_use]
pub const fn decode_base(residue: u8) -> u8 {
    match residue {
        A => b'A',
        C => b'C',
        G => b'G',
        T => b'T',
        _ => b'N',
    }
}

/// Complementary residue; N stays N
#[inline]
#[must_use]
pub const fn complement(residue: u8) -> u8 {
    if residue < N { T - residue } else { N }
}

/// TAA, TAG or TGA
#[must_use]
pub const fn is_stop_codon(codon: [u8; 3]) -> bool {
    matches!(codon, [T, A, A] | [T, A, G] | [T, G, A])
}

/// ATG
#[must_use]
pub const fn is_start_codon(codon: [u8; 3]) -> bool {
    matches!(codon, [A, T, G])
}

/// Fraction of G/C among unambiguous bases.
///
/// A sequence without any unambiguous base is reported as balanced (`0.5`).
///
/// # Examples
///
/// ```rust
/// use gnomon_core::sequence::gc_content;
///
/// assert_eq!(gc_content(b"GGCCAATT"), 0.5);
/// assert_eq!(gc_content(b"GCNNNN"), 1.0);
/// assert_eq!(gc_content(b"NNNN"), 0.5);
/// ```
#[must_use]
pub fn gc_content(sequence: &[u8]) -> f64 {
    let (gc, total) = sequence
        .iter()
        .map(|&c| encode_base(c))
        .filter(|&residue| residue != N)
        .fold((0usize, 0usize), |(gc, total), residue| {
            (gc + usize::from(residue == C || residue == G), total + 1)
        });

    if total == 0 {
        0.5
    } else {
        gc as f64 / total as f64
    }
}
