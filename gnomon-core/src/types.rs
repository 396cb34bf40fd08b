use std::fmt;

use bio::bio_types::strand::Strand;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::STRANDS_COUNT;
use crate::evidence::FrameShift;

/// Sequence coordinate.
///
/// Signed so that `-1` can stand for "before the window" and for positions
/// that have no counterpart after frameshift editing.
pub type Pos = i32;

/// The two strands scored by the engine, in bucket order.
pub const STRANDS: [Strand; STRANDS_COUNT] = [Strand::Forward, Strand::Reverse];

/// Bucket index of a strand (`0` for plus, `1` for minus).
#[inline]
#[must_use]
pub const fn strand_index(strand: Strand) -> usize {
    match strand {
        Strand::Reverse => 1,
        _ => 0,
    }
}

/// One-character strand symbol used in text output.
#[must_use]
pub const fn strand_symbol(strand: Strand) -> char {
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::Unknown => '.',
    }
}

/// Serde adapter writing a [`Strand`] as `"+"` / `"-"`.
pub mod strand_serde {
    use bio::bio_types::strand::Strand;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(strand: &Strand, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buffer = [0u8; 4];
        serializer.serialize_str(super::strand_symbol(*strand).encode_utf8(&mut buffer))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Strand, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        match symbol.as_str() {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(D::Error::custom(format!("invalid strand '{other}'"))),
        }
    }
}

/// Closed interval `[start, end]` of sequence positions.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::types::Interval;
///
/// let exon = Interval::new(10, 39);
/// assert_eq!(exon.len(), 30);
/// assert!(exon.contains(10) && exon.contains(39));
/// assert_eq!(exon.intersection(&Interval::new(30, 100)), Some(Interval::new(30, 39)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: Pos,
    pub end: Pos,
}

impl Interval {
    #[must_use]
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Number of positions covered; zero or negative when empty
    #[must_use]
    pub const fn len(&self) -> Pos {
        self.end - self.start + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end < self.start
    }

    #[must_use]
    pub const fn contains(&self, pos: Pos) -> bool {
        self.start <= pos && pos <= self.end
    }

    #[must_use]
    pub const fn includes(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub const fn intersects(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    #[must_use]
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Interval { start, end })
    }

    #[must_use]
    pub const fn shifted(&self, by: Pos) -> Interval {
        Interval {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One exon of a predicted gene.
///
/// Coordinates are contig coordinates; splice flags tell whether the exon
/// boundary is an intron boundary (as opposed to a start/stop codon or a
/// window edge).
#[derive(Debug, Clone, PartialEq)]
pub struct Exon {
    pub range: Interval,
    pub splice_left: bool,
    pub splice_right: bool,
    /// Best identity among supporting alignments overlapping this exon,
    /// `0.0` when unsupported.
    pub identity: f64,
    /// Frameshifts applied inside this exon.
    pub frameshifts: Vec<FrameShift>,
}

/// A gene model produced by backtrace.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::types::{GeneModel, Interval};
/// use bio::bio_types::strand::Strand;
///
/// let gene = GeneModel::new(Strand::Forward);
/// assert!(gene.exons.is_empty());
/// assert!(!gene.is_partial());
/// assert_eq!(gene.reading_frame, Interval::new(0, -1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GeneModel {
    pub strand: Strand,
    /// Exons in increasing coordinate order.
    pub exons: Vec<Exon>,
    /// Coding range trimmed to whole codons, contig coordinates.
    pub reading_frame: Interval,
    /// Present when the gene begins with a scored start codon.
    pub start_codon: Option<Interval>,
    /// Present when the gene ends with a scored stop codon.
    pub stop_codon: Option<Interval>,
    /// The gene runs off the left window edge.
    pub open_left: bool,
    /// The gene runs off the right window edge.
    pub open_right: bool,
    /// In-frame stop codons inside the coding range that evidence allowed.
    pub premature_stops: Vec<Interval>,
    /// Frameshift corrections falling inside the gene.
    pub frameshifts: Vec<FrameShift>,
    /// Indices into the evidence list of alignments supporting the model.
    pub support: Vec<usize>,
    /// Sum of the score increments of the gene's states.
    pub score: f64,
}

impl GeneModel {
    #[must_use]
    pub const fn new(strand: Strand) -> Self {
        Self {
            strand,
            exons: Vec::new(),
            reading_frame: Interval::new(0, -1),
            start_codon: None,
            stop_codon: None,
            open_left: false,
            open_right: false,
            premature_stops: Vec::new(),
            frameshifts: Vec::new(),
            support: Vec::new(),
            score: 0.0,
        }
    }

    /// Range from the first exon start to the last exon end
    #[must_use]
    pub fn limits(&self) -> Option<Interval> {
        let first = self.exons.first()?;
        let last = self.exons.last()?;
        Some(Interval::new(first.range.start, last.range.end))
    }

    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.open_left || self.open_right
    }

    /// Total exon length
    #[must_use]
    pub fn cds_length(&self) -> Pos {
        self.exons.iter().map(|exon| exon.range.len()).sum()
    }

    /// Gene has both start and stop codons
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.start_codon.is_some() && self.stop_codon.is_some()
    }
}

/// Errors that can occur during gene prediction.
///
/// No-path-found is not an error; it is reported as [`crate::hmm::BAD_SCORE`]
/// with an empty gene list.
#[derive(Error, Debug)]
pub enum GnomonError {
    /// Invalid input sequence content
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),
    /// Requested window does not lie inside the sequence
    #[error("Invalid window {start}..{end} for sequence of length {length}")]
    InvalidWindow { start: Pos, end: Pos, length: usize },
    /// No parameter set covers the window's GC content
    #[error("No model parameters for GC content {0:.4}")]
    MissingModel(f64),
    /// Malformed parameter data
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    /// Two alignments carry overlapping coding ranges
    #[error("Alignment {first} intersects MaxCDS of alignment {second}")]
    IntersectingCds { first: usize, second: usize },
    /// Evidence that cannot be reconciled with the sequence
    #[error("Inconsistent evidence: {0}")]
    InconsistentEvidence(String),
    /// Score tables could not be allocated
    #[error("Not enough memory for score tables ({0} bytes)")]
    MemoryLimit(usize),
    /// Results requested before the parser ran
    #[error("Engine not run")]
    EngineNotRun,
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Error parsing input data
    #[error("Parse error: {0}")]
    ParseError(String),
}
