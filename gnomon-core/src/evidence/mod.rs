//! Evidence alignments consumed by the scorer.
//!
//! Evidence is pre-processed spliced alignments of proteins, ESTs and mRNAs
//! (or chains of them) on the contig. The engine never modifies it; it is
//! translated into constraint tables before the dynamic program starts and
//! matched against gene models during backtrace.
//!
//! ## Examples
//!
//! ```rust
//! use gnomon_core::evidence::{AlignExon, AlignModel, EvidenceKind};
//! use gnomon_core::types::Interval;
//! use bio::bio_types::strand::Strand;
//!
//! let est = AlignModel::new(
//!     Strand::Forward,
//!     EvidenceKind::Est,
//!     vec![
//!         AlignExon::new(100, 199).with_splices(false, true),
//!         AlignExon::new(300, 420).with_splices(true, false),
//!     ],
//! );
//! assert_eq!(est.limits(), Some(Interval::new(100, 420)));
//! assert_eq!(est.introns().collect::<Vec<_>>(), vec![Interval::new(200, 299)]);
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bio::bio_types::strand::Strand;
use serde::{Deserialize, Serialize};

use crate::types::{GnomonError, Interval, Pos, strand_serde};

/// Origin of an alignment, which decides how it constrains the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Protein,
    Est,
    #[default]
    Mrna,
    /// Several alignments already chained into one model.
    Chained,
    /// Marks a definite intergenic boundary at both ends.
    Wall,
    /// Contained inside another model's intron; imposes no constraint.
    Nested,
}

impl EvidenceKind {
    #[must_use]
    pub const fn is_protein(self) -> bool {
        matches!(self, Self::Protein)
    }

    /// Exons and introns of this kind are written into the constraint tables
    #[must_use]
    pub const fn shapes_genes(self) -> bool {
        !matches!(self, Self::Wall | Self::Nested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameShiftKind {
    /// Bases present in the genome but absent from the transcript.
    Insertion,
    /// Bases missing from the genome.
    Deletion,
}

/// An indel correction reconciling evidence with the reference.
///
/// `position` is a contig coordinate: the first extra base of an insertion,
/// or the base before which deleted bases are restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameShift {
    pub position: Pos,
    pub length: Pos,
    pub kind: FrameShiftKind,
    /// Restored bases of a deletion; N is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bases: Option<String>,
}

impl FrameShift {
    #[must_use]
    pub const fn insertion(position: Pos, length: Pos) -> Self {
        Self {
            position,
            length,
            kind: FrameShiftKind::Insertion,
            bases: None,
        }
    }

    #[must_use]
    pub fn deletion(position: Pos, bases: &str) -> Self {
        Self {
            position,
            length: bases.len() as Pos,
            kind: FrameShiftKind::Deletion,
            bases: Some(bases.to_string()),
        }
    }

    #[must_use]
    pub const fn is_insertion(&self) -> bool {
        matches!(self.kind, FrameShiftKind::Insertion)
    }

    /// Contig positions touched: the removed bases of an insertion, the
    /// insertion point of a deletion
    #[must_use]
    pub const fn span(&self) -> Interval {
        if self.is_insertion() {
            Interval::new(self.position, self.position + self.length - 1)
        } else {
            Interval::new(self.position, self.position)
        }
    }
}

const fn full_identity() -> f64 {
    1.0
}

/// One aligned block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignExon {
    pub start: Pos,
    pub end: Pos,
    /// The left boundary is a splice site.
    #[serde(default)]
    pub splice_left: bool,
    /// The right boundary is a splice site.
    #[serde(default)]
    pub splice_right: bool,
    #[serde(default = "full_identity")]
    pub identity: f64,
}

impl AlignExon {
    #[must_use]
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self {
            start,
            end,
            splice_left: false,
            splice_right: false,
            identity: 1.0,
        }
    }

    #[must_use]
    pub const fn with_splices(mut self, left: bool, right: bool) -> Self {
        self.splice_left = left;
        self.splice_right = right;
        self
    }

    #[must_use]
    pub const fn range(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// A spliced alignment with optional coding annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignModel {
    #[serde(default)]
    pub name: String,
    /// Restricts the record to one FASTA sequence; applies to all when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contig: Option<String>,
    #[serde(with = "strand_serde")]
    pub strand: Strand,
    #[serde(default)]
    pub kind: EvidenceKind,
    /// Aligned blocks in increasing coordinate order.
    pub exons: Vec<AlignExon>,
    /// Coding range including the stop codon when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cds: Option<Interval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frameshifts: Vec<FrameShift>,
    /// Leftmost base of each in-frame stop codon tolerated inside the CDS.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub premature_stops: Vec<Pos>,
    #[serde(default = "full_identity")]
    pub weight: f64,
}

impl AlignModel {
    #[must_use]
    pub fn new(strand: Strand, kind: EvidenceKind, exons: Vec<AlignExon>) -> Self {
        Self {
            name: String::new(),
            contig: None,
            strand,
            kind,
            exons,
            cds: None,
            frameshifts: Vec::new(),
            premature_stops: Vec::new(),
            weight: 1.0,
        }
    }

    #[must_use]
    pub fn with_cds(mut self, cds: Interval) -> Self {
        self.cds = Some(cds);
        self
    }

    #[must_use]
    pub fn limits(&self) -> Option<Interval> {
        let first = self.exons.first()?;
        let last = self.exons.last()?;
        Some(Interval::new(first.start, last.end))
    }

    /// Gaps between consecutive blocks whose facing boundaries are both splices
    pub fn introns(&self) -> impl Iterator<Item = Interval> + '_ {
        self.exons.windows(2).filter_map(|pair| {
            (pair[0].splice_right && pair[1].splice_left)
                .then(|| Interval::new(pair[0].end + 1, pair[1].start - 1))
        })
    }

    #[must_use]
    pub const fn has_cds(&self) -> bool {
        self.cds.is_some()
    }

    /// Coding bases in biological order (stop codon included)
    #[must_use]
    pub fn coding_positions(&self) -> Vec<Pos> {
        let Some(cds) = self.cds else {
            return Vec::new();
        };
        let mut positions: Vec<Pos> = self
            .exons
            .iter()
            .filter_map(|exon| exon.range().intersection(&cds))
            .flat_map(|range| range.start..=range.end)
            .collect();
        if self.strand == Strand::Reverse {
            positions.reverse();
        }
        positions
    }

    /// Structural sanity of one record
    pub fn validate(&self) -> Result<(), GnomonError> {
        let describe = |what: &str| {
            GnomonError::InconsistentEvidence(format!("alignment '{}': {what}", self.name))
        };

        if self.exons.is_empty() {
            return Err(describe("no exons"));
        }
        if matches!(self.strand, Strand::Unknown) {
            return Err(describe("unknown strand"));
        }
        if self.exons.iter().any(|exon| exon.end < exon.start) {
            return Err(describe("exon with end before start"));
        }
        if self.exons.windows(2).any(|pair| pair[1].start <= pair[0].end) {
            return Err(describe("exons overlap or are unordered"));
        }
        if let (Some(cds), Some(limits)) = (self.cds, self.limits()) {
            if !limits.includes(&cds) || cds.is_empty() {
                return Err(describe("CDS outside alignment"));
            }
        }
        Ok(())
    }
}

/// Reject evidence whose coding ranges overlap between two alignments.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::evidence::{check_cds_intersections, AlignExon, AlignModel, EvidenceKind};
/// use gnomon_core::types::{GnomonError, Interval};
/// use bio::bio_types::strand::Strand;
///
/// let a = AlignModel::new(Strand::Forward, EvidenceKind::Protein, vec![AlignExon::new(0, 99)])
///     .with_cds(Interval::new(0, 98));
/// let b = AlignModel::new(Strand::Forward, EvidenceKind::Mrna, vec![AlignExon::new(60, 299)])
///     .with_cds(Interval::new(60, 200));
///
/// let err = check_cds_intersections(&[a, b]).unwrap_err();
/// assert!(matches!(err, GnomonError::IntersectingCds { first: 1, second: 0 }));
/// ```
pub fn check_cds_intersections(models: &[AlignModel]) -> Result<(), GnomonError> {
    let mut coding: Vec<(Interval, usize)> = models
        .iter()
        .enumerate()
        .filter(|(_, model)| model.kind.shapes_genes())
        .filter_map(|(i, model)| model.cds.map(|cds| (cds, i)))
        .collect();
    coding.sort_by_key(|&(cds, i)| (cds.start, i));

    let mut max_cds: Option<(Interval, usize)> = None;
    for (cds, i) in coding {
        if let Some((reach, owner)) = max_cds {
            if cds.start <= reach.end {
                return Err(GnomonError::IntersectingCds {
                    first: i.max(owner),
                    second: i.min(owner),
                });
            }
        }
        max_cds = Some((cds, i));
    }
    Ok(())
}

/// Load evidence records from a JSON array.
pub fn read_evidence<P: AsRef<Path>>(path: P) -> Result<Vec<AlignModel>, GnomonError> {
    let reader = BufReader::new(File::open(path)?);
    let models: Vec<AlignModel> = serde_json::from_reader(reader)?;
    for model in &models {
        model.validate()?;
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protein(start: Pos, end: Pos) -> AlignModel {
        AlignModel::new(
            Strand::Forward,
            EvidenceKind::Protein,
            vec![AlignExon::new(start, end)],
        )
        .with_cds(Interval::new(start, end))
    }

    #[test]
    fn test_introns_need_both_splice_flags() {
        let model = AlignModel::new(
            Strand::Reverse,
            EvidenceKind::Est,
            vec![
                AlignExon::new(0, 9).with_splices(false, true),
                AlignExon::new(50, 59).with_splices(false, true),
                AlignExon::new(90, 99).with_splices(true, false),
            ],
        );
        assert_eq!(
            model.introns().collect::<Vec<_>>(),
            vec![Interval::new(60, 89)]
        );
    }

    #[test]
    fn test_coding_positions_follow_strand() {
        let mut model = AlignModel::new(
            Strand::Reverse,
            EvidenceKind::Mrna,
            vec![
                AlignExon::new(0, 4).with_splices(false, true),
                AlignExon::new(10, 14).with_splices(true, false),
            ],
        )
        .with_cds(Interval::new(3, 11));

        assert_eq!(model.coding_positions(), vec![11, 10, 4, 3]);
        model.strand = Strand::Forward;
        assert_eq!(model.coding_positions(), vec![3, 4, 10, 11]);
    }

    #[test]
    fn test_validate_rejects_bad_records() {
        let mut model = protein(10, 20);
        assert!(model.validate().is_ok());

        model.cds = Some(Interval::new(5, 20));
        assert!(model.validate().is_err());

        let unordered = AlignModel::new(
            Strand::Forward,
            EvidenceKind::Est,
            vec![AlignExon::new(50, 60), AlignExon::new(10, 20)],
        );
        assert!(matches!(
            unordered.validate(),
            Err(GnomonError::InconsistentEvidence(_))
        ));

        let unstranded = AlignModel::new(Strand::Unknown, EvidenceKind::Est, vec![AlignExon::new(10, 20)]);
        assert!(unstranded.validate().is_err());
    }

    #[test]
    fn test_cds_intersections() {
        assert!(check_cds_intersections(&[protein(0, 99), protein(100, 199)]).is_ok());

        let err = check_cds_intersections(&[protein(200, 299), protein(0, 99), protein(250, 400)])
            .unwrap_err();
        assert!(matches!(
            err,
            GnomonError::IntersectingCds {
                first: 2,
                second: 0
            }
        ));
        assert!(err.to_string().contains("intersects MaxCDS"));
    }

    #[test]
    fn test_nested_cds_is_ignored() {
        let mut nested = protein(50, 80);
        nested.kind = EvidenceKind::Nested;
        assert!(check_cds_intersections(&[protein(0, 99), nested]).is_ok());
    }

    #[test]
    fn test_frameshift_span() {
        assert_eq!(FrameShift::insertion(10, 2).span(), Interval::new(10, 11));
        let deletion = FrameShift::deletion(10, "AC");
        assert_eq!(deletion.length, 2);
        assert_eq!(deletion.span(), Interval::new(10, 10));
    }

    #[test]
    fn test_evidence_json() {
        let json = r#"[{
            "name": "p1",
            "strand": "+",
            "kind": "protein",
            "exons": [{"start": 10, "end": 99, "splice_right": true},
                      {"start": 200, "end": 260, "splice_left": true, "identity": 0.9}],
            "cds": {"start": 10, "end": 260}
        }]"#;
        let models: Vec<AlignModel> = serde_json::from_str(json).unwrap();
        assert_eq!(models[0].kind, EvidenceKind::Protein);
        assert_eq!(models[0].exons[0].identity, 1.0);
        assert_eq!(models[0].introns().count(), 1);
        assert!(models[0].validate().is_ok());
    }
}
