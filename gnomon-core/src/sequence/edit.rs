use log::warn;

use crate::evidence::{AlignExon, AlignModel, FrameShift};
use crate::types::{Interval, Pos};

/// Map between original (contig) and edited (gap-closed) coordinates.
///
/// Editing removes the bases of every insertion and restores the bases of
/// every deletion in a window, giving the sequence the engine actually
/// scores. Both directions use `-1` for positions without a counterpart:
/// removed bases have no edited position and restored bases have no
/// original one.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::evidence::FrameShift;
/// use gnomon_core::sequence::SeqMap;
/// use gnomon_core::types::Interval;
///
/// let contig = b"AAAACCCCGGGG";
/// let (map, edited) = SeqMap::build(contig, Interval::new(0, 11), &[FrameShift::insertion(4, 2)]);
/// assert_eq!(edited, b"AAAACCGGGG");
/// assert_eq!(map.orig_to_edited(4), -1);
/// assert_eq!(map.orig_to_edited(6), 4);
/// assert_eq!(map.edited_to_orig(4), 6);
/// ```
#[derive(Debug, Clone)]
pub struct SeqMap {
    window: Interval,
    orig_to_edited: Vec<Pos>,
    edited_to_orig: Vec<Pos>,
    applied: Vec<FrameShift>,
}

impl SeqMap {
    /// Edit `contig[window]` with `shifts` and return the map plus edited residues.
    ///
    /// Shifts outside the window or overlapping an earlier shift are dropped.
    pub fn build(contig: &[u8], window: Interval, shifts: &[FrameShift]) -> (Self, Vec<u8>) {
        let mut sorted: Vec<&FrameShift> = shifts.iter().collect();
        sorted.sort_by_key(|shift| (shift.position, shift.is_insertion()));

        let mut applied: Vec<FrameShift> = Vec::with_capacity(sorted.len());
        for shift in sorted {
            if shift.length <= 0 || !window.includes(&shift.span()) {
                warn!(
                    "Frameshift at {} (length {}) outside window {window}; skipped",
                    shift.position, shift.length
                );
                continue;
            }
            if applied
                .last()
                .is_some_and(|prev| shift.span().start <= prev.span().end)
            {
                warn!(
                    "Overlapping frameshift at {} dropped",
                    shift.position
                );
                continue;
            }
            applied.push(shift.clone());
        }

        let capacity = window.len().max(0) as usize;
        let mut edited = Vec::with_capacity(capacity);
        let mut orig_to_edited = Vec::with_capacity(capacity);
        let mut edited_to_orig = Vec::with_capacity(capacity);

        let mut shifts = applied.iter().peekable();
        for pos in window.start..=window.end {
            while let Some(shift) = shifts.next_if(|shift| {
                shift.position == pos && !shift.is_insertion()
            }) {
                let restored = shift
                    .bases
                    .as_deref()
                    .filter(|bases| bases.len() as Pos == shift.length)
                    .map_or_else(
                        || vec![b'N'; shift.length as usize],
                        |bases| bases.as_bytes().to_ascii_uppercase(),
                    );
                for base in restored {
                    edited.push(base);
                    edited_to_orig.push(-1);
                }
            }

            let removed = shifts
                .peek()
                .is_some_and(|shift| shift.is_insertion() && shift.span().contains(pos));
            if removed {
                orig_to_edited.push(-1);
                if pos == shifts.peek().map_or(pos, |shift| shift.span().end) {
                    shifts.next();
                }
                continue;
            }

            orig_to_edited.push(edited.len() as Pos);
            edited_to_orig.push(pos);
            edited.push(contig[pos as usize]);
        }

        let map = Self {
            window,
            orig_to_edited,
            edited_to_orig,
            applied,
        };
        (map, edited)
    }

    /// Map without edits
    #[must_use]
    pub fn identity(window: Interval) -> Self {
        let positions: Vec<Pos> = (window.start..=window.end).collect();
        Self {
            window,
            orig_to_edited: (0..positions.len() as Pos).collect(),
            edited_to_orig: positions,
            applied: Vec::new(),
        }
    }

    /// Window in contig coordinates
    #[must_use]
    pub const fn window(&self) -> Interval {
        self.window
    }

    #[must_use]
    pub fn edited_len(&self) -> usize {
        self.edited_to_orig.len()
    }

    /// Frameshifts actually applied, in coordinate order
    #[must_use]
    pub fn applied(&self) -> &[FrameShift] {
        &self.applied
    }

    /// Contig coordinate to edited coordinate, `-1` if removed or outside
    #[must_use]
    pub fn orig_to_edited(&self, orig: Pos) -> Pos {
        usize::try_from(orig - self.window.start)
            .ok()
            .and_then(|i| self.orig_to_edited.get(i).copied())
            .unwrap_or(-1)
    }

    /// Edited coordinate to contig coordinate, `-1` if restored or outside
    #[must_use]
    pub fn edited_to_orig(&self, edited: Pos) -> Pos {
        usize::try_from(edited)
            .ok()
            .and_then(|i| self.edited_to_orig.get(i).copied())
            .unwrap_or(-1)
    }

    /// Map a contig range, shrinking ends that fall on removed bases
    #[must_use]
    pub fn range_to_edited(&self, range: Interval) -> Option<Interval> {
        let clipped = range.intersection(&self.window)?;
        let start = (clipped.start..=clipped.end)
            .map(|pos| self.orig_to_edited(pos))
            .find(|&pos| pos >= 0)?;
        let end = (clipped.start..=clipped.end)
            .rev()
            .map(|pos| self.orig_to_edited(pos))
            .find(|&pos| pos >= 0)?;
        Some(Interval::new(start, end))
    }

    /// Map an edited range back, shrinking ends that fall on restored bases
    #[must_use]
    pub fn range_to_orig(&self, range: Interval) -> Option<Interval> {
        let start = (range.start..=range.end)
            .map(|pos| self.edited_to_orig(pos))
            .find(|&pos| pos >= 0)?;
        let end = (range.start..=range.end)
            .rev()
            .map(|pos| self.edited_to_orig(pos))
            .find(|&pos| pos >= 0)?;
        Some(Interval::new(start, end))
    }

    /// Express an alignment in edited coordinates.
    ///
    /// Returns `None` unless the alignment lies entirely inside the window.
    #[must_use]
    pub fn alignment_to_edited(&self, model: &AlignModel) -> Option<AlignModel> {
        if !self.window.includes(&model.limits()?) {
            return None;
        }

        let exons = model
            .exons
            .iter()
            .map(|exon| {
                let range = self.range_to_edited(exon.range())?;
                Some(AlignExon {
                    start: range.start,
                    end: range.end,
                    ..exon.clone()
                })
            })
            .collect::<Option<Vec<_>>>()?;
        let cds = match model.cds {
            Some(cds) => Some(self.range_to_edited(cds)?),
            None => None,
        };
        let premature_stops = model
            .premature_stops
            .iter()
            .map(|&pos| self.orig_to_edited(pos))
            .filter(|&pos| pos >= 0)
            .collect();

        Some(AlignModel {
            exons,
            cds,
            premature_stops,
            ..model.clone()
        })
    }
}
