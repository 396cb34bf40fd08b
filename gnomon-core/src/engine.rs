use log::{debug, info};
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::evidence::AlignModel;
use crate::model::ModelRegistry;
use crate::parse::Parser;
use crate::results::Prediction;
use crate::scoring::SeqScores;
use crate::sequence::gc_content;
use crate::types::{GnomonError, Interval, Pos};

/// One input sequence for batch prediction.
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }
}

/// Gene prediction engine.
///
/// Holds the read-only parameter registry and the run-time configuration.
/// Every call builds its own scorer and parser, so one `GeneFinder` can be
/// shared between threads.
///
/// # Examples
///
/// ```rust
/// use gnomon_core::GeneFinder;
/// use gnomon_core::config::EngineConfig;
/// use gnomon_core::model::{ModelRegistry, ModelSet};
/// use gnomon_core::types::Interval;
///
/// let config = EngineConfig {
///     left_wall: false,
///     ..Default::default()
/// };
/// let finder = GeneFinder::new(ModelRegistry::single(ModelSet::uniform())).with_config(config);
///
/// let contig = vec![b'A'; 2000];
/// let prediction = finder.predict("contig1", &contig, &[], Some(Interval::new(500, 1499)))?;
/// assert_eq!(prediction.window, Interval::new(500, 1499));
/// assert!(prediction.genes.is_empty());
/// # Ok::<(), gnomon_core::types::GnomonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeneFinder {
    registry: ModelRegistry,
    pub config: EngineConfig,
}

impl GeneFinder {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Predicts genes in one window of a contig.
    ///
    /// # Arguments
    ///
    /// * `seq_id` - Contig identifier, copied into the result
    /// * `sequence` - Contig residues (ASCII, case preserved for repeat masking)
    /// * `evidence` - Alignments in contig coordinates; those outside the
    ///   window are skipped
    /// * `window` - Closed range to predict on, the whole contig if `None`
    ///
    /// # Errors
    ///
    /// Returns [`GnomonError`] if:
    /// - The window does not lie inside the contig
    /// - No parameter set covers the window's GC content
    /// - Two alignments carry intersecting coding ranges
    /// - Score tables can not be allocated
    pub fn predict(
        &self,
        seq_id: &str,
        sequence: &[u8],
        evidence: &[AlignModel],
        window: Option<Interval>,
    ) -> Result<Prediction, GnomonError> {
        let window = window.unwrap_or(Interval::new(0, sequence.len() as Pos - 1));
        if window.start < 0 || window.is_empty() || window.end as usize >= sequence.len() {
            return Err(GnomonError::InvalidWindow {
                start: window.start,
                end: window.end,
                length: sequence.len(),
            });
        }

        let gc = gc_content(&sequence[window.start as usize..=window.end as usize]);
        let model = self.registry.for_gc(gc)?;
        info!(
            "{seq_id}: window {window} ({} bp), GC {:.2}%",
            window.len(),
            gc * 100.0
        );

        let scores = SeqScores::new(model, &self.config, sequence, window, evidence)?;
        let mut parser = Parser::new(&scores);
        let score = parser.run();
        let combined_score = parser.combined_score()?;
        let genes = parser.genes()?;
        let states = parser.state_scores()?;

        info!("{seq_id}: {} genes, score {score:.3}", genes.len());

        Ok(Prediction {
            seq_id: seq_id.to_string(),
            window,
            gc_content: gc,
            score,
            combined_score,
            genes,
            states,
        })
    }

    /// Predicts genes on several contigs in parallel.
    ///
    /// Alignments are routed to a record by their `contig` field; alignments
    /// without one are offered to every record. The same `window`, if any,
    /// applies to every record. Results keep the input order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered, see [`GeneFinder::predict`].
    pub fn predict_batch(
        &self,
        records: &[SequenceRecord],
        evidence: &[AlignModel],
        window: Option<Interval>,
    ) -> Result<Vec<Prediction>, GnomonError> {
        debug!("Predicting {} records", records.len());
        records
            .par_iter()
            .map(|record| {
                let own: Vec<AlignModel> = evidence
                    .iter()
                    .filter(|model| model.contig.as_deref().is_none_or(|contig| contig == record.id))
                    .cloned()
                    .collect();
                self.predict(&record.id, &record.sequence, &own, window)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{AlignExon, EvidenceKind};
    use crate::model::{GcBucket, ModelSet};
    use bio::bio_types::strand::Strand;

    fn finder() -> GeneFinder {
        GeneFinder::new(ModelRegistry::single(ModelSet::uniform()))
    }

    #[test]
    fn test_predict_rejects_bad_window() {
        let contig = vec![b'C'; 100];
        for window in [Interval::new(-1, 10), Interval::new(10, 100), Interval::new(20, 10)] {
            let result = finder().predict("seq", &contig, &[], Some(window));
            assert!(matches!(result, Err(GnomonError::InvalidWindow { length: 100, .. })));
        }
    }

    #[test]
    fn test_predict_whole_sequence() {
        let contig = vec![b'G'; 300];
        let prediction = finder().predict("seq", &contig, &[], None).unwrap();

        assert_eq!(prediction.seq_id, "seq");
        assert_eq!(prediction.window, Interval::new(0, 299));
        assert_eq!(prediction.gc_content, 1.0);
        assert!(prediction.has_path());
        assert_eq!(prediction.states.len(), 1);
        assert_eq!(prediction.states[0].range, Interval::new(0, 299));
    }

    #[test]
    fn test_window_states_use_contig_coordinates() {
        let contig = vec![b'C'; 1000];
        let prediction = finder()
            .predict("seq", &contig, &[], Some(Interval::new(200, 699)))
            .unwrap();
        assert_eq!(prediction.states[0].range, Interval::new(200, 699));
    }

    #[test]
    fn test_missing_gc_bucket() {
        let registry = ModelRegistry {
            buckets: vec![GcBucket {
                gc_min: 0.0,
                gc_max: 0.4,
                model: ModelSet::uniform(),
            }],
        };
        let contig = vec![b'G'; 100];
        let result = GeneFinder::new(registry).predict("seq", &contig, &[], None);
        assert!(matches!(result, Err(GnomonError::MissingModel(_))));
    }

    #[test]
    fn test_intersecting_cds_is_reported() {
        let contig = vec![b'C'; 500];
        let first = AlignModel::new(Strand::Forward, EvidenceKind::Mrna, vec![AlignExon::new(10, 200)])
            .with_cds(Interval::new(20, 112));
        let second = AlignModel::new(Strand::Forward, EvidenceKind::Mrna, vec![AlignExon::new(100, 300)])
            .with_cds(Interval::new(110, 202));

        let result = finder().predict("seq", &contig, &[first, second], None);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("intersects MaxCDS"));
    }

    #[test]
    fn test_predict_batch_keeps_order_and_routes_evidence() {
        let records = vec![
            SequenceRecord::new("a", vec![b'C'; 200]),
            SequenceRecord::new("b", vec![b'G'; 300]),
        ];
        let mut wall = AlignModel::new(Strand::Forward, EvidenceKind::Wall, vec![AlignExon::new(50, 250)]);
        wall.contig = Some("b".to_string());

        let predictions = finder().predict_batch(&records, &[wall], None).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].seq_id, "a");
        assert_eq!(predictions[1].seq_id, "b");
        assert_eq!(predictions[1].window, Interval::new(0, 299));

        let result = finder().predict_batch(&records, &[], Some(Interval::new(0, 249)));
        assert!(matches!(result, Err(GnomonError::InvalidWindow { length: 200, .. })));
    }
}
