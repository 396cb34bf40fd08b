//! # Gnomon Gene Structure Engine
//!
//! An ab initio gene structure predictor for eukaryotic DNA built on a
//! generalized (semi-Markov) hidden Markov model. Given a prediction window,
//! statistical parameters and optional spliced alignments, it returns the
//! single highest-scoring parse into intergenic regions, exons and introns on
//! both strands.
//!
//! ## Overview
//!
//! Prediction runs in three steps:
//!
//! 1. [`scoring::SeqScores`] precomputes per-position signal scores (starts,
//!    stops, donors, acceptors), cumulative coding and non-coding tables and
//!    the "not open" blocker tables derived from stop codons, masks and
//!    evidence.
//! 2. [`parse::Parser`] runs a sparse forward dynamic program: states end only
//!    at signal positions and each one picks its best legal predecessor from
//!    buckets kept per strand, phase and evidence class.
//! 3. The backtrace turns the chosen path into [`types::GeneModel`]s with
//!    reading frame, start/stop codons and supporting alignments.
//!
//! ## Features
//!
//! - **Evidence constraints**: alignments force or forbid exons, introns and
//!   intergenic regions, fix reading frames and confirm splice sites
//! - **Frameshift editing**: alignment-reported indels are applied before
//!   scoring and mapped back in the output
//! - **Partial genes**: open window edges admit genes cut by the window
//! - **Parallel batches**: independent contigs run concurrently with Rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use gnomon_core::GeneFinder;
//! use gnomon_core::model::{ModelRegistry, ModelSet};
//!
//! let finder = GeneFinder::new(ModelRegistry::single(ModelSet::uniform()));
//! let prediction = finder.predict("contig1", b"ATGAAACCCGGGTTTTAAGCATGCATGC", &[], None)?;
//!
//! println!("Found {} genes, score {:.2}", prediction.genes.len(), prediction.score);
//! # Ok::<(), gnomon_core::types::GnomonError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Run-time tuning and output format selection
//! - [`engine`]: [`GeneFinder`], window and batch prediction
//! - [`evidence`]: Alignment records and their validation
//! - [`model`]: Markov chains, signal matrices, length distributions
//! - [`scoring`]: Per-window score tables
//! - [`hmm`]: State kinds, phases and transition rules
//! - [`parse`]: Forward dynamic program and backtrace
//! - [`results`]: Prediction results
//! - [`sequence`]: Residue encoding, FASTA input, frameshift editing
//! - [`output`]: Gene tables and state dumps
//! - [`bitmap`]: Bit sets backing the sequence masks
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, GnomonError>`](types::GnomonError),
//! covering:
//!
//! - Windows outside the sequence
//! - Missing or malformed parameter sets
//! - Inconsistent evidence, such as intersecting coding ranges
//! - I/O and JSON errors
//!
//! Finding no legal parse is not an error: the score is [`hmm::BAD_SCORE`]
//! and the gene list is empty.

pub mod bitmap;
pub mod config;
pub mod constants;
pub mod engine;
pub mod evidence;
pub mod hmm;
pub mod model;
pub mod output;
pub mod parse;
pub mod results;
pub mod scoring;
pub mod sequence;
pub mod types;

pub use engine::{GeneFinder, SequenceRecord};
pub use types::GnomonError;
