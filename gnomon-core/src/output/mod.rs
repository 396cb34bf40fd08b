//! Text output of prediction results.
//!
//! Both formats are plain diagnostic text meant for inspection and tuning,
//! not annotation exchange formats. Coordinates are written 1-based.
//!
//! ## Supported Formats
//!
//! - **Table**: one line per exon with gene id, strand, range, splice flags
//!   and reading frame
//! - **States**: the chosen path, one line per state with its score
//!   decomposition
//!
//! ## Examples
//!
//! ```rust
//! use gnomon_core::GeneFinder;
//! use gnomon_core::config::OutputFormat;
//! use gnomon_core::model::{ModelRegistry, ModelSet};
//! use gnomon_core::output::write_prediction;
//!
//! let finder = GeneFinder::new(ModelRegistry::single(ModelSet::uniform()));
//! let prediction = finder.predict("seq1", &[b'C'; 500], &[], None)?;
//!
//! let mut buffer = Vec::new();
//! write_prediction(&mut buffer, &prediction, OutputFormat::States)?;
//! assert!(String::from_utf8(buffer)?.contains("Intergenic"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Write;

use crate::config::OutputFormat;
use crate::results::Prediction;
use crate::types::GnomonError;

mod formats {
    pub mod states;
    pub mod table;
}

pub use formats::states::{write_state_dump, write_state_records};
pub use formats::table::write_genes;

/// Writes one prediction in the requested format.
///
/// # Errors
///
/// Returns [`GnomonError::Io`] if writing fails.
pub fn write_prediction<W: Write>(
    writer: &mut W,
    prediction: &Prediction,
    format: OutputFormat,
) -> Result<(), GnomonError> {
    match format {
        OutputFormat::Table => write_genes(writer, prediction),
        OutputFormat::States => write_state_dump(writer, prediction),
    }
}
