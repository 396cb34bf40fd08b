use std::fs::File;
use std::path::Path;

use bio::io::fasta;

use crate::types::GnomonError;

/// (id, description, residues) of one FASTA record
pub type FastaRecord = (String, Option<String>, Vec<u8>);

/// Read every record of a FASTA file with rust-bio.
///
/// Residue case is preserved so that soft-masked repeats survive.
pub fn read_fasta_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, GnomonError> {
    let file = File::open(path)?;
    let reader = fasta::Reader::new(file);
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| GnomonError::ParseError(e.to_string()))?;
        let id = record.id().to_string();
        let description = record.desc().map(String::from);
        sequences.push((id, description, record.seq().to_vec()));
    }

    Ok(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fasta_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_fasta_sequences_basic() {
        let file = fasta_file(">chr1\nATCG\nGCTA\n");

        let sequences = read_fasta_sequences(file.path()).unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].0, "chr1");
        assert_eq!(sequences[0].2, b"ATCGGCTA");
    }

    #[test]
    fn test_read_fasta_keeps_soft_mask() {
        let file = fasta_file(">chr1 masked contig\nACgtac\n>chr2\nNNNN\n");

        let sequences = read_fasta_sequences(file.path()).unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].1.as_deref(), Some("masked contig"));
        assert_eq!(sequences[0].2, b"ACgtac");
        assert_eq!(sequences[1].1, None);
    }

    #[test]
    fn test_read_fasta_empty_file() {
        let file = fasta_file("");
        assert!(read_fasta_sequences(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_read_fasta_missing_file() {
        match read_fasta_sequences("definitely/not/here.fa") {
            Err(GnomonError::Io(_)) => {}
            other => panic!("Expected Io error, got {other:?}"),
        }
    }
}
