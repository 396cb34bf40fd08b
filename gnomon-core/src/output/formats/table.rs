use std::io::Write;

use crate::results::Prediction;
use crate::types::{GeneModel, GnomonError, Interval, strand_symbol};

fn one_based(range: Interval) -> String {
    format!("{}\t{}", range.start + 1, range.end + 1)
}

/// `start`, `stop`, `<` and `>` markers of a gene
fn gene_flags(gene: &GeneModel) -> String {
    let mut flags = Vec::new();
    if gene.start_codon.is_some() {
        flags.push("start");
    }
    if gene.stop_codon.is_some() {
        flags.push("stop");
    }
    if gene.open_left {
        flags.push("<");
    }
    if gene.open_right {
        flags.push(">");
    }
    if !gene.premature_stops.is_empty() {
        flags.push("pstop");
    }
    if !gene.frameshifts.is_empty() {
        flags.push("fshift");
    }
    if flags.is_empty() {
        ".".to_string()
    } else {
        flags.join(",")
    }
}

/// Write the gene table: one line per exon.
///
/// Columns: sequence, gene number, strand, exon start, exon end, splice
/// flags (`S` for a splice boundary, `-` otherwise, left then right),
/// reading frame, identity of the best supporting alignment, gene flags.
pub fn write_genes<W: Write>(writer: &mut W, prediction: &Prediction) -> Result<(), GnomonError> {
    writeln!(
        writer,
        "# {} window {}..{} gc {:.4} score {:.4} combined {:.4}",
        prediction.seq_id,
        prediction.window.start + 1,
        prediction.window.end + 1,
        prediction.gc_content,
        prediction.score,
        prediction.combined_score
    )?;

    for (number, gene) in prediction.genes.iter().enumerate() {
        let flags = gene_flags(gene);
        let frame = gene.reading_frame;
        let support: Vec<String> = gene.support.iter().map(ToString::to_string).collect();
        writeln!(
            writer,
            "# gene {} score {:.4} support {}",
            number + 1,
            gene.score,
            if support.is_empty() { ".".to_string() } else { support.join(",") }
        )?;

        for exon in &gene.exons {
            let splices = format!(
                "{}{}",
                if exon.splice_left { 'S' } else { '-' },
                if exon.splice_right { 'S' } else { '-' }
            );
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}..{}\t{:.2}\t{}",
                prediction.seq_id,
                number + 1,
                strand_symbol(gene.strand),
                one_based(exon.range),
                splices,
                frame.start + 1,
                frame.end + 1,
                exon.identity,
                flags
            )?;
        }
    }
    Ok(())
}
