use std::io::Write;

use crate::results::{Prediction, StateRecord};
use crate::types::{GnomonError, strand_symbol};

/// Write one line per state of the chosen path.
///
/// Columns: kind, strand, phase, start, end (1-based), branch, length,
/// region, terminal and evidence penalty increments, cumulative score and
/// open-edge markers. A `seq_id` prefixes every line when given.
pub fn write_state_records<W: Write>(
    writer: &mut W,
    seq_id: Option<&str>,
    records: &[StateRecord],
) -> Result<(), GnomonError> {
    writeln!(
        writer,
        "#{}kind\tstrand\tphase\tstart\tend\tbranch\tlength\tregion\tterm\tpenalty\tscore\topen",
        if seq_id.is_some() { "seq\t" } else { "" }
    )?;

    for record in records {
        if let Some(id) = seq_id {
            write!(writer, "{id}\t")?;
        }
        let open = match (record.open_left, record.open_right) {
            (true, true) => "<>",
            (true, false) => "<",
            (false, true) => ">",
            (false, false) => ".",
        };
        let parts = record.parts;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{}",
            record.kind.name(),
            strand_symbol(record.strand),
            record.phase,
            record.range.start + 1,
            record.range.end + 1,
            parts.branch,
            parts.length,
            parts.region,
            parts.term,
            parts.penalty,
            record.score,
            open
        )?;
    }
    Ok(())
}

/// Diagnostic dump of a prediction's chosen path.
pub fn write_state_dump<W: Write>(writer: &mut W, prediction: &Prediction) -> Result<(), GnomonError> {
    writeln!(
        writer,
        "# {} score {:.4} combined {:.4}",
        prediction.seq_id, prediction.score, prediction.combined_score
    )?;
    write_state_records(writer, Some(&prediction.seq_id), &prediction.states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::create_test_prediction;

    #[test]
    fn test_write_state_records_columns() {
        let prediction = create_test_prediction();
        let mut buffer = Vec::new();
        write_state_records(&mut buffer, None, &prediction.states[1..2]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let line = output.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "FirstExon\t+\t0\t100\t200\t0.0000\t0.0000\t10.0000\t0.0000\t0.0000\t10.0000\t."
        );
    }

    #[test]
    fn test_state_dump_prefixes_sequence() {
        let prediction = create_test_prediction();
        let mut buffer = Vec::new();
        write_state_dump(&mut buffer, &prediction).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("# test_seq score 40.0000 combined 40.2500\n#seq\tkind"));
        assert!(output.lines().skip(2).all(|line| line.starts_with("test_seq\t")));
    }
}
