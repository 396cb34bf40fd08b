#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// T flank, ATG, 98 GCC codons, TAA, T flank: one plus-strand ORF at 201..500
pub fn single_orf_contig() -> String {
    let mut contig = "T".repeat(200);
    contig.push_str("ATG");
    contig.push_str(&"GCC".repeat(98));
    contig.push_str("TAA");
    contig.push_str(&"T".repeat(200));
    contig
}

/// Write `content` to `name` inside `dir`
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn write_fasta(dir: &TempDir, records: &[(&str, &str)]) -> PathBuf {
    let content: String = records
        .iter()
        .map(|(id, sequence)| format!(">{id}\n{sequence}\n"))
        .collect();
    write_file(dir, "input.fasta", &content)
}

/// mRNA alignment covering the ORF of [`single_orf_contig`], 0-based
pub fn orf_evidence_json() -> String {
    r#"[{
        "name": "mrna1",
        "strand": "+",
        "kind": "mrna",
        "exons": [{"start": 150, "end": 560}],
        "cds": {"start": 200, "end": 499}
    }]"#
    .to_string()
}

/// Runs the gnomon CLI on `input` with extra arguments
pub fn gnomon(input: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gnomon").unwrap();
    cmd.arg("-i").arg(input).arg("-q");
    cmd
}
