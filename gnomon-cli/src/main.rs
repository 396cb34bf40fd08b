//! # Gnomon CLI - Gene Structure Prediction
//!
//! A command-line driver for the gnomon gene structure engine.
//!
//! ## Usage
//!
//! ```bash
//! # Predict genes with a trained parameter file
//! gnomon -i contigs.fasta -m params.json -o genes.tbl
//!
//! # Use spliced alignments as evidence
//! gnomon -i contigs.fasta -m params.json -e alignments.json
//!
//! # Dump the chosen path with its score decomposition
//! gnomon -i contigs.fasta -m params.json -f states
//!
//! # Write a neutral parameter file to start from
//! gnomon --dump-model -o params.json
//! ```
//!
//! ## Options
//!
//! - `-i, --input <FILE>`: Input FASTA file
//! - `-m, --model <FILE>`: Parameter file, JSON (default: neutral parameters)
//! - `-e, --evidence <FILE>`: Alignments, JSON list
//! - `-o, --output <FILE>`: Output file (default: stdout)
//! - `-f, --format <FORMAT>`: Output format: table, states (default: table)
//! - `--from <POS>`, `--to <POS>`: Predict on this 1-based range only
//! - `--open-left`, `--open-right`: Genes may run off the window edge
//! - `--anchor-left`, `--anchor-right`: Force an intergenic state at the edge
//! - `--repeats`: Close soft-masked (lower-case) repeats for coding
//! - `--mpp <F>`: Penalty per extra protein alignment on one gene
//! - `--nonconsensus <F>`: Penalty for GC donors
//! - `--too-far <N>`: Predecessor distance that enables pruning
//! - `-q, --quiet`: Only log warnings
//! - `--dump-model`: Write the neutral parameter set and exit

use clap::{Arg, ArgAction, ArgMatches, Command};
use gnomon_core::config::{EngineConfig, OutputFormat};
use gnomon_core::evidence::read_evidence;
use gnomon_core::model::{ModelRegistry, ModelSet};
use gnomon_core::output::write_prediction;
use gnomon_core::sequence::read_fasta_sequences;
use gnomon_core::types::Interval;
use gnomon_core::{GeneFinder, SequenceRecord};
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;

fn cli() -> Command {
    let flag = |name: &'static str, help: &'static str| {
        Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
    };

    Command::new("gnomon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Eukaryotic gene structure prediction")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .required_unless_present("dump-model")
                .help("Input FASTA file"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("FILE")
                .help("Parameter file, JSON (default: neutral parameters)"),
        )
        .arg(
            Arg::new("evidence")
                .short('e')
                .long("evidence")
                .value_name("FILE")
                .help("Alignments, JSON list"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: stdout)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format: table, states")
                .default_value("table"),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("POS")
                .requires("to")
                .help("First position of the prediction range (1-based)"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .value_name("POS")
                .requires("from")
                .help("Last position of the prediction range (1-based)"),
        )
        .arg(flag("open-left", "Genes may run off the left edge"))
        .arg(flag("open-right", "Genes may run off the right edge"))
        .arg(flag("anchor-left", "Start the parse with an intergenic state"))
        .arg(flag("anchor-right", "End the parse with an intergenic state"))
        .arg(flag("repeats", "Close soft-masked repeats for coding"))
        .arg(
            Arg::new("mpp")
                .long("mpp")
                .value_name("F")
                .help("Penalty per extra protein alignment on one gene"),
        )
        .arg(
            Arg::new("nonconsensus")
                .long("nonconsensus")
                .value_name("F")
                .help("Penalty for GC donors"),
        )
        .arg(
            Arg::new("too-far")
                .long("too-far")
                .value_name("N")
                .help("Predecessor distance that enables pruning"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log warnings"),
        )
        .arg(flag("dump-model", "Write the neutral parameter set and exit"))
}

fn parsed<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, String> {
    matches
        .get_one::<String>(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| format!("Invalid value for --{name}: '{value}'"))
        })
        .transpose()
}

fn engine_config(matches: &ArgMatches) -> Result<EngineConfig, String> {
    let defaults = EngineConfig::default();
    Ok(EngineConfig {
        multi_protein_penalty: parsed(matches, "mpp")?.unwrap_or(defaults.multi_protein_penalty),
        non_consensus_penalty: parsed(matches, "nonconsensus")?
            .unwrap_or(defaults.non_consensus_penalty),
        too_far_len: parsed(matches, "too-far")?.unwrap_or(defaults.too_far_len),
        mask_repeats: matches.get_flag("repeats"),
        left_wall: !matches.get_flag("open-left"),
        right_wall: !matches.get_flag("open-right"),
        left_anchor: matches.get_flag("anchor-left"),
        right_anchor: matches.get_flag("anchor-right"),
        ..defaults
    })
}

/// `--from`/`--to` as a 0-based closed interval
fn window(matches: &ArgMatches) -> Result<Option<Interval>, String> {
    match (parsed::<i32>(matches, "from")?, parsed::<i32>(matches, "to")?) {
        (Some(from), Some(to)) if from >= 1 && from <= to => Ok(Some(Interval::new(from - 1, to - 1))),
        (Some(from), Some(to)) => Err(format!("Invalid range {from}..{to}")),
        _ => Ok(None),
    }
}

/// Main entry point for the gnomon CLI application.
///
/// Parses command-line arguments, loads parameters and evidence, predicts
/// genes on every input record and writes results in the requested format.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    let level = if matches.get_flag("quiet") { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut writer: Box<dyn Write> = if let Some(output_file) = matches.get_one::<String>("output")
    {
        Box::new(BufWriter::new(File::create(output_file)?))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    if matches.get_flag("dump-model") {
        writeln!(writer, "{}", ModelSet::uniform().to_json()?)?;
        writer.flush()?;
        return Ok(());
    }

    let format = matches
        .get_one::<String>("format")
        .and_then(|name| OutputFormat::from_name(name))
        .ok_or("Invalid output format")?;
    let config = engine_config(&matches)?;
    let window = window(&matches)?;

    let registry = match matches.get_one::<String>("model") {
        Some(path) => ModelRegistry::from_path(path)?,
        None => {
            info!("No parameter file given, using neutral parameters");
            ModelRegistry::single(ModelSet::uniform())
        }
    };
    let evidence = match matches.get_one::<String>("evidence") {
        Some(path) => read_evidence(path)?,
        None => Vec::new(),
    };

    let input = matches
        .get_one::<String>("input")
        .ok_or("Missing input file")?;
    let records: Vec<SequenceRecord> = read_fasta_sequences(input)?
        .into_iter()
        .map(|(id, _, sequence)| SequenceRecord::new(id, sequence))
        .collect();
    info!(
        "Read {} sequences, {} alignments",
        records.len(),
        evidence.len()
    );

    let finder = GeneFinder::new(registry).with_config(config);
    let predictions = finder.predict_batch(&records, &evidence, window)?;

    for prediction in &predictions {
        write_prediction(&mut writer, prediction, format)?;
    }
    writer.flush()?;

    info!(
        "Found {} genes in {} sequences",
        predictions.iter().map(|p| p.genes.len()).sum::<usize>(),
        predictions.len()
    );

    Ok(())
}
