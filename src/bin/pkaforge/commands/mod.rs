mod demo;
mod predict;
mod report;
mod sites;

use demo::run_demo;
use predict::run_predict;
use sites::run_sites;

use anyhow::{Context, Result, bail};

use pka_forge::io::{self as chem_io, Format, Record};

use crate::cli::{Command, InputOptions};
use crate::display::Context as DisplayContext;
use crate::io::{infer_input_format, open_input};

pub fn dispatch(command: Command, ctx: DisplayContext) -> Result<()> {
    match command {
        Command::Predict(args) => run_predict(args, ctx),
        Command::Sites(args) => run_sites(args, ctx),
        Command::Demo(args) => run_demo(args, ctx),
    }
}

/// Collects structures from positional SMILES and the input file or stdin.
///
/// Stdin is only read when neither SMILES arguments nor `--input` are given.
fn load_records(input: &InputOptions) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(input.smiles.len());

    for smiles in &input.smiles {
        let molecule = chem_io::read_smiles(smiles)
            .with_context(|| format!("Failed to parse SMILES '{smiles}'"))?;
        records.push(Record {
            name: Some(smiles.clone()),
            molecule,
        });
    }

    if input.input.is_some() || input.smiles.is_empty() {
        let format = resolve_input_format(input)?;
        let reader = open_input(input.input.as_deref())?;
        let parsed = chem_io::read(reader, format)
            .with_context(|| format!("Failed to read {format} input"))?;
        records.extend(parsed);
    }

    if records.is_empty() {
        bail!("Input contains no structures");
    }

    Ok(records)
}

fn resolve_input_format(input: &InputOptions) -> Result<Format> {
    if let Some(format) = input.input_format {
        return Ok(format.into());
    }

    match &input.input {
        Some(path) => infer_input_format(path).with_context(|| {
            format!(
                "Cannot infer input format from '{}'. Use --infmt to specify.",
                path.display()
            )
        }),
        None => Ok(Format::Smiles),
    }
}

fn record_label(record: &Record, index: usize) -> String {
    match &record.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => format!("mol{}", index + 1),
    }
}

fn count_substep(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
