//! Structure input and report output streams.

mod infer;

pub use infer::input as infer_input_format;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Opens `path`, or stdin when no path is given.
///
/// A terminal on stdin is refused rather than waited on.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    let Some(path) = path else {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            bail!(
                "No SMILES given and stdin is a terminal.\n\nPass SMILES as arguments, use -i <FILE>, or pipe data via stdin."
            );
        }
        return Ok(Box::new(stdin.lock()));
    };

    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Creates `path` for the report, or buffers stdout when no path is given.
pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}
