//! Structure readers and the canonical SMILES writer.
//!
//! Every reader returns sanitized molecules (see [`crate::perceive::sanitize`]):
//! ring, aromaticity and hybridization perception have already run and
//! implicit hydrogen counts are filled in.

use std::fmt;
use std::io::BufRead;

use crate::model::molecule::Molecule;

pub mod error;
pub mod sdf;
pub mod smiles;
pub(crate) mod util;

pub use error::{Error, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Smiles,
    Sdf,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Smiles => write!(f, "SMILES"),
            Format::Sdf => write!(f, "SDF"),
        }
    }
}

/// One structure from a multi-record input together with its title.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: Option<String>,
    pub molecule: Molecule,
}

/// Parses a single SMILES string.
pub fn read_smiles(smiles: &str) -> Result<Molecule, Error> {
    smiles::reader::parse(smiles)
}

/// Writes the canonical SMILES of `molecule`.
pub fn write_smiles(molecule: &Molecule) -> String {
    smiles::writer::write(molecule)
}

/// Reads every record of `format` from `reader`.
///
/// SMILES input holds one structure per line, optionally followed by
/// whitespace and a title. Blank lines and lines starting with `#` are
/// skipped.
pub fn read<R: BufRead>(reader: R, format: Format) -> Result<Vec<Record>, Error> {
    match format {
        Format::Smiles => smiles::reader::read(reader),
        Format::Sdf => sdf::reader::read(reader),
    }
}
