//! SMILES notation: a reader for the common Daylight subset and a canonical
//! writer whose output the reader parses back to the same graph.

pub mod reader;
pub mod writer;

/// Elements that may be written without brackets.
pub(crate) const ORGANIC_SUBSET: [&str; 10] = ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I"];

/// Elements that have a lowercase aromatic spelling.
pub(crate) const AROMATIC_SYMBOLS: [&str; 8] = ["b", "c", "n", "o", "p", "s", "se", "as"];
