//! Charge neutralization ahead of canonicalization.
//!
//! The built-in neutralizer works on the crate's own graph. With the
//! `rdkit` feature the structure is handed to RDKit's `Uncharger` instead,
//! and RDKit's canonical SMILES feeds the rest of normalization.

#[cfg(not(feature = "rdkit"))]
mod builtin;
#[cfg(feature = "rdkit")]
mod rdkit_backend;

#[cfg(not(feature = "rdkit"))]
pub(super) use builtin::neutral_smiles;
#[cfg(feature = "rdkit")]
pub(super) use rdkit_backend::neutral_smiles;
