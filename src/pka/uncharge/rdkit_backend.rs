use rdkit::{ROMol, Uncharger};
use tracing::debug;

use crate::io;
use crate::model::molecule::Molecule;
use crate::pka::error::Error;

/// RDKit canonical SMILES of the neutralized, hydrogen-suppressed `molecule`.
///
/// RDKit sanitizes the structure again while parsing; anything it rejects is
/// reported as an invalid structure.
pub(crate) fn neutral_smiles(molecule: &Molecule) -> Result<String, Error> {
    let smiles = io::write_smiles(&molecule.remove_hydrogens());
    let romol = ROMol::from_smile(&smiles)
        .map_err(|e| Error::InvalidStructure(format!("RDKit rejected '{smiles}': {e}")))?;

    let neutral = Uncharger::new(false).uncharge(&romol);
    let canonical = neutral.as_smiles();
    debug!(input = %smiles, %canonical, "uncharged with RDKit");
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zwitterion_comes_back_neutral() {
        let glycine = io::read_smiles("[NH3+]CC([O-])=O").unwrap();
        let smiles = neutral_smiles(&glycine).unwrap();
        assert!(!smiles.contains('+') && !smiles.contains('-'), "{smiles}");
    }
}
