//! Input normalization ahead of site detection.
//!
//! Charges are neutralized on a hydrogen-suppressed copy (see
//! [`uncharge`](super::uncharge)), the result is written as canonical SMILES
//! and read back so valence, aromaticity and atom order depend only on the
//! structure, and finally every hydrogen is made explicit.

use tracing::debug;

use super::config::{FragmentPolicy, NormalizeConfig};
use super::error::Error;
use super::uncharge::neutral_smiles;
use crate::io;
use crate::model::molecule::{AtomId, Molecule};
use crate::perceive;

/// Produces the canonical, fully protonated form used for prediction.
///
/// Heavy atoms come first in canonical order; explicit hydrogens follow,
/// grouped by parent.
pub fn normalize(molecule: &Molecule, config: &NormalizeConfig) -> Result<Molecule, Error> {
    if molecule.is_empty() {
        return Err(Error::InvalidStructure("molecule has no atoms".to_string()));
    }
    let molecule = select_fragment(molecule, config.fragments)?;

    let prepared = if config.uncharge {
        let smiles = neutral_smiles(&molecule)?;
        debug!(%smiles, "canonical form");
        io::read_smiles(&smiles)?
    } else {
        perceive::sanitize(molecule)?
    };

    Ok(prepared.add_hydrogens())
}

fn select_fragment(molecule: &Molecule, policy: FragmentPolicy) -> Result<Molecule, Error> {
    let components = molecule.connected_components();
    if components.len() <= 1 {
        return Ok(molecule.clone());
    }
    match policy {
        FragmentPolicy::Reject => Err(Error::InvalidStructure(format!(
            "molecule has {} disconnected fragments",
            components.len()
        ))),
        FragmentPolicy::KeepLargest => {
            let atoms = molecule.atoms();
            let heavy = |component: &[AtomId]| {
                component.iter().filter(|&&a| !atoms[a].is_hydrogen()).count()
            };
            let mut best = &components[0];
            for component in &components[1..] {
                if heavy(component) > heavy(best) {
                    best = component;
                }
            }
            debug!(
                fragments = components.len(),
                kept = best.len(),
                "kept largest fragment"
            );
            Ok(molecule.subgraph(best))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::molecule::Bond;
    use crate::model::types::{BondOrder, Element};

    fn make_molecule(smiles: &str) -> Molecule {
        io::read_smiles(smiles).unwrap()
    }

    fn normalized(smiles: &str) -> Molecule {
        normalize(&make_molecule(smiles), &NormalizeConfig::default()).unwrap()
    }

    fn charged_atoms(molecule: &Molecule) -> usize {
        molecule
            .atoms()
            .iter()
            .filter(|a| a.formal_charge != 0)
            .count()
    }

    #[test]
    fn hydrogens_follow_heavy_atoms() {
        let mol = normalized("CC(=O)O");
        assert_eq!(mol.atom_count(), 8);
        assert_eq!(mol.heavy_atom_count(), 4);
        assert!(mol.atoms()[..4].iter().all(|a| !a.is_hydrogen()));
        assert!(mol.atoms()[4..].iter().all(|a| a.is_hydrogen()));
        assert!(mol.atoms().iter().all(|a| a.implicit_hydrogens == 0));
    }

    #[test]
    fn normalization_is_idempotent() {
        for smiles in [
            "CC(=O)O",
            "CN(C)CCCN1C2=CC=CC=C2SC2=C1C=C(C=C2)C(C)=O",
            "c1ccc2[nH]ccc2c1",
            "O=[N+]([O-])c1ccc(O)cc1",
        ] {
            let once = normalized(smiles);
            let twice = normalize(&once, &NormalizeConfig::default()).unwrap();
            assert_eq!(once.atoms(), twice.atoms(), "{smiles}");
            assert_eq!(once.bonds(), twice.bonds(), "{smiles}");
        }
    }

    #[test]
    fn atom_order_is_independent_of_input_order() {
        let a = normalized("OC(=O)C");
        let b = normalized("CC(O)=O");
        assert_eq!(a.atoms(), b.atoms());
        assert_eq!(a.bonds(), b.bonds());
    }

    #[test]
    fn zwitterion_is_neutralized() {
        let mol = normalized("[NH3+]CC([O-])=O");
        assert_eq!(charged_atoms(&mol), 0);
        assert_eq!(mol.atom_count(), normalized("NCC(=O)O").atom_count());
    }

    #[test]
    fn simple_ions_are_neutralized() {
        assert_eq!(charged_atoms(&normalized("[NH4+]")), 0);
        assert_eq!(normalized("[NH4+]").atom_count(), 4);
        assert_eq!(charged_atoms(&normalized("c1ccccc1[O-]")), 0);
        assert_eq!(charged_atoms(&normalized("c1cc[nH+]cc1")), 0);
    }

    #[test]
    fn fixed_charges_are_preserved() {
        let betaine = normalized("C[N+](C)(C)CC(=O)[O-]");
        assert_eq!(charged_atoms(&betaine), 2);
        assert_eq!(betaine.net_charge(), 0);

        let nitro = normalized("O=[N+]([O-])c1ccccc1");
        assert_eq!(charged_atoms(&nitro), 2);
    }

    #[test]
    fn fragments_are_rejected_by_default() {
        let salt = make_molecule("CCO.Cl");
        let err = normalize(&salt, &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)));
    }

    #[test]
    fn largest_fragment_is_kept_on_request() {
        let config = NormalizeConfig {
            fragments: FragmentPolicy::KeepLargest,
            ..Default::default()
        };
        let mol = normalize(&make_molecule("[Na+].CC(=O)[O-]"), &config).unwrap();
        assert_eq!(mol.heavy_atom_count(), 4);
        assert_eq!(charged_atoms(&mol), 0);
    }

    #[test]
    fn unkekulizable_rings_are_invalid_structures() {
        let atoms = (0..5)
            .map(|_| Atom::new(Element::C).with_hydrogens(1).aromatic())
            .collect();
        let bonds = (0..5)
            .map(|i| Bond::new(i, (i + 1) % 5, BondOrder::Aromatic))
            .collect();
        let ring = Molecule::new(atoms, bonds).unwrap();

        for uncharge in [true, false] {
            let config = NormalizeConfig {
                uncharge,
                ..Default::default()
            };
            let err = normalize(&ring, &config).unwrap_err();
            assert!(matches!(err, Error::InvalidStructure(_)), "{err}");
        }
    }

    #[test]
    fn charges_survive_without_uncharging() {
        let config = NormalizeConfig {
            uncharge: false,
            ..Default::default()
        };
        let mol = normalize(&make_molecule("CC(=O)[O-]"), &config).unwrap();
        assert_eq!(charged_atoms(&mol), 1);
        assert_eq!(mol.atom_count(), 7);
    }
}
