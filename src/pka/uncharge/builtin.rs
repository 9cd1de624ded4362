use tracing::debug;

use crate::io;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::{AtomId, Molecule};
use crate::model::types::{BondOrder, Element};
use crate::pka::error::Error;

/// Canonical SMILES of the neutralized, hydrogen-suppressed `molecule`.
pub(crate) fn neutral_smiles(molecule: &Molecule) -> Result<String, Error> {
    Ok(io::write_smiles(&uncharge(&molecule.remove_hydrogens())))
}

/// Neutralizes removable charges on a hydrogen-suppressed molecule.
///
/// Cations lose hydrogens. Anions gain hydrogens, except that as many
/// negative charges as there are fixed positive charges stay in place.
/// Charged atoms bonded to an opposite charge (nitro, N-oxides) are left
/// untouched and do not count.
fn uncharge(molecule: &Molecule) -> Molecule {
    let atoms = molecule.atoms();
    let touches = |id: AtomId, positive: bool| {
        molecule.neighbors(id).iter().any(|&(n, _)| {
            let q = atoms[n].formal_charge;
            if positive { q > 0 } else { q < 0 }
        })
    };

    let mut out = atoms.to_vec();
    let mut fixed_positive: i32 = 0;

    for (id, atom) in atoms.iter().enumerate() {
        if atom.formal_charge <= 0 || touches(id, false) {
            continue;
        }
        let removed = atom.formal_charge.min(atom.implicit_hydrogens as i8);
        out[id].formal_charge -= removed;
        out[id].implicit_hydrogens -= removed as u8;
        fixed_positive += i32::from(out[id].formal_charge);
    }

    let mut anions: Vec<AtomId> = atoms
        .iter()
        .enumerate()
        .filter(|&(id, atom)| {
            atom.formal_charge < 0 && accepts_proton(atom.element) && !touches(id, true)
        })
        .map(|(id, _)| id)
        .collect();
    // Conjugate bases of the strongest acids keep their charge first.
    anions.sort_by_key(|&id| !is_oxoacid_anion(molecule, id));

    let mut neutralized = 0;
    for id in anions {
        let charge = -i32::from(atoms[id].formal_charge);
        let kept = charge.min(fixed_positive);
        fixed_positive -= kept;
        let added = (charge - kept) as i8;
        out[id].formal_charge += added;
        out[id].implicit_hydrogens += added as u8;
        neutralized += added;
    }

    if neutralized > 0 {
        debug!(anions = neutralized, "neutralized negative charges");
    }
    let (_, bonds) = molecule.clone().into_parts();
    Molecule::from_validated_parts(out, bonds)
}

fn accepts_proton(element: Element) -> bool {
    matches!(
        element,
        Element::C
            | Element::N
            | Element::O
            | Element::P
            | Element::S
            | Element::Se
            | Element::F
            | Element::Cl
            | Element::Br
            | Element::I
    )
}

/// `[O-]` or `[S-]` on an atom that carries a double bond to oxygen.
fn is_oxoacid_anion(molecule: &Molecule, id: AtomId) -> bool {
    let atoms = molecule.atoms();
    if !matches!(atoms[id].element, Element::O | Element::S) {
        return false;
    }
    molecule.neighbors(id).iter().any(|&(center, _)| {
        molecule.neighbors(center).iter().any(|&(n, bond)| {
            n != id
                && atoms[n].element == Element::O
                && molecule.bonds()[bond].order == BondOrder::Double
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_charged(smiles: &str) -> Molecule {
        io::read_smiles(smiles).unwrap()
    }

    #[test]
    fn quaternary_amine_keeps_one_phosphate_charge() {
        let mol = uncharge(&make_charged("C[N+](C)(C)CCOP(=O)([O-])[O-]"));
        assert_eq!(mol.net_charge(), 0);
        let anions = mol.atoms().iter().filter(|a| a.formal_charge < 0).count();
        assert_eq!(anions, 1);
    }

    #[test]
    fn nitro_charges_are_untouched() {
        let mol = uncharge(&make_charged("O=[N+]([O-])c1ccccc1"));
        let charged = mol.atoms().iter().filter(|a| a.formal_charge != 0).count();
        assert_eq!(charged, 2);
    }
}
