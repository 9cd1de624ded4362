//! Kekulé assignment for aromatic systems.
//!
//! An aromatic atom whose σ valence falls one short of an allowed valence
//! must take a double bond to an aromatic neighbor. Aromatic input is only
//! consistent when those atoms can be paired off along aromatic bonds.

use super::valence;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;
use crate::model::types::BondOrder;

/// Finds one Kekulé structure for the aromatic atoms of `graph`.
///
/// Returns the indices of the bonds that become double, or the aromatic
/// atoms left without a partner when no structure exists.
pub fn kekulize<G: MolecularGraph + ?Sized>(graph: &G) -> Result<Vec<usize>, Vec<AtomId>> {
    let mut needs = vec![false; graph.atom_count()];
    let mut misfits = Vec::new();
    for (id, atom) in graph.atoms().iter().enumerate() {
        if !atom.is_aromatic {
            continue;
        }
        match needs_double_bond(graph, id) {
            Some(flag) => needs[id] = flag,
            None => misfits.push(id),
        }
    }
    if !misfits.is_empty() {
        return Err(misfits);
    }

    let mut partner: Vec<Option<usize>> = vec![None; graph.atom_count()];
    if !pair(graph, &needs, &mut partner) {
        return Err((0..needs.len()).filter(|&a| needs[a]).collect());
    }

    let mut doubles: Vec<usize> = partner.into_iter().flatten().collect();
    doubles.sort_unstable();
    doubles.dedup();
    Ok(doubles)
}

// `Some(true)` when the atom lacks its π bond, `Some(false)` when its
// valence is already complete, `None` when neither fits.
fn needs_double_bond<G: MolecularGraph + ?Sized>(graph: &G, id: AtomId) -> Option<bool> {
    let atom = &graph.atoms()[id];
    let allowed = valence::allowed_valences(atom.element, atom.formal_charge);
    if allowed.is_empty() {
        return Some(false);
    }

    let sigma = graph
        .bond_valence(id)
        .saturating_add(atom.implicit_hydrogens);
    if allowed.contains(&sigma) {
        Some(false)
    } else if allowed.contains(&sigma.saturating_add(1)) {
        Some(true)
    } else {
        None
    }
}

// Backtracking perfect matching, always expanding the atom with the fewest
// free partners.
fn pair<G: MolecularGraph + ?Sized>(
    graph: &G,
    needs: &[bool],
    partner: &mut [Option<usize>],
) -> bool {
    let mut next: Option<(AtomId, usize)> = None;
    for atom in 0..needs.len() {
        if !needs[atom] || partner[atom].is_some() {
            continue;
        }
        let options = free_partners(graph, needs, partner, atom).count();
        if options == 0 {
            return false;
        }
        if next.is_none_or(|(_, best)| options < best) {
            next = Some((atom, options));
        }
    }
    let Some((atom, _)) = next else {
        return true;
    };

    let choices: Vec<(AtomId, usize)> = free_partners(graph, needs, partner, atom).collect();
    for (neighbor, bond) in choices {
        partner[atom] = Some(bond);
        partner[neighbor] = Some(bond);
        if pair(graph, needs, partner) {
            return true;
        }
        partner[atom] = None;
        partner[neighbor] = None;
    }
    false
}

fn free_partners<'a, G: MolecularGraph + ?Sized>(
    graph: &'a G,
    needs: &'a [bool],
    partner: &'a [Option<usize>],
    atom: AtomId,
) -> impl Iterator<Item = (AtomId, usize)> + 'a {
    graph
        .neighbors(atom)
        .iter()
        .copied()
        .filter(move |&(n, b)| {
            needs[n] && partner[n].is_none() && graph.bonds()[b].order == BondOrder::Aromatic
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::molecule::{Bond, Molecule};
    use crate::model::types::Element;

    fn aromatic_ring(atoms: &[(Element, u8)]) -> Molecule {
        let n = atoms.len();
        let atoms = atoms
            .iter()
            .map(|&(e, h)| Atom::new(e).with_hydrogens(h).aromatic())
            .collect();
        let bonds = (0..n)
            .map(|i| Bond::new(i, (i + 1) % n, BondOrder::Aromatic))
            .collect();
        Molecule::new(atoms, bonds).unwrap()
    }

    #[test]
    fn benzene_takes_three_double_bonds() {
        let doubles = kekulize(&aromatic_ring(&[(Element::C, 1); 6])).unwrap();
        assert_eq!(doubles.len(), 3);
    }

    #[test]
    fn pyrrole_nitrogen_needs_no_partner() {
        let mol = aromatic_ring(&[
            (Element::N, 1),
            (Element::C, 1),
            (Element::C, 1),
            (Element::C, 1),
            (Element::C, 1),
        ]);
        assert_eq!(kekulize(&mol).unwrap(), vec![1, 3]);
    }

    #[test]
    fn pyrrole_without_hydrogen_cannot_be_paired() {
        let mol = aromatic_ring(&[
            (Element::N, 0),
            (Element::C, 1),
            (Element::C, 1),
            (Element::C, 1),
            (Element::C, 1),
        ]);
        assert_eq!(kekulize(&mol).unwrap_err(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn odd_carbocycles_cannot_be_paired() {
        assert!(kekulize(&aromatic_ring(&[(Element::C, 1); 5])).is_err());
        assert!(kekulize(&aromatic_ring(&[(Element::C, 1); 3])).is_err());
    }

    #[test]
    fn non_aromatic_molecules_have_nothing_to_pair() {
        let atoms = vec![
            Atom::new(Element::C).with_hydrogens(3),
            Atom::new(Element::O).with_hydrogens(1),
        ];
        let bonds = vec![Bond::new(0, 1, BondOrder::Single)];
        let mol = Molecule::new(atoms, bonds).unwrap();
        assert_eq!(kekulize(&mol).unwrap(), Vec::<usize>::new());
    }
}
