//! Hückel aromaticity for Kekulé input.
//!
//! Each SSSR ring, then each pair of fused rings, is tested for the 4n+2
//! rule. Atoms that were already flagged aromatic by the reader (lowercase
//! SMILES) are trusted as-is; only rings made entirely of unflagged atoms are
//! perceived here.

use tracing::trace;

use super::rings::RingInfo;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::{AtomId, Molecule};
use crate::model::types::{BondOrder, Element};

/// Atom and bond indices that should become aromatic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AromaticAssignment {
    pub atoms: Vec<AtomId>,
    pub bonds: Vec<usize>,
}

impl AromaticAssignment {
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

pub fn perceive<G: MolecularGraph + ?Sized>(graph: &G, rings: &RingInfo) -> AromaticAssignment {
    let electrons: Vec<Option<u8>> = (0..graph.atom_count())
        .map(|a| pi_electrons(graph, rings, a))
        .collect();

    let mut atom_flag = vec![false; graph.atom_count()];
    let mut bond_flag = vec![false; graph.bond_count()];
    let mut ring_aromatic = vec![false; rings.num_rings()];

    for (idx, ring) in rings.rings().iter().enumerate() {
        if is_huckel(ring.iter().copied(), &electrons) {
            ring_aromatic[idx] = true;
            mark(ring, rings.ring_bonds(idx), &mut atom_flag, &mut bond_flag);
        }
    }

    for first in 0..rings.num_rings() {
        for second in first + 1..rings.num_rings() {
            if ring_aromatic[first] && ring_aromatic[second] {
                continue;
            }
            let shares_bond = rings
                .ring_bonds(first)
                .iter()
                .any(|b| rings.ring_bonds(second).contains(b));
            if !shares_bond {
                continue;
            }

            let mut envelope: Vec<AtomId> = rings.rings()[first].clone();
            for &a in &rings.rings()[second] {
                if !envelope.contains(&a) {
                    envelope.push(a);
                }
            }
            if is_huckel(envelope.iter().copied(), &electrons) {
                trace!(first, second, "fused ring envelope is aromatic");
                mark(&envelope, rings.ring_bonds(first), &mut atom_flag, &mut bond_flag);
                mark(&[], rings.ring_bonds(second), &mut atom_flag, &mut bond_flag);
            }
        }
    }

    AromaticAssignment {
        atoms: (0..atom_flag.len()).filter(|&a| atom_flag[a]).collect(),
        bonds: (0..bond_flag.len()).filter(|&b| bond_flag[b]).collect(),
    }
}

/// Applies [`perceive`] to a molecule, returning the aromatized copy.
pub fn aromatize(molecule: Molecule, rings: &RingInfo) -> Molecule {
    let assignment = perceive(&molecule, rings);
    if assignment.is_empty() {
        return molecule;
    }

    let (mut atoms, mut bonds) = molecule.into_parts();
    for &a in &assignment.atoms {
        atoms[a].is_aromatic = true;
    }
    for &b in &assignment.bonds {
        bonds[b].order = BondOrder::Aromatic;
    }

    Molecule::from_validated_parts(atoms, bonds)
}

fn is_huckel(ring: impl Iterator<Item = AtomId>, electrons: &[Option<u8>]) -> bool {
    let mut total = 0u32;
    for a in ring {
        match electrons[a] {
            Some(e) => total += u32::from(e),
            None => return false,
        }
    }
    total % 4 == 2
}

fn mark(atoms: &[AtomId], bonds: &[usize], atom_flag: &mut [bool], bond_flag: &mut [bool]) {
    for &a in atoms {
        atom_flag[a] = true;
    }
    for &b in bonds {
        bond_flag[b] = true;
    }
}

// π electrons an unflagged ring atom donates to a cyclic system, or `None`
// when the atom breaks conjugation.
fn pi_electrons<G: MolecularGraph + ?Sized>(
    graph: &G,
    rings: &RingInfo,
    atom: AtomId,
) -> Option<u8> {
    let a = &graph.atoms()[atom];
    if a.is_aromatic || !rings.is_atom_in_ring(atom) {
        return None;
    }

    let mut ring_double = false;
    let mut exo_hetero_double = false;

    for &(n, b) in graph.neighbors(atom) {
        match graph.bonds()[b].order {
            BondOrder::Single => {}
            BondOrder::Double if rings.is_bond_in_ring(b) => {
                if ring_double {
                    return None;
                }
                ring_double = true;
            }
            BondOrder::Double => {
                let partner = graph.atoms()[n].element;
                if matches!(partner, Element::O | Element::N | Element::S) {
                    exo_hetero_double = true;
                } else {
                    return None;
                }
            }
            BondOrder::Triple | BondOrder::Aromatic => return None,
        }
    }

    match (ring_double, exo_hetero_double) {
        (true, false) => return Some(1),
        (true, true) => return None,
        (false, true) => return Some(0),
        (false, false) => {}
    }

    let connections = graph.degree(atom) + usize::from(a.implicit_hydrogens);
    match (a.element, a.formal_charge) {
        (Element::C, -1) => Some(2),
        (Element::C, 1) | (Element::B, 0) => Some(0),
        (Element::N | Element::P, 0) if connections == 3 => Some(2),
        (Element::N, -1) if connections == 2 => Some(2),
        (Element::O | Element::S | Element::Se, 0) if connections == 2 => Some(2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::molecule::Bond;

    fn kekule_ring(elements: &[(Element, u8)], doubles: &[usize]) -> Molecule {
        let n = elements.len();
        let atoms = elements
            .iter()
            .map(|&(e, h)| Atom::new(e).with_hydrogens(h))
            .collect();
        let bonds = (0..n)
            .map(|i| {
                let order = if doubles.contains(&i) {
                    BondOrder::Double
                } else {
                    BondOrder::Single
                };
                Bond::new(i, (i + 1) % n, order)
            })
            .collect();
        Molecule::new(atoms, bonds).unwrap()
    }

    fn make_benzene() -> Molecule {
        kekule_ring(&[(Element::C, 1); 6], &[0, 2, 4])
    }

    #[test]
    fn benzene_is_aromatic() {
        let mol = make_benzene();
        let rings = RingInfo::perceive(&mol);
        let aromatic = aromatize(mol, &rings);
        assert!(aromatic.atoms().iter().all(|a| a.is_aromatic));
        assert!(
            aromatic
                .bonds()
                .iter()
                .all(|b| b.order == BondOrder::Aromatic)
        );
    }

    #[test]
    fn cyclohexene_is_not_aromatic() {
        let mol = kekule_ring(
            &[
                (Element::C, 1),
                (Element::C, 1),
                (Element::C, 2),
                (Element::C, 2),
                (Element::C, 2),
                (Element::C, 2),
            ],
            &[0],
        );
        let rings = RingInfo::perceive(&mol);
        assert!(perceive(&mol, &rings).is_empty());
    }

    #[test]
    fn pyrrole_nitrogen_donates_lone_pair() {
        // N1C=CC=C1
        let mol = kekule_ring(
            &[
                (Element::N, 1),
                (Element::C, 1),
                (Element::C, 1),
                (Element::C, 1),
                (Element::C, 1),
            ],
            &[1, 3],
        );
        let rings = RingInfo::perceive(&mol);
        assert_eq!(perceive(&mol, &rings).atoms.len(), 5);
    }

    #[test]
    fn cyclopentadiene_is_not_aromatic() {
        let mol = kekule_ring(
            &[
                (Element::C, 2),
                (Element::C, 1),
                (Element::C, 1),
                (Element::C, 1),
                (Element::C, 1),
            ],
            &[1, 3],
        );
        let rings = RingInfo::perceive(&mol);
        assert!(perceive(&mol, &rings).is_empty());
    }

    #[test]
    fn thiazine_ring_of_phenothiazine_is_not_aromatic() {
        // Central ring: N-C=C-S-C=C with 8 π electrons.
        let mol = kekule_ring(
            &[
                (Element::N, 1),
                (Element::C, 1),
                (Element::C, 1),
                (Element::S, 0),
                (Element::C, 1),
                (Element::C, 1),
            ],
            &[1, 4],
        );
        let rings = RingInfo::perceive(&mol);
        assert!(perceive(&mol, &rings).is_empty());
    }
}
