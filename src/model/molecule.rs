use std::collections::VecDeque;

use thiserror::Error;

use super::atom::Atom;
use super::graph::MolecularGraph;
use super::types::{BondOrder, Element, Hybridization};

/// Index of an atom inside one specific [`Molecule`] instance.
pub type AtomId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    pub i: AtomId,
    pub j: AtomId,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(idx1: AtomId, idx2: AtomId, order: BondOrder) -> Self {
        if idx1 <= idx2 {
            Self { i: idx1, j: idx2, order }
        } else {
            Self { i: idx2, j: idx1, order }
        }
    }

    /// Returns the partner of `atom` in this bond.
    pub fn other(&self, atom: AtomId) -> Option<AtomId> {
        if self.i == atom {
            Some(self.j)
        } else if self.j == atom {
            Some(self.i)
        } else {
            None
        }
    }
}

/// Structural problems detected while assembling a [`Molecule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("bond {bond} references atom {atom}, but the molecule has only {atom_count} atoms")]
    AtomOutOfRange {
        bond: usize,
        atom: AtomId,
        atom_count: usize,
    },

    #[error("bond {bond} connects atom {atom} to itself")]
    SelfBond { bond: usize, atom: AtomId },

    #[error("atoms {i} and {j} are bonded more than once")]
    DuplicateBond { i: AtomId, j: AtomId },
}

/// An immutable molecular graph.
///
/// The atom and bond lists are fixed at construction; every transformation
/// ([`add_hydrogens`](Self::add_hydrogens), [`remove_hydrogens`](Self::remove_hydrogens),
/// [`subgraph`](Self::subgraph)) returns a new molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<(AtomId, usize)>>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Result<Self, GraphError> {
        let atom_count = atoms.len();
        let mut adjacency: Vec<Vec<(AtomId, usize)>> = vec![Vec::new(); atom_count];

        for (idx, bond) in bonds.iter().enumerate() {
            for atom in [bond.i, bond.j] {
                if atom >= atom_count {
                    return Err(GraphError::AtomOutOfRange {
                        bond: idx,
                        atom,
                        atom_count,
                    });
                }
            }
            if bond.i == bond.j {
                return Err(GraphError::SelfBond {
                    bond: idx,
                    atom: bond.i,
                });
            }
            if adjacency[bond.i].iter().any(|&(n, _)| n == bond.j) {
                return Err(GraphError::DuplicateBond {
                    i: bond.i,
                    j: bond.j,
                });
            }
            adjacency[bond.i].push((bond.j, idx));
            adjacency[bond.j].push((bond.i, idx));
        }

        Ok(Self {
            atoms,
            bonds,
            adjacency,
        })
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    #[inline]
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| !a.is_hydrogen()).count()
    }

    pub fn net_charge(&self) -> i32 {
        self.atoms.iter().map(|a| i32::from(a.formal_charge)).sum()
    }

    pub fn into_parts(self) -> (Vec<Atom>, Vec<Bond>) {
        (self.atoms, self.bonds)
    }

    /// Returns a copy in which every implicit hydrogen is an explicit atom.
    ///
    /// New hydrogens are appended after all existing atoms, grouped by
    /// parent in parent order, so existing atom ids stay valid.
    pub fn add_hydrogens(&self) -> Molecule {
        let added: usize = self
            .atoms
            .iter()
            .map(|a| usize::from(a.implicit_hydrogens))
            .sum();
        if added == 0 {
            return self.clone();
        }

        let mut atoms = self.atoms.clone();
        let mut bonds = self.bonds.clone();
        atoms.reserve(added);
        bonds.reserve(added);

        for (parent, atom) in self.atoms.iter().enumerate() {
            for _ in 0..atom.implicit_hydrogens {
                let h = atoms.len();
                let mut hydrogen = Atom::new(Element::H);
                hydrogen.hybridization = Hybridization::S;
                atoms.push(hydrogen);
                bonds.push(Bond::new(parent, h, BondOrder::Single));
            }
            atoms[parent].implicit_hydrogens = 0;
        }

        Self::from_validated_parts(atoms, bonds)
    }

    /// Folds plain explicit hydrogens back into their parent's implicit count.
    ///
    /// Charged, isotopic, bridging and H–H hydrogens are kept as atoms.
    pub fn remove_hydrogens(&self) -> Molecule {
        let mut atoms = self.atoms.clone();
        let mut keep = vec![true; self.atoms.len()];

        for (idx, atom) in self.atoms.iter().enumerate() {
            if !atom.is_hydrogen() || atom.formal_charge != 0 || atom.isotope.is_some() {
                continue;
            }
            let [(parent, bond)] = self.adjacency[idx].as_slice() else {
                continue;
            };
            if self.atoms[*parent].is_hydrogen() || self.bonds[*bond].order != BondOrder::Single {
                continue;
            }
            keep[idx] = false;
            atoms[*parent].implicit_hydrogens += 1;
        }

        if keep.iter().all(|&k| k) {
            return self.clone();
        }

        let retained: Vec<AtomId> = (0..atoms.len()).filter(|&i| keep[i]).collect();
        Self::extract(&atoms, &self.bonds, &retained)
    }

    /// Groups atom ids by connected component, ordered by lowest member.
    pub fn connected_components(&self) -> Vec<Vec<AtomId>> {
        let mut seen = vec![false; self.atoms.len()];
        let mut components = Vec::new();

        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for &(next, _) in &self.adjacency[current] {
                    if !seen[next] {
                        seen[next] = true;
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Builds the induced subgraph over `atoms`, preserving relative order.
    pub fn subgraph(&self, atoms: &[AtomId]) -> Molecule {
        let mut retained: Vec<AtomId> = atoms
            .iter()
            .copied()
            .filter(|&a| a < self.atoms.len())
            .collect();
        retained.sort_unstable();
        retained.dedup();
        Self::extract(&self.atoms, &self.bonds, &retained)
    }

    fn extract(atoms: &[Atom], bonds: &[Bond], retained: &[AtomId]) -> Molecule {
        let mut remap = vec![None; atoms.len()];
        for (new, &old) in retained.iter().enumerate() {
            remap[old] = Some(new);
        }

        let new_atoms = retained.iter().map(|&old| atoms[old].clone()).collect();
        let new_bonds = bonds
            .iter()
            .filter_map(|b| match (remap[b.i], remap[b.j]) {
                (Some(i), Some(j)) => Some(Bond::new(i, j, b.order)),
                _ => None,
            })
            .collect();

        Self::from_validated_parts(new_atoms, new_bonds)
    }

    /// Rebuilds adjacency without validation. Callers must only pass bonds
    /// taken (possibly re-ordered) from an already validated molecule.
    pub(crate) fn from_validated_parts(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Molecule {
        let mut adjacency: Vec<Vec<(AtomId, usize)>> = vec![Vec::new(); atoms.len()];
        for (idx, bond) in bonds.iter().enumerate() {
            adjacency[bond.i].push((bond.j, idx));
            adjacency[bond.j].push((bond.i, idx));
        }
        Self {
            atoms,
            bonds,
            adjacency,
        }
    }
}

impl MolecularGraph for Molecule {
    #[inline]
    fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    #[inline]
    fn neighbors(&self, id: AtomId) -> &[(AtomId, usize)] {
        &self.adjacency[id]
    }

    fn with_explicit_hydrogens(&self) -> Self {
        self.add_hydrogens()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Methanol with implicit hydrogens: C(3H)-O(1H).
    fn make_methanol() -> Molecule {
        let atoms = vec![
            Atom::new(Element::C).with_hydrogens(3),
            Atom::new(Element::O).with_hydrogens(1),
        ];
        Molecule::new(atoms, vec![Bond::new(0, 1, BondOrder::Single)]).unwrap()
    }

    #[test]
    fn bond_new_normalizes_order() {
        let b = Bond::new(5, 2, BondOrder::Double);
        assert_eq!((b.i, b.j), (2, 5));
        assert_eq!(b.other(2), Some(5));
        assert_eq!(b.other(7), None);
    }

    #[test]
    fn new_rejects_out_of_range_bond() {
        let atoms = vec![Atom::new(Element::C)];
        let err = Molecule::new(atoms, vec![Bond::new(0, 3, BondOrder::Single)]).unwrap_err();
        assert_eq!(
            err,
            GraphError::AtomOutOfRange {
                bond: 0,
                atom: 3,
                atom_count: 1
            }
        );
    }

    #[test]
    fn new_rejects_self_and_duplicate_bonds() {
        let atoms = vec![Atom::new(Element::C), Atom::new(Element::C)];
        assert!(matches!(
            Molecule::new(atoms.clone(), vec![Bond::new(1, 1, BondOrder::Single)]),
            Err(GraphError::SelfBond { atom: 1, .. })
        ));
        assert!(matches!(
            Molecule::new(
                atoms,
                vec![
                    Bond::new(0, 1, BondOrder::Single),
                    Bond::new(1, 0, BondOrder::Double)
                ]
            ),
            Err(GraphError::DuplicateBond { i: 0, j: 1 })
        ));
    }

    #[test]
    fn add_hydrogens_appends_after_heavy_atoms() {
        let mol = make_methanol();
        let h = mol.add_hydrogens();

        assert_eq!(h.atom_count(), 6);
        assert_eq!(h.bond_count(), 5);
        assert_eq!(h.atoms()[0].element, Element::C);
        assert_eq!(h.atoms()[1].element, Element::O);
        assert!(h.atoms()[2..].iter().all(|a| a.is_hydrogen()));
        assert!(h.atoms().iter().all(|a| a.implicit_hydrogens == 0));
        assert_eq!(h.total_hydrogens(0), 3);
        assert_eq!(h.total_hydrogens(1), 1);
        assert_eq!(h.neighbors(5), &[(1, 4)]);
    }

    #[test]
    fn add_hydrogens_is_idempotent() {
        let once = make_methanol().add_hydrogens();
        let twice = once.add_hydrogens();
        assert_eq!(once, twice);
    }

    #[test]
    fn remove_hydrogens_restores_implicit_counts() {
        let mol = make_methanol();
        let folded = mol.add_hydrogens().remove_hydrogens();
        assert_eq!(folded, mol);
    }

    #[test]
    fn connected_components_and_subgraph() {
        let atoms = vec![
            Atom::new(Element::C),
            Atom::new(Element::Na).with_charge(1),
            Atom::new(Element::O).with_charge(-1),
        ];
        let mol = Molecule::new(atoms, vec![Bond::new(0, 2, BondOrder::Single)]).unwrap();

        let components = mol.connected_components();
        assert_eq!(components, vec![vec![0, 2], vec![1]]);

        let fragment = mol.subgraph(&components[0]);
        assert_eq!(fragment.atom_count(), 2);
        assert_eq!(fragment.bonds(), &[Bond::new(0, 1, BondOrder::Single)]);
        assert_eq!(fragment.net_charge(), -1);
    }
}
