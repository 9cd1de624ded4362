use super::atom::Atom;
use super::molecule::{AtomId, Bond};

/// Read access to a molecular graph plus hydrogen completion.
///
/// Perception, substructure matching, site detection and featurization are
/// written against this trait rather than a concrete container. Implementors
/// must keep `neighbors` consistent with `bonds`: every bond `b` between
/// `i` and `j` appears as `(j, b)` in `neighbors(i)` and as `(i, b)` in
/// `neighbors(j)`.
pub trait MolecularGraph {
    fn atoms(&self) -> &[Atom];

    fn bonds(&self) -> &[Bond];

    /// Neighbor atom ids of `id`, each paired with the connecting bond index.
    fn neighbors(&self, id: AtomId) -> &[(AtomId, usize)];

    /// Returns a graph in which every implicit hydrogen is an explicit atom
    /// appended after the existing ones.
    fn with_explicit_hydrogens(&self) -> Self
    where
        Self: Sized;

    #[inline]
    fn atom_count(&self) -> usize {
        self.atoms().len()
    }

    #[inline]
    fn bond_count(&self) -> usize {
        self.bonds().len()
    }

    #[inline]
    fn degree(&self, id: AtomId) -> usize {
        self.neighbors(id).len()
    }

    /// Number of explicit hydrogen neighbors.
    fn explicit_hydrogens(&self, id: AtomId) -> u8 {
        let atoms = self.atoms();
        self.neighbors(id)
            .iter()
            .filter(|&&(n, _)| atoms[n].is_hydrogen())
            .count()
            .try_into()
            .unwrap_or(u8::MAX)
    }

    /// Implicit plus explicit hydrogens.
    fn total_hydrogens(&self, id: AtomId) -> u8 {
        self.atoms()[id]
            .implicit_hydrogens
            .saturating_add(self.explicit_hydrogens(id))
    }

    fn bond_between(&self, a: AtomId, b: AtomId) -> Option<&Bond> {
        self.neighbors(a)
            .iter()
            .find(|&&(n, _)| n == b)
            .map(|&(_, bond)| &self.bonds()[bond])
    }

    /// Sum of integral bond valences to explicit neighbors of `id`.
    fn bond_valence(&self, id: AtomId) -> u8 {
        self.neighbors(id)
            .iter()
            .map(|&(_, b)| self.bonds()[b].order.valence())
            .sum()
    }
}
