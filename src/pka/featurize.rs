//! Graph featurization for the pKa networks.
//!
//! Atom rows are laid out as fixed one-hot blocks (see [`ATOM_FEATURES`]);
//! every bond yields two directed edges, `i → j` followed by `j → i`.

use super::error::Error;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;
use crate::model::types::{BondOrder, Element, Hybridization};
use crate::perceive::RingInfo;

const ELEMENT_SLOTS: usize = 12;
const CHARGE_SLOTS: usize = 5;
const HYBRIDIZATION_SLOTS: usize = 6;
const HYDROGEN_SLOTS: usize = 5;
const DEGREE_SLOTS: usize = 6;

/// Width of one atom row: element, charge, aromatic, hybridization, total H,
/// implicit H, degree, ring and candidate blocks.
pub const ATOM_FEATURES: usize =
    ELEMENT_SLOTS + CHARGE_SLOTS + 1 + HYBRIDIZATION_SLOTS + HYDROGEN_SLOTS + 1 + DEGREE_SLOTS + 1 + 1;

const CANDIDATE_SLOT: usize = ATOM_FEATURES - 1;

/// Width of one edge row: single, double, triple, aromatic, in ring.
pub const BOND_FEATURES: usize = 5;

/// Model input for one (molecule, candidate atom) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    num_atoms: usize,
    atom_features: Vec<f32>,
    edge_index: Vec<(usize, usize)>,
    edge_features: Vec<f32>,
    target: AtomId,
}

impl FeatureTensor {
    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.len()
    }

    /// Row-major `num_atoms × ATOM_FEATURES` matrix.
    pub fn atom_features(&self) -> &[f32] {
        &self.atom_features
    }

    pub fn atom_row(&self, atom: AtomId) -> &[f32] {
        &self.atom_features[atom * ATOM_FEATURES..(atom + 1) * ATOM_FEATURES]
    }

    /// Directed `(source, target)` pairs.
    pub fn edge_index(&self) -> &[(usize, usize)] {
        &self.edge_index
    }

    /// Row-major `num_edges × BOND_FEATURES` matrix aligned with `edge_index`.
    pub fn edge_features(&self) -> &[f32] {
        &self.edge_features
    }

    pub fn target(&self) -> AtomId {
        self.target
    }
}

/// Encodes `molecule` with `atom` marked as the candidate site.
pub fn featurize<G: MolecularGraph + ?Sized>(
    molecule: &G,
    atom: AtomId,
) -> Result<FeatureTensor, Error> {
    let n = molecule.atom_count();
    if atom >= n {
        return Err(Error::invalid_atom_id(atom, n));
    }
    Featurizer::new(molecule).encode(atom)
}

/// Per-molecule encoding shared by all candidate sites.
///
/// Rings are perceived and every atom and bond row is written once; each
/// call to [`encode`](Featurizer::encode) only sets the candidate flag.
#[derive(Debug, Clone)]
pub struct Featurizer {
    num_atoms: usize,
    atom_features: Vec<f32>,
    edge_index: Vec<(usize, usize)>,
    edge_features: Vec<f32>,
}

impl Featurizer {
    pub fn new<G: MolecularGraph + ?Sized>(molecule: &G) -> Self {
        let n = molecule.atom_count();
        let rings = RingInfo::perceive(molecule);

        let mut atom_features = vec![0.0f32; n * ATOM_FEATURES];
        for (id, row) in atom_features.chunks_exact_mut(ATOM_FEATURES).enumerate() {
            encode_atom(molecule, &rings, id, row);
        }

        let bond_count = molecule.bond_count();
        let mut edge_index = Vec::with_capacity(2 * bond_count);
        let mut edge_features = Vec::with_capacity(2 * bond_count * BOND_FEATURES);
        for (idx, bond) in molecule.bonds().iter().enumerate() {
            let row = encode_bond(bond.order, rings.is_bond_in_ring(idx));
            for pair in [(bond.i, bond.j), (bond.j, bond.i)] {
                edge_index.push(pair);
                edge_features.extend_from_slice(&row);
            }
        }

        Self {
            num_atoms: n,
            atom_features,
            edge_index,
            edge_features,
        }
    }

    /// Feature tensor with `atom` marked as the candidate site.
    pub fn encode(&self, atom: AtomId) -> Result<FeatureTensor, Error> {
        if atom >= self.num_atoms {
            return Err(Error::invalid_atom_id(atom, self.num_atoms));
        }
        let mut atom_features = self.atom_features.clone();
        atom_features[atom * ATOM_FEATURES + CANDIDATE_SLOT] = 1.0;

        Ok(FeatureTensor {
            num_atoms: self.num_atoms,
            atom_features,
            edge_index: self.edge_index.clone(),
            edge_features: self.edge_features.clone(),
            target: atom,
        })
    }
}

fn encode_atom<G: MolecularGraph + ?Sized>(
    graph: &G,
    rings: &RingInfo,
    id: AtomId,
    row: &mut [f32],
) {
    let atom = &graph.atoms()[id];
    let charge = usize::from((atom.formal_charge.clamp(-2, 2) + 2).unsigned_abs());

    let mut w = RowWriter { row, offset: 0 };
    w.one_hot(element_slot(atom.element), ELEMENT_SLOTS);
    w.one_hot(charge, CHARGE_SLOTS);
    w.value(flag(atom.is_aromatic));
    w.one_hot(hybridization_slot(atom.hybridization), HYBRIDIZATION_SLOTS);
    w.one_hot(usize::from(graph.total_hydrogens(id)), HYDROGEN_SLOTS);
    w.value(f32::from(atom.implicit_hydrogens));
    w.one_hot(graph.degree(id), DEGREE_SLOTS);
    w.value(flag(rings.is_atom_in_ring(id)));
    w.value(0.0); // candidate
    debug_assert_eq!(w.offset, ATOM_FEATURES);
}

struct RowWriter<'a> {
    row: &'a mut [f32],
    offset: usize,
}

impl RowWriter<'_> {
    /// Sets one slot of a `width`-wide block; overflow lands in the last slot.
    fn one_hot(&mut self, slot: usize, width: usize) {
        self.row[self.offset + slot.min(width - 1)] = 1.0;
        self.offset += width;
    }

    fn value(&mut self, value: f32) {
        self.row[self.offset] = value;
        self.offset += 1;
    }
}

fn encode_bond(order: BondOrder, in_ring: bool) -> [f32; BOND_FEATURES] {
    let mut row = [0.0; BOND_FEATURES];
    let slot = match order {
        BondOrder::Single => 0,
        BondOrder::Double => 1,
        BondOrder::Triple => 2,
        BondOrder::Aromatic => 3,
    };
    row[slot] = 1.0;
    row[4] = flag(in_ring);
    row
}

fn element_slot(element: Element) -> usize {
    match element {
        Element::H => 0,
        Element::C => 1,
        Element::N => 2,
        Element::O => 3,
        Element::F => 4,
        Element::P => 5,
        Element::S => 6,
        Element::Cl => 7,
        Element::Br => 8,
        Element::I => 9,
        Element::B | Element::Si => 10,
        _ => 11,
    }
}

fn hybridization_slot(hybridization: Hybridization) -> usize {
    match hybridization {
        Hybridization::S => 0,
        Hybridization::SP => 1,
        Hybridization::SP2 => 2,
        Hybridization::SP3 => 3,
        Hybridization::SP3D | Hybridization::SP3D2 => 4,
        Hybridization::Unspecified => 5,
    }
}

#[inline]
fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;
    use crate::model::molecule::Molecule;
    use crate::pka::config::NormalizeConfig;
    use crate::pka::normalize::normalize;

    fn make_acetic_acid() -> Molecule {
        io::read_smiles("CC(=O)O").unwrap().add_hydrogens()
    }

    #[test]
    fn feature_widths() {
        assert_eq!(ATOM_FEATURES, 38);
        assert_eq!(BOND_FEATURES, 5);
    }

    #[test]
    fn shapes_and_edges() {
        let mol = make_acetic_acid();
        let tensor = featurize(&mol, 3).unwrap();

        assert_eq!(tensor.num_atoms(), 8);
        assert_eq!(tensor.atom_features().len(), 8 * ATOM_FEATURES);
        assert_eq!(tensor.num_edges(), 2 * mol.bond_count());
        assert_eq!(tensor.edge_features().len(), tensor.num_edges() * BOND_FEATURES);
        assert_eq!(tensor.target(), 3);

        for pair in tensor.edge_index().chunks(2) {
            assert_eq!(pair[0].0, pair[1].1);
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn every_block_is_one_hot() {
        let mol = make_acetic_acid();
        let tensor = featurize(&mol, 3).unwrap();
        for atom in 0..tensor.num_atoms() {
            let row = tensor.atom_row(atom);
            let blocks = [(0, 12), (12, 17), (18, 24), (24, 29), (30, 36)];
            for (start, end) in blocks {
                let hot: f32 = row[start..end].iter().sum();
                assert_eq!(hot, 1.0, "atom {atom} block {start}..{end}");
            }
        }
    }

    #[test]
    fn candidate_flag_marks_only_the_target() {
        let mol = make_acetic_acid();
        let tensor = featurize(&mol, 3).unwrap();
        let flagged: Vec<_> = (0..tensor.num_atoms())
            .filter(|&a| tensor.atom_row(a)[ATOM_FEATURES - 1] == 1.0)
            .collect();
        assert_eq!(flagged, [3]);
    }

    #[test]
    fn hydroxyl_oxygen_encoding() {
        let mol = make_acetic_acid();
        let row = featurize(&mol, 3).unwrap().atom_row(3).to_vec();
        assert_eq!(row[3], 1.0); // oxygen
        assert_eq!(row[12 + 2], 1.0); // neutral
        assert_eq!(row[18 + 2], 1.0); // conjugated, sp2
        assert_eq!(row[24 + 1], 1.0); // one hydrogen
        assert_eq!(row[29], 0.0); // no implicit hydrogens left
        assert_eq!(row[30 + 2], 1.0); // two neighbors
        assert_eq!(row[36], 0.0); // acyclic
    }

    #[test]
    fn aromatic_ring_bonds() {
        let mol = io::read_smiles("c1ccccc1").unwrap();
        let tensor = featurize(&mol, 0).unwrap();
        for edge in tensor.edge_features().chunks(BOND_FEATURES) {
            assert_eq!(edge, [0.0, 0.0, 0.0, 1.0, 1.0]);
        }
        assert_eq!(tensor.atom_row(0)[17], 1.0);
    }

    #[test]
    fn featurization_is_pure() {
        let mol = make_acetic_acid();
        assert_eq!(featurize(&mol, 2).unwrap(), featurize(&mol, 2).unwrap());
    }

    #[test]
    fn shared_featurizer_matches_one_shot_encoding() {
        let mol = normalize(
            &io::read_smiles("NCC(=O)O").unwrap(),
            &NormalizeConfig::default(),
        )
        .unwrap();
        let featurizer = Featurizer::new(&mol);
        for atom in 0..mol.atom_count() {
            assert_eq!(featurizer.encode(atom).unwrap(), featurize(&mol, atom).unwrap());
        }
        assert!(matches!(
            featurizer.encode(mol.atom_count()),
            Err(Error::InvalidAtomId { .. })
        ));
    }

    #[test]
    fn out_of_range_atom_is_rejected() {
        let mol = make_acetic_acid();
        let err = featurize(&mol, mol.atom_count()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAtomId { atom: 8, atom_count: 8 }
        ));
    }
}
