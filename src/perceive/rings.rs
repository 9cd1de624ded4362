//! Smallest set of smallest rings (SSSR).
//!
//! Candidate cycles are generated Horton-style (for every root atom and
//! every bond, the cycle closed by the two shortest root paths), sorted by
//! size and filtered for linear independence over GF(2) until the
//! cyclomatic number is reached.

use std::collections::{HashSet, VecDeque};

use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingInfo {
    /// Each ring as a closed walk of atom ids; consecutive atoms (and the
    /// last/first pair) are bonded.
    rings: Vec<Vec<AtomId>>,
    /// Bond indices of each ring, parallel to `rings`.
    ring_bonds: Vec<Vec<usize>>,
    atom_rings: Vec<Vec<usize>>,
    bond_rings: Vec<Vec<usize>>,
}

impl RingInfo {
    pub fn perceive<G: MolecularGraph + ?Sized>(graph: &G) -> Self {
        let atom_count = graph.atom_count();
        let bond_count = graph.bond_count();

        let mut info = RingInfo {
            rings: Vec::new(),
            ring_bonds: Vec::new(),
            atom_rings: vec![Vec::new(); atom_count],
            bond_rings: vec![Vec::new(); bond_count],
        };

        let target = cyclomatic_number(graph);
        if target == 0 {
            return info;
        }

        let mut candidates = horton_candidates(graph);
        candidates.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.1.cmp(&b.1)));

        let words = bond_count.div_ceil(64);
        let mut basis: Vec<Vec<u64>> = Vec::new();

        for (atoms, bonds) in candidates {
            if info.rings.len() == target {
                break;
            }
            let mut vector = vec![0u64; words];
            for &b in &bonds {
                vector[b / 64] |= 1 << (b % 64);
            }
            if !reduce_and_insert(&mut basis, vector) {
                continue;
            }

            let ring_idx = info.rings.len();
            for &a in &atoms {
                info.atom_rings[a].push(ring_idx);
            }
            for &b in &bonds {
                info.bond_rings[b].push(ring_idx);
            }
            info.rings.push(atoms);
            info.ring_bonds.push(bonds);
        }

        info
    }

    pub fn rings(&self) -> &[Vec<AtomId>] {
        &self.rings
    }

    pub fn ring_bonds(&self, ring: usize) -> &[usize] {
        &self.ring_bonds[ring]
    }

    #[inline]
    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    #[inline]
    pub fn is_atom_in_ring(&self, atom: AtomId) -> bool {
        self.atom_rings.get(atom).is_some_and(|r| !r.is_empty())
    }

    #[inline]
    pub fn is_bond_in_ring(&self, bond: usize) -> bool {
        self.bond_rings.get(bond).is_some_and(|r| !r.is_empty())
    }

    /// Number of SSSR rings containing `atom`.
    pub fn atom_ring_count(&self, atom: AtomId) -> usize {
        self.atom_rings.get(atom).map_or(0, Vec::len)
    }

    /// Ring indices containing `atom`.
    pub fn atom_rings(&self, atom: AtomId) -> &[usize] {
        self.atom_rings.get(atom).map_or(&[], Vec::as_slice)
    }

    pub fn is_atom_in_ring_of_size(&self, atom: AtomId, size: usize) -> bool {
        self.atom_rings(atom)
            .iter()
            .any(|&r| self.rings[r].len() == size)
    }

    pub fn smallest_ring_size(&self, atom: AtomId) -> Option<usize> {
        self.atom_rings(atom)
            .iter()
            .map(|&r| self.rings[r].len())
            .min()
    }

    /// Number of ring bonds incident to `atom`.
    pub fn ring_bond_count<G: MolecularGraph + ?Sized>(&self, graph: &G, atom: AtomId) -> usize {
        graph
            .neighbors(atom)
            .iter()
            .filter(|&&(_, b)| self.is_bond_in_ring(b))
            .count()
    }
}

fn cyclomatic_number<G: MolecularGraph + ?Sized>(graph: &G) -> usize {
    let n = graph.atom_count();
    let mut seen = vec![false; n];
    let mut components = 0;
    for start in 0..n {
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        let mut stack = vec![start];
        while let Some(a) = stack.pop() {
            for &(next, _) in graph.neighbors(a) {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
    }
    (graph.bond_count() + components).saturating_sub(n)
}

type Cycle = (Vec<AtomId>, Vec<usize>);

fn horton_candidates<G: MolecularGraph + ?Sized>(graph: &G) -> Vec<Cycle> {
    let n = graph.atom_count();
    // Atoms of degree < 2 never sit on a cycle.
    let cyclic: Vec<bool> = (0..n).map(|a| graph.degree(a) >= 2).collect();

    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut cycles = Vec::new();

    for root in (0..n).filter(|&a| cyclic[a]) {
        let parent = bfs_tree(graph, root, &cyclic);

        for (bond_idx, bond) in graph.bonds().iter().enumerate() {
            let (x, y) = (bond.i, bond.j);
            if !cyclic[x] || !cyclic[y] {
                continue;
            }
            if parent[x].is_none() || parent[y].is_none() {
                continue;
            }
            // The bond must not be a tree edge of this root.
            if parent[x].is_some_and(|(p, b)| p == y && b == bond_idx)
                || parent[y].is_some_and(|(p, b)| p == x && b == bond_idx)
            {
                continue;
            }

            let (path_x, bonds_x) = path_to_root(&parent, root, x);
            let (path_y, bonds_y) = path_to_root(&parent, root, y);

            let shared: HashSet<AtomId> = path_x.iter().copied().collect();
            if path_y.iter().filter(|a| shared.contains(a)).count() != 1 {
                continue;
            }

            let mut atoms = path_x.clone();
            atoms.extend(path_y.iter().rev().filter(|&&a| a != root));

            let mut bonds: Vec<usize> = bonds_x.into_iter().chain(bonds_y).collect();
            bonds.push(bond_idx);
            bonds.sort_unstable();

            if seen.insert(bonds.clone()) {
                cycles.push((atoms, bonds));
            }
        }
    }

    cycles
}

// Returns, per atom, the (parent, bond) pair on the BFS tree from `root`;
// the root maps to itself.
fn bfs_tree<G: MolecularGraph + ?Sized>(
    graph: &G,
    root: AtomId,
    cyclic: &[bool],
) -> Vec<Option<(AtomId, usize)>> {
    let mut parent = vec![None; graph.atom_count()];
    parent[root] = Some((root, usize::MAX));
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        for &(next, bond) in graph.neighbors(current) {
            if cyclic[next] && parent[next].is_none() {
                parent[next] = Some((current, bond));
                queue.push_back(next);
            }
        }
    }

    parent
}

// Path from `root` to `atom` (inclusive on both ends) with the bonds walked.
fn path_to_root(
    parent: &[Option<(AtomId, usize)>],
    root: AtomId,
    atom: AtomId,
) -> (Vec<AtomId>, Vec<usize>) {
    let mut atoms = vec![atom];
    let mut bonds = Vec::new();
    let mut current = atom;
    while current != root {
        let Some((p, b)) = parent[current] else {
            break;
        };
        bonds.push(b);
        atoms.push(p);
        current = p;
    }
    atoms.reverse();
    bonds.reverse();
    (atoms, bonds)
}

// Gaussian elimination over GF(2); inserts `vector` when it is independent
// of the current basis.
fn reduce_and_insert(basis: &mut Vec<Vec<u64>>, mut vector: Vec<u64>) -> bool {
    for row in basis.iter() {
        let pivot = leading_bit(row);
        if let Some(p) = pivot {
            if vector[p / 64] & (1 << (p % 64)) != 0 {
                for (v, r) in vector.iter_mut().zip(row) {
                    *v ^= r;
                }
            }
        }
    }
    if leading_bit(&vector).is_none() {
        return false;
    }
    basis.push(vector);
    basis.sort_by_key(|row| std::cmp::Reverse(leading_bit(row)));
    true
}

fn leading_bit(row: &[u64]) -> Option<usize> {
    row.iter()
        .enumerate()
        .rev()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + 63 - w.leading_zeros() as usize)
}
