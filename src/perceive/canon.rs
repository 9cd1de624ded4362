//! Canonical atom ranking.
//!
//! Atoms start from a local invariant, are refined by the sorted ranks of
//! their neighbors until the partition is stable, and remaining ties are
//! broken one class at a time (lowest rank first), refining after each
//! break. Tied atoms left after refinement are treated as symmetry
//! equivalent, so which one is broken first does not change the result.

use crate::model::graph::MolecularGraph;
use crate::model::types::BondOrder;

type Invariant = (u8, u8, u16, usize, u8, i8, bool);

pub fn canonical_ranks<G: MolecularGraph + ?Sized>(graph: &G) -> Vec<usize> {
    let n = graph.atom_count();
    if n == 0 {
        return Vec::new();
    }

    let invariants: Vec<Invariant> = (0..n).map(|a| invariant(graph, a)).collect();
    let mut ranks = dense_ranks(&invariants);
    refine(graph, &mut ranks);

    while let Some(tied) = lowest_tied_class(&ranks) {
        let chosen = (0..n).find(|&a| ranks[a] == tied).unwrap_or(0);
        let mut split: Vec<(usize, bool)> = ranks.iter().map(|&r| (r, false)).collect();
        split[chosen].1 = true;
        // The chosen atom sorts after its former peers.
        ranks = dense_ranks(&split);
        refine(graph, &mut ranks);
    }

    ranks
}

fn invariant<G: MolecularGraph + ?Sized>(graph: &G, atom: usize) -> Invariant {
    let a = &graph.atoms()[atom];
    (
        u8::from(a.is_hydrogen()),
        a.element.atomic_number(),
        a.isotope.unwrap_or(0),
        graph.degree(atom),
        graph.total_hydrogens(atom),
        a.formal_charge,
        a.is_aromatic,
    )
}

fn bond_code(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Aromatic => 4,
    }
}

fn refine<G: MolecularGraph + ?Sized>(graph: &G, ranks: &mut Vec<usize>) {
    let mut classes = class_count(ranks);
    loop {
        let keys: Vec<(usize, Vec<(usize, u8)>)> = (0..ranks.len())
            .map(|a| {
                let mut around: Vec<(usize, u8)> = graph
                    .neighbors(a)
                    .iter()
                    .map(|&(nb, b)| (ranks[nb], bond_code(graph.bonds()[b].order)))
                    .collect();
                around.sort_unstable();
                (ranks[a], around)
            })
            .collect();

        let next = dense_ranks(&keys);
        let next_classes = class_count(&next);
        *ranks = next;
        if next_classes == classes {
            break;
        }
        classes = next_classes;
    }
}

fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let mut ranks = vec![0; keys.len()];
    let mut current = 0;
    for (pos, &idx) in order.iter().enumerate() {
        if pos > 0 && keys[order[pos - 1]] != keys[idx] {
            current += 1;
        }
        ranks[idx] = current;
    }
    ranks
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().copied().max().map_or(0, |m| m + 1)
}

fn lowest_tied_class(ranks: &[usize]) -> Option<usize> {
    let mut counts = vec![0usize; class_count(ranks)];
    for &r in ranks {
        counts[r] += 1;
    }
    counts.iter().position(|&c| c > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::molecule::{Bond, Molecule};
    use crate::model::types::Element;

    fn make_ethanol(order: [usize; 3]) -> Molecule {
        // `order` places C(methyl), C(methylene), O at the given indices.
        let mut atoms = vec![Atom::new(Element::C); 3];
        atoms[order[0]] = Atom::new(Element::C).with_hydrogens(3);
        atoms[order[1]] = Atom::new(Element::C).with_hydrogens(2);
        atoms[order[2]] = Atom::new(Element::O).with_hydrogens(1);
        let bonds = vec![
            Bond::new(order[0], order[1], BondOrder::Single),
            Bond::new(order[1], order[2], BondOrder::Single),
        ];
        Molecule::new(atoms, bonds).unwrap()
    }

    #[test]
    fn ranks_are_a_permutation() {
        let ranks = canonical_ranks(&make_ethanol([0, 1, 2]));
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn ranks_follow_atoms_not_indices() {
        let a = make_ethanol([0, 1, 2]);
        let b = make_ethanol([2, 0, 1]);
        let ra = canonical_ranks(&a);
        let rb = canonical_ranks(&b);
        assert_eq!(ra[0], rb[2]);
        assert_eq!(ra[1], rb[0]);
        assert_eq!(ra[2], rb[1]);
    }

    #[test]
    fn symmetric_atoms_are_split() {
        // Propane: both methyls are equivalent until the tie is broken.
        let atoms = vec![
            Atom::new(Element::C).with_hydrogens(3),
            Atom::new(Element::C).with_hydrogens(2),
            Atom::new(Element::C).with_hydrogens(3),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
        ];
        let ranks = canonical_ranks(&Molecule::new(atoms, bonds).unwrap());
        assert_ne!(ranks[0], ranks[2]);
        assert_eq!(ranks[1], 2);
    }
}
