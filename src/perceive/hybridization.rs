use crate::model::graph::MolecularGraph;
use crate::model::molecule::{AtomId, Molecule};
use crate::model::types::{BondOrder, Element, Hybridization};

/// Assigns a hybridization state from bond multiplicities and the steric
/// number (σ neighbors plus lone pairs). Lone-pair donors bonded to a π
/// system (amide/aniline N, phenol/ester O) are treated as conjugated SP2.
pub fn classify<G: MolecularGraph + ?Sized>(graph: &G, atom: AtomId) -> Hybridization {
    let a = &graph.atoms()[atom];
    if a.is_hydrogen() {
        return Hybridization::S;
    }
    if a.is_aromatic {
        return Hybridization::SP2;
    }

    let mut doubles = 0;
    let mut triples = 0;
    for &(_, b) in graph.neighbors(atom) {
        match graph.bonds()[b].order {
            BondOrder::Double => doubles += 1,
            BondOrder::Triple => triples += 1,
            BondOrder::Aromatic | BondOrder::Single => {}
        }
    }

    let Some(steric) = steric_number(graph, atom) else {
        return Hybridization::Unspecified;
    };

    let period_two = matches!(a.element, Element::B | Element::C | Element::N | Element::O);
    if period_two {
        if triples > 0 || doubles >= 2 {
            return Hybridization::SP;
        }
        if doubles == 1 {
            return Hybridization::SP2;
        }
        if matches!(a.element, Element::N | Element::O)
            && steric == 4
            && a.formal_charge <= 0
            && is_conjugated_donor(graph, atom)
        {
            return Hybridization::SP2;
        }
    }

    match steric {
        0 | 1 => Hybridization::S,
        2 => Hybridization::SP,
        3 => Hybridization::SP2,
        4 => Hybridization::SP3,
        5 => Hybridization::SP3D,
        6 => Hybridization::SP3D2,
        _ => Hybridization::Unspecified,
    }
}

/// Returns a copy of `molecule` with every atom's hybridization assigned.
pub fn assign(molecule: Molecule) -> Molecule {
    let states: Vec<Hybridization> = (0..molecule.atom_count())
        .map(|a| classify(&molecule, a))
        .collect();

    let (mut atoms, bonds) = molecule.into_parts();
    for (atom, state) in atoms.iter_mut().zip(states) {
        atom.hybridization = state;
    }
    Molecule::from_validated_parts(atoms, bonds)
}

fn steric_number<G: MolecularGraph + ?Sized>(graph: &G, atom: AtomId) -> Option<usize> {
    let a = &graph.atoms()[atom];
    let electrons = i16::from(a.element.valence_electrons()?);
    let hydrogens = i16::from(a.implicit_hydrogens);

    let mut bond_electrons = hydrogens;
    for &(_, b) in graph.neighbors(atom) {
        bond_electrons += match graph.bonds()[b].order {
            BondOrder::Aromatic => 1,
            order => i16::from(order.valence()),
        };
    }

    let lone_pairs = ((electrons - i16::from(a.formal_charge) - bond_electrons) / 2).max(0);
    let sigma = graph.degree(atom) + usize::from(a.implicit_hydrogens);
    Some(sigma + lone_pairs as usize)
}

fn is_conjugated_donor<G: MolecularGraph + ?Sized>(graph: &G, atom: AtomId) -> bool {
    graph.neighbors(atom).iter().any(|&(n, _)| {
        let neighbor = &graph.atoms()[n];
        neighbor.is_aromatic
            || graph.neighbors(n).iter().any(|&(_, b)| {
                matches!(
                    graph.bonds()[b].order,
                    BondOrder::Double | BondOrder::Triple | BondOrder::Aromatic
                )
            })
    })
}
