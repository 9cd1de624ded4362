//! Canonical SMILES output.
//!
//! Atoms are visited depth-first from the canonically lowest terminal atom
//! of each fragment, taking neighbors in canonical rank order. A first pass
//! fixes the spanning tree and ring-closure bonds, a second pass writes the
//! string and hands out ring digits (lowest free digit first).

use super::{AROMATIC_SYMBOLS, ORGANIC_SUBSET};
use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;
use crate::model::types::BondOrder;
use crate::perceive::{canon, valence};

pub fn write<G: MolecularGraph + ?Sized>(graph: &G) -> String {
    let n = graph.atom_count();
    let ranks = canon::canonical_ranks(graph);

    let mut starts: Vec<AtomId> = (0..n).collect();
    starts.sort_by_key(|&a| (graph.degree(a), ranks[a]));

    let mut walk = Walk::new(graph, &ranks);
    let mut fragments = Vec::new();
    for start in starts {
        if walk.visited[start] {
            continue;
        }
        walk.explore(start, None);
        fragments.push(start);
    }

    let mut out = String::new();
    let mut digits = RingDigits::default();
    for (idx, &start) in fragments.iter().enumerate() {
        if idx > 0 {
            out.push('.');
        }
        walk.emit(start, &mut digits, &mut out);
    }
    out
}

struct Walk<'a, G: MolecularGraph + ?Sized> {
    graph: &'a G,
    ranks: &'a [usize],
    visited: Vec<bool>,
    closure: Vec<bool>,
    children: Vec<Vec<(AtomId, usize)>>,
    opening: Vec<Vec<(AtomId, usize)>>,
    closing: Vec<Vec<usize>>,
    digit_of: Vec<usize>,
}

impl<'a, G: MolecularGraph + ?Sized> Walk<'a, G> {
    fn new(graph: &'a G, ranks: &'a [usize]) -> Self {
        let n = graph.atom_count();
        Self {
            graph,
            ranks,
            visited: vec![false; n],
            closure: vec![false; graph.bond_count()],
            children: vec![Vec::new(); n],
            opening: vec![Vec::new(); n],
            closing: vec![Vec::new(); n],
            digit_of: vec![0; graph.bond_count()],
        }
    }

    fn sorted_neighbors(&self, atom: AtomId) -> Vec<(AtomId, usize)> {
        let mut neighbors = self.graph.neighbors(atom).to_vec();
        neighbors.sort_by_key(|&(n, _)| self.ranks[n]);
        neighbors
    }

    fn explore(&mut self, atom: AtomId, via: Option<usize>) {
        self.visited[atom] = true;
        for (next, bond) in self.sorted_neighbors(atom) {
            if Some(bond) == via {
                continue;
            }
            if self.visited[next] {
                if !self.closure[bond] {
                    self.closure[bond] = true;
                    self.opening[next].push((atom, bond));
                    self.closing[atom].push(bond);
                }
            } else {
                self.children[atom].push((next, bond));
                self.explore(next, Some(bond));
            }
        }
    }

    fn emit(&mut self, atom: AtomId, digits: &mut RingDigits, out: &mut String) {
        out.push_str(&atom_token(self.graph, atom));

        for bond in std::mem::take(&mut self.closing[atom]) {
            let digit = self.digit_of[bond];
            digits.release(digit);
            push_ring_label(out, digit);
        }
        for (partner, bond) in std::mem::take(&mut self.opening[atom]) {
            let digit = digits.take();
            self.digit_of[bond] = digit;
            out.push_str(bond_token(self.graph, bond, atom, partner));
            push_ring_label(out, digit);
        }

        let children = std::mem::take(&mut self.children[atom]);
        let last = children.len().saturating_sub(1);
        for (idx, (child, bond)) in children.into_iter().enumerate() {
            let branch = idx != last;
            if branch {
                out.push('(');
            }
            out.push_str(bond_token(self.graph, bond, atom, child));
            self.emit(child, digits, out);
            if branch {
                out.push(')');
            }
        }
    }
}

#[derive(Default)]
struct RingDigits {
    in_use: Vec<usize>,
}

impl RingDigits {
    fn take(&mut self) -> usize {
        let digit = (1..)
            .find(|d| !self.in_use.contains(d))
            .unwrap_or(1);
        self.in_use.push(digit);
        digit
    }

    fn release(&mut self, digit: usize) {
        self.in_use.retain(|&d| d != digit);
    }
}

fn push_ring_label(out: &mut String, digit: usize) {
    if digit < 10 {
        out.push_str(&digit.to_string());
    } else {
        out.push_str(&format!("%{digit:02}"));
    }
}

fn bond_token<G: MolecularGraph + ?Sized>(
    graph: &G,
    bond: usize,
    a: AtomId,
    b: AtomId,
) -> &'static str {
    let both_aromatic = graph.atoms()[a].is_aromatic && graph.atoms()[b].is_aromatic;
    match graph.bonds()[bond].order {
        BondOrder::Single if both_aromatic => "-",
        BondOrder::Single => "",
        BondOrder::Double => "=",
        BondOrder::Triple => "#",
        BondOrder::Aromatic if both_aromatic => "",
        BondOrder::Aromatic => ":",
    }
}

fn atom_token<G: MolecularGraph + ?Sized>(graph: &G, atom: AtomId) -> String {
    let a = &graph.atoms()[atom];
    let symbol = a.element.symbol();
    let lower = symbol.to_ascii_lowercase();
    let aromatic = a.is_aromatic && AROMATIC_SYMBOLS.contains(&lower.as_str());
    let written = if aromatic { lower.as_str() } else { symbol };

    let organic = if aromatic {
        AROMATIC_SYMBOLS[..6].contains(&written)
    } else {
        ORGANIC_SUBSET.contains(&written)
    };
    let bare = organic
        && a.formal_charge == 0
        && a.isotope.is_none()
        && a.implicit_hydrogens
            == valence::implicit_hydrogens(a.element, 0, aromatic, graph.bond_valence(atom));
    if bare {
        return written.to_string();
    }

    let mut token = String::from("[");
    if let Some(isotope) = a.isotope {
        token.push_str(&isotope.to_string());
    }
    token.push_str(written);
    match a.implicit_hydrogens {
        0 => {}
        1 => token.push('H'),
        h => token.push_str(&format!("H{h}")),
    }
    match a.formal_charge {
        0 => {}
        1 => token.push('+'),
        -1 => token.push('-'),
        q if q > 0 => token.push_str(&format!("+{q}")),
        q => token.push_str(&format!("-{}", -i16::from(q))),
    }
    token.push(']');
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::smiles::reader::parse;

    fn canonical(smiles: &str) -> String {
        write(&parse(smiles).unwrap())
    }

    #[test]
    fn writes_acetic_acid() {
        assert_eq!(canonical("CC(=O)O"), "CC(=O)O");
        assert_eq!(canonical("OC(C)=O"), "CC(=O)O");
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let pairs = [
            ("c1ccccc1O", "Oc1ccccc1"),
            ("NCC(=O)O", "OC(=O)CN"),
            ("c1ccncc1C", "Cc1cccnc1"),
            ("CCO.Cl", "Cl.OCC"),
        ];
        for (a, b) in pairs {
            assert_eq!(canonical(a), canonical(b), "{a} vs {b}");
        }
    }

    #[test]
    fn output_parses_back_to_the_same_string() {
        for smiles in [
            "CN(C)CCCN1C2=CC=CC=C2SC2=C1C=C(C=C2)C(C)=O",
            "c1cc[nH]c1",
            "[NH3+]CC([O-])=O",
            "O=[N+]([O-])c1ccccc1",
            "C1CC2CCC1CC2",
            "[2H]OC",
        ] {
            let once = canonical(smiles);
            assert_eq!(canonical(&once), once, "{smiles}");
        }
    }

    #[test]
    fn brackets_only_when_needed() {
        let pyrrole = canonical("c1cc[nH]c1");
        assert!(pyrrole.contains("[nH]"));
        assert_eq!(canonical("[NH4+]"), "[NH4+]");
        assert_eq!(canonical("[CH3][OH]"), "CO");
        assert_eq!(canonical("C[O-]"), "C[O-]");
    }

    #[test]
    fn aromatic_link_is_written_explicitly() {
        let biphenyl = canonical("c1ccccc1-c1ccccc1");
        assert!(biphenyl.contains('-'));
    }

    #[test]
    fn ring_digits_are_reused() {
        let out = canonical("C1CC1C1CC1");
        assert!(!out.contains('2'));
    }
}
