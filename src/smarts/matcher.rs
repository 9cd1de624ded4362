use std::collections::HashSet;

use super::{AtomExpr, AtomPrimitive, BondExpr, SmartsPattern};
use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;
use crate::model::types::BondOrder;
use crate::perceive::{RingInfo, valence};

/// A target graph with its ring perception, computed once and shared by
/// every query (including recursive ones) run against it.
pub struct MatchContext<'g, G: MolecularGraph + ?Sized> {
    graph: &'g G,
    rings: RingInfo,
}

impl<'g, G: MolecularGraph + ?Sized> MatchContext<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            rings: RingInfo::perceive(graph),
        }
    }

    pub fn graph(&self) -> &G {
        self.graph
    }

    pub fn rings(&self) -> &RingInfo {
        &self.rings
    }
}

pub(super) fn find_all<G: MolecularGraph + ?Sized>(
    pattern: &SmartsPattern,
    ctx: &MatchContext<'_, G>,
) -> Vec<Vec<AtomId>> {
    let mut state = State::new(pattern, ctx, false);
    state.search(0);

    let mut seen = HashSet::new();
    state
        .matches
        .into_iter()
        .filter(|m| {
            let mut key = m.clone();
            key.sort_unstable();
            seen.insert(key)
        })
        .collect()
}

pub(super) fn any_match<G: MolecularGraph + ?Sized>(
    pattern: &SmartsPattern,
    ctx: &MatchContext<'_, G>,
) -> bool {
    let mut state = State::new(pattern, ctx, true);
    state.search(0);
    !state.matches.is_empty()
}

// Does `pattern` match with its first atom on `root`?
fn matches_rooted<G: MolecularGraph + ?Sized>(
    pattern: &SmartsPattern,
    ctx: &MatchContext<'_, G>,
    root: AtomId,
) -> bool {
    let mut state = State::new(pattern, ctx, true);
    if !state.feasible(state.order[0], root) {
        return false;
    }
    state.assign(state.order[0], root);
    state.search(1);
    !state.matches.is_empty()
}

struct State<'p, 'c, 'g, G: MolecularGraph + ?Sized> {
    pattern: &'p SmartsPattern,
    ctx: &'c MatchContext<'g, G>,
    first_only: bool,
    order: Vec<usize>,
    query_to_target: Vec<Option<AtomId>>,
    target_used: Vec<bool>,
    matches: Vec<Vec<AtomId>>,
}

impl<'p, 'c, 'g, G: MolecularGraph + ?Sized> State<'p, 'c, 'g, G> {
    fn new(pattern: &'p SmartsPattern, ctx: &'c MatchContext<'g, G>, first_only: bool) -> Self {
        Self {
            pattern,
            ctx,
            first_only,
            order: search_order(pattern),
            query_to_target: vec![None; pattern.atoms.len()],
            target_used: vec![false; ctx.graph.atom_count()],
            matches: Vec::new(),
        }
    }

    fn assign(&mut self, query: usize, target: AtomId) {
        self.query_to_target[query] = Some(target);
        self.target_used[target] = true;
    }

    fn unassign(&mut self, query: usize, target: AtomId) {
        self.query_to_target[query] = None;
        self.target_used[target] = false;
    }

    fn search(&mut self, depth: usize) {
        if self.first_only && !self.matches.is_empty() {
            return;
        }
        if depth == self.order.len() {
            self.matches
                .push(self.query_to_target.iter().flatten().copied().collect());
            return;
        }

        let query = self.order[depth];
        for target in self.candidates(query) {
            if self.target_used[target] || !self.feasible(query, target) {
                continue;
            }
            self.assign(query, target);
            self.search(depth + 1);
            self.unassign(query, target);
            if self.first_only && !self.matches.is_empty() {
                return;
            }
        }
    }

    fn candidates(&self, query: usize) -> Vec<AtomId> {
        let anchor = self.pattern.adjacency[query]
            .iter()
            .find_map(|&(q, _)| self.query_to_target[q]);
        match anchor {
            Some(t) => self.ctx.graph.neighbors(t).iter().map(|&(n, _)| n).collect(),
            None => (0..self.ctx.graph.atom_count()).collect(),
        }
    }

    fn feasible(&self, query: usize, target: AtomId) -> bool {
        if !eval_atom(&self.pattern.atoms[query], self.ctx, target) {
            return false;
        }
        self.pattern.adjacency[query].iter().all(|&(q, qb)| {
            let Some(mapped) = self.query_to_target[q] else {
                return true;
            };
            self.ctx
                .graph
                .neighbors(target)
                .iter()
                .find(|&&(n, _)| n == mapped)
                .is_some_and(|&(_, b)| eval_bond(&self.pattern.bonds[qb].expr, self.ctx, b))
        })
    }
}

// Depth-first order over each query component so that every atom after a
// component's first has an already placed neighbor.
fn search_order(pattern: &SmartsPattern) -> Vec<usize> {
    let n = pattern.atoms.len();
    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for start in 0..n {
        if seen[start] {
            continue;
        }
        let mut stack = vec![start];
        seen[start] = true;
        while let Some(q) = stack.pop() {
            order.push(q);
            for &(next, _) in pattern.adjacency[q].iter().rev() {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
    }
    order
}

fn eval_atom<G: MolecularGraph + ?Sized>(
    expr: &AtomExpr,
    ctx: &MatchContext<'_, G>,
    atom: AtomId,
) -> bool {
    match expr {
        AtomExpr::Primitive(p) => eval_primitive(p, ctx, atom),
        AtomExpr::Not(inner) => !eval_atom(inner, ctx, atom),
        AtomExpr::And(terms) => terms.iter().all(|t| eval_atom(t, ctx, atom)),
        AtomExpr::Or(terms) => terms.iter().any(|t| eval_atom(t, ctx, atom)),
    }
}

fn eval_primitive<G: MolecularGraph + ?Sized>(
    prim: &AtomPrimitive,
    ctx: &MatchContext<'_, G>,
    atom: AtomId,
) -> bool {
    let graph = ctx.graph;
    let a = &graph.atoms()[atom];
    match *prim {
        AtomPrimitive::Any => true,
        AtomPrimitive::Element { element, aromatic } => {
            a.element == element && a.is_aromatic == aromatic
        }
        AtomPrimitive::AtomicNumber(z) => a.element.atomic_number() == z,
        AtomPrimitive::Isotope(mass) => a.isotope == Some(mass),
        AtomPrimitive::Aromatic => a.is_aromatic,
        AtomPrimitive::Aliphatic => !a.is_aromatic,
        AtomPrimitive::Degree(d) => graph.degree(atom) == usize::from(d),
        AtomPrimitive::TotalHydrogens(h) => graph.total_hydrogens(atom) == h,
        AtomPrimitive::ImplicitHydrogens(h) => a.implicit_hydrogens == h,
        AtomPrimitive::Connectivity(x) => {
            graph.degree(atom) + usize::from(a.implicit_hydrogens) == usize::from(x)
        }
        AtomPrimitive::Valence(v) => total_valence(graph, atom) == v,
        AtomPrimitive::RingConnectivity(count) => {
            let ring_bonds = ctx.rings.ring_bond_count(graph, atom);
            match count {
                Some(x) => ring_bonds == usize::from(x),
                None => ring_bonds > 0,
            }
        }
        AtomPrimitive::RingCount(count) => match count {
            Some(r) => ctx.rings.atom_ring_count(atom) == usize::from(r),
            None => ctx.rings.is_atom_in_ring(atom),
        },
        AtomPrimitive::SmallestRing(size) => match size {
            Some(0) => !ctx.rings.is_atom_in_ring(atom),
            Some(r) => ctx.rings.smallest_ring_size(atom) == Some(usize::from(r)),
            None => ctx.rings.is_atom_in_ring(atom),
        },
        AtomPrimitive::Charge(q) => a.formal_charge == q,
        AtomPrimitive::Recursive(ref inner) => matches_rooted(inner, ctx, atom),
    }
}

// Bond orders plus hydrogens, with one extra unit for an aromatic atom
// whose σ bonds leave room for a π bond.
fn total_valence<G: MolecularGraph + ?Sized>(graph: &G, atom: AtomId) -> u8 {
    let a = &graph.atoms()[atom];
    let explicit = graph.bond_valence(atom) + a.implicit_hydrogens;
    if !a.is_aromatic {
        return explicit;
    }
    let lowest = valence::allowed_valences(a.element, a.formal_charge)
        .first()
        .copied()
        .unwrap_or(0);
    if explicit < lowest { explicit + 1 } else { explicit }
}

fn eval_bond<G: MolecularGraph + ?Sized>(
    expr: &BondExpr,
    ctx: &MatchContext<'_, G>,
    bond: usize,
) -> bool {
    let order = ctx.graph.bonds()[bond].order;
    match expr {
        BondExpr::Implicit => matches!(order, BondOrder::Single | BondOrder::Aromatic),
        BondExpr::Single => order == BondOrder::Single,
        BondExpr::Double => order == BondOrder::Double,
        BondExpr::Triple => order == BondOrder::Triple,
        BondExpr::Aromatic => order == BondOrder::Aromatic,
        BondExpr::Any => true,
        BondExpr::Ring => ctx.rings.is_bond_in_ring(bond),
        BondExpr::Not(inner) => !eval_bond(inner, ctx, bond),
        BondExpr::And(terms) => terms.iter().all(|t| eval_bond(t, ctx, bond)),
        BondExpr::Or(terms) => terms.iter().any(|t| eval_bond(t, ctx, bond)),
    }
}

#[cfg(test)]
mod tests {
    use crate::io::read_smiles;
    use crate::model::molecule::Molecule;
    use crate::smarts::SmartsPattern;

    fn make_mol(smiles: &str) -> Molecule {
        read_smiles(smiles).unwrap()
    }

    fn count(smarts: &str, smiles: &str) -> usize {
        SmartsPattern::parse(smarts)
            .unwrap()
            .find_all(&make_mol(smiles))
            .len()
    }

    #[test]
    fn match_element_and_aromaticity() {
        assert_eq!(count("c", "c1ccccc1C"), 6);
        assert_eq!(count("C", "c1ccccc1C"), 1);
        assert_eq!(count("[#6]", "c1ccccc1C"), 7);
        assert_eq!(count("a", "c1ccncc1"), 6);
    }

    #[test]
    fn match_h_count() {
        assert_eq!(count("[OH1]", "CC(=O)O"), 1);
        assert_eq!(count("[CH3]", "CC(=O)O"), 1);
        assert_eq!(count("[OX1]", "CC(=O)O"), 1);
    }

    #[test]
    fn h_count_is_representation_independent() {
        let implicit = make_mol("CC(=O)O");
        let explicit = implicit.add_hydrogens();
        let pattern = SmartsPattern::parse("[CX3](=O)[OX2H1]").unwrap();
        assert_eq!(pattern.find_all(&implicit), vec![vec![1, 2, 3]]);
        assert_eq!(pattern.find_all(&explicit), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn match_bonds() {
        assert_eq!(count("C=O", "CC(=O)O"), 1);
        assert_eq!(count("C-O", "CC(=O)O"), 1);
        assert_eq!(count("C~O", "CC(=O)O"), 2);
        assert_eq!(count("cc", "c1ccccc1"), 6);
        assert_eq!(count("c-c", "c1ccccc1-c1ccccc1"), 1);
        assert_eq!(count("c!@c", "c1ccccc1-c1ccccc1"), 1);
    }

    #[test]
    fn match_rings() {
        assert_eq!(count("[R]", "C1CC1CC"), 3);
        assert_eq!(count("[R0]", "C1CC1CC"), 2);
        assert_eq!(count("[r5]", "C1CCCC1C1CC1"), 5);
        assert_eq!(count("[R2]", "c1ccc2ccccc2c1"), 2);
        assert_eq!(count("[x3]", "c1ccc2ccccc2c1"), 2);
    }

    #[test]
    fn match_charges() {
        assert_eq!(count("[O-]", "CC(=O)[O-]"), 1);
        assert_eq!(count("[N+]", "C[N+](C)(C)C"), 1);
        assert_eq!(count("[+0]", "C[O-]"), 1);
    }

    #[test]
    fn match_recursive() {
        // Amine nitrogens that are not amides.
        let smarts = "[NX3;!$(NC=O)]";
        assert_eq!(count(smarts, "CC(=O)NC"), 0);
        assert_eq!(count(smarts, "CCNCC"), 1);
        assert_eq!(count("[$([OH]C=O)]", "OCC(=O)O"), 1);
    }

    #[test]
    fn match_valence() {
        assert_eq!(count("[#6v4]", "c1ccncc1"), 5);
        assert_eq!(count("[nv3]", "c1cc[nH]c1"), 1);
    }

    #[test]
    fn unique_matches_by_atom_set() {
        // The symmetric carboxylate is reported once.
        assert_eq!(count("O~C~O", "CC(=O)[O-]"), 1);
        assert_eq!(count("CC", "CC"), 1);
    }

    #[test]
    fn disconnected_query() {
        assert_eq!(count("O.N", "OCCN"), 1);
        assert!(!SmartsPattern::parse("O.N").unwrap().is_match(&make_mol("OCC")));
    }
}
