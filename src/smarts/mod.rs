//! SMARTS substructure queries.
//!
//! Supported atom primitives: `*`, element symbols (aliphatic upper case,
//! aromatic lower case), `#n`, isotopes, `a`, `A`, `D`, `H`, `h`, `X`, `v`,
//! `x`, `R`, `r`, charges and recursive `$(...)`. Logical operators `!`, `&`,
//! `,` and `;` follow the usual precedence. Bond primitives are `-`, `=`,
//! `#`, `:`, `~` and `@`; an unwritten bond means single or aromatic.
//! Chirality and directional bonds are parsed and ignored.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;
use crate::model::types::Element;

mod matcher;
mod parser;

pub use matcher::MatchContext;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmartsError {
    #[error("empty SMARTS pattern")]
    Empty,

    #[error("unexpected '{found}' at position {position}")]
    Unexpected { found: char, position: usize },

    #[error("pattern ends unexpectedly")]
    UnexpectedEnd,

    #[error("ring bond {0} is never closed")]
    UnclosedRing(u16),

    #[error("unbalanced parenthesis at position {0}")]
    UnbalancedParen(usize),

    #[error("unknown element symbol '{0}'")]
    UnknownElement(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AtomPrimitive {
    Any,
    Element { element: Element, aromatic: bool },
    AtomicNumber(u8),
    Isotope(u16),
    Aromatic,
    Aliphatic,
    Degree(u8),
    TotalHydrogens(u8),
    ImplicitHydrogens(u8),
    Connectivity(u8),
    Valence(u8),
    RingConnectivity(Option<u8>),
    RingCount(Option<u8>),
    SmallestRing(Option<u8>),
    Charge(i8),
    Recursive(Box<SmartsPattern>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AtomExpr {
    Primitive(AtomPrimitive),
    Not(Box<AtomExpr>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BondExpr {
    /// Unwritten bond: single or aromatic.
    Implicit,
    Single,
    Double,
    Triple,
    Aromatic,
    Any,
    Ring,
    Not(Box<BondExpr>),
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryBond {
    pub a: usize,
    pub b: usize,
    pub expr: BondExpr,
}

/// A compiled SMARTS query.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartsPattern {
    source: String,
    atoms: Vec<AtomExpr>,
    bonds: Vec<QueryBond>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl SmartsPattern {
    pub fn parse(smarts: &str) -> Result<Self, SmartsError> {
        let (atoms, bonds) = parser::parse(smarts)?;
        Ok(Self::assemble(smarts.to_string(), atoms, bonds))
    }

    fn assemble(source: String, atoms: Vec<AtomExpr>, bonds: Vec<QueryBond>) -> Self {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (idx, bond) in bonds.iter().enumerate() {
            adjacency[bond.a].push((bond.b, idx));
            adjacency[bond.b].push((bond.a, idx));
        }
        Self {
            source,
            atoms,
            bonds,
            adjacency,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of query atoms; match tuples have this length.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// All matches with distinct atom sets, each listed in query atom order.
    pub fn find_all<G: MolecularGraph + ?Sized>(&self, graph: &G) -> Vec<Vec<AtomId>> {
        let ctx = MatchContext::new(graph);
        self.find_all_in(&ctx)
    }

    /// Like [`find_all`](Self::find_all), reusing perception from `ctx`.
    pub fn find_all_in<G: MolecularGraph + ?Sized>(
        &self,
        ctx: &MatchContext<'_, G>,
    ) -> Vec<Vec<AtomId>> {
        matcher::find_all(self, ctx)
    }

    pub fn is_match<G: MolecularGraph + ?Sized>(&self, graph: &G) -> bool {
        let ctx = MatchContext::new(graph);
        matcher::any_match(self, &ctx)
    }
}

impl FromStr for SmartsPattern {
    type Err = SmartsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SmartsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
