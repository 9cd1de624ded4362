use std::collections::BTreeMap;
use std::str::FromStr;

use super::{AtomExpr, AtomPrimitive, BondExpr, QueryBond, SmartsError, SmartsPattern};
use crate::model::types::Element;

// Two-letter symbols past this atomic number are not recognized so that
// `[Nh]` keeps meaning nitrogen with an implicit hydrogen.
const MAX_TWO_LETTER_Z: u8 = 103;

pub(super) fn parse(smarts: &str) -> Result<(Vec<AtomExpr>, Vec<QueryBond>), SmartsError> {
    let input = smarts.trim();
    if input.is_empty() {
        return Err(SmartsError::Empty);
    }
    let mut parser = Parser::new(input);
    parser.run()?;
    Ok((parser.atoms, parser.bonds))
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<AtomExpr>,
    bonds: Vec<QueryBond>,
    branches: Vec<(usize, usize)>,
    prev: Option<usize>,
    pending: Option<BondExpr>,
    rings: BTreeMap<u16, (usize, Option<BondExpr>)>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            branches: Vec::new(),
            prev: None,
            pending: None,
            rings: BTreeMap::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn unexpected(&self) -> SmartsError {
        match self.peek() {
            Some(c) => SmartsError::Unexpected {
                found: c as char,
                position: self.pos,
            },
            None => SmartsError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), SmartsError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn run(&mut self) -> Result<(), SmartsError> {
        while let Some(ch) = self.peek() {
            match ch {
                b'(' => {
                    let prev = self.prev.ok_or(SmartsError::UnbalancedParen(self.pos))?;
                    self.branches.push((prev, self.pos));
                    self.pos += 1;
                }
                b')' => {
                    let (prev, _) = self
                        .branches
                        .pop()
                        .ok_or(SmartsError::UnbalancedParen(self.pos))?;
                    if self.pending.is_some() {
                        return Err(self.unexpected());
                    }
                    self.prev = Some(prev);
                    self.pos += 1;
                }
                b'.' => {
                    if self.pending.is_some() {
                        return Err(self.unexpected());
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'!' | b'/' | b'\\' => {
                    if self.prev.is_none() || self.pending.is_some() {
                        return Err(self.unexpected());
                    }
                    let expr = self.bond_expr()?;
                    self.pending = Some(expr);
                }
                b'%' | b'0'..=b'9' => {
                    let number = self.ring_number()?;
                    self.ring_closure(number)?;
                }
                b'[' => {
                    self.pos += 1;
                    let expr = self.atom_expr()?;
                    self.expect(b']')?;
                    self.push_atom(expr);
                }
                _ => {
                    let expr = self.bare_atom()?;
                    self.push_atom(expr);
                }
            }
        }

        if let Some(&(_, position)) = self.branches.last() {
            return Err(SmartsError::UnbalancedParen(position));
        }
        if let Some(&number) = self.rings.keys().next() {
            return Err(SmartsError::UnclosedRing(number));
        }
        if self.pending.is_some() || self.atoms.is_empty() {
            return Err(SmartsError::UnexpectedEnd);
        }
        Ok(())
    }

    fn push_atom(&mut self, expr: AtomExpr) {
        let idx = self.atoms.len();
        self.atoms.push(expr);
        if let Some(prev) = self.prev {
            let expr = self.pending.take().unwrap_or(BondExpr::Implicit);
            self.bonds.push(QueryBond {
                a: prev,
                b: idx,
                expr,
            });
        }
        self.prev = Some(idx);
    }

    fn ring_number(&mut self) -> Result<u16, SmartsError> {
        if self.peek() == Some(b'%') {
            self.pos += 1;
            let tens = self.digit()?;
            let ones = self.digit()?;
            return Ok(u16::from(tens) * 10 + u16::from(ones));
        }
        Ok(u16::from(self.digit()?))
    }

    fn digit(&mut self) -> Result<u8, SmartsError> {
        match self.peek() {
            Some(c @ b'0'..=b'9') => {
                self.pos += 1;
                Ok(c - b'0')
            }
            _ => Err(self.unexpected()),
        }
    }

    fn ring_closure(&mut self, number: u16) -> Result<(), SmartsError> {
        let current = self.prev.ok_or_else(|| self.unexpected())?;
        let expr = self.pending.take();
        match self.rings.remove(&number) {
            Some((open, open_expr)) => {
                let expr = open_expr.or(expr).unwrap_or(BondExpr::Implicit);
                self.bonds.push(QueryBond {
                    a: open,
                    b: current,
                    expr,
                });
            }
            None => {
                self.rings.insert(number, (current, expr));
            }
        }
        Ok(())
    }

    fn bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let rest = &self.input[self.pos..];
        let prim = |element, aromatic| AtomExpr::Primitive(AtomPrimitive::Element { element, aromatic });

        for (symbol, element) in [("Cl", Element::Cl), ("Br", Element::Br)] {
            if rest.starts_with(symbol.as_bytes()) {
                self.pos += 2;
                return Ok(prim(element, false));
            }
        }

        let expr = match rest[0] {
            b'*' => AtomExpr::Primitive(AtomPrimitive::Any),
            b'a' => AtomExpr::Primitive(AtomPrimitive::Aromatic),
            b'A' => AtomExpr::Primitive(AtomPrimitive::Aliphatic),
            b'B' => prim(Element::B, false),
            b'C' => prim(Element::C, false),
            b'N' => prim(Element::N, false),
            b'O' => prim(Element::O, false),
            b'P' => prim(Element::P, false),
            b'S' => prim(Element::S, false),
            b'F' => prim(Element::F, false),
            b'I' => prim(Element::I, false),
            b'b' => prim(Element::B, true),
            b'c' => prim(Element::C, true),
            b'n' => prim(Element::N, true),
            b'o' => prim(Element::O, true),
            b'p' => prim(Element::P, true),
            b's' => prim(Element::S, true),
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(expr)
    }

    // expr := or (';' or)*
    fn atom_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut terms = vec![self.atom_or()?];
        while self.peek() == Some(b';') {
            self.pos += 1;
            terms.push(self.atom_or()?);
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    // or := and (',' and)*
    fn atom_or(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut terms = vec![self.atom_and()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            terms.push(self.atom_and()?);
        }
        Ok(collapse(terms, AtomExpr::Or))
    }

    // and := not ('&'? not)*
    fn atom_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut terms = vec![self.atom_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.pos += 1;
                    terms.push(self.atom_not()?);
                }
                Some(b']' | b',' | b';') | None => break,
                Some(_) => terms.push(self.atom_not()?),
            }
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn atom_not(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some(b'!') {
            self.pos += 1;
            return Ok(AtomExpr::Not(Box::new(self.atom_not()?)));
        }
        self.atom_primitive().map(AtomExpr::Primitive)
    }

    fn atom_primitive(&mut self) -> Result<AtomPrimitive, SmartsError> {
        let Some(ch) = self.peek() else {
            return Err(SmartsError::UnexpectedEnd);
        };

        match ch {
            b'*' => {
                self.pos += 1;
                Ok(AtomPrimitive::Any)
            }
            b'$' => self.recursive(),
            b'#' => {
                self.pos += 1;
                let n = self.number().ok_or_else(|| self.unexpected())?;
                let z = u8::try_from(n).map_err(|_| self.unexpected())?;
                Ok(AtomPrimitive::AtomicNumber(z))
            }
            b'0'..=b'9' => {
                let n = self.number().ok_or_else(|| self.unexpected())?;
                Ok(AtomPrimitive::Isotope(
                    u16::try_from(n).map_err(|_| self.unexpected())?,
                ))
            }
            b'+' | b'-' => Ok(AtomPrimitive::Charge(self.charge()?)),
            b'@' => {
                while self.peek() == Some(b'@') {
                    self.pos += 1;
                }
                if self.peek() == Some(b'?') {
                    self.pos += 1;
                }
                Ok(AtomPrimitive::Any)
            }
            b'H' if self.is_hydrogen_atom() => {
                self.pos += 1;
                Ok(AtomPrimitive::Element {
                    element: Element::H,
                    aromatic: false,
                })
            }
            b'D' | b'H' | b'h' | b'X' | b'v' if !self.starts_element() => {
                self.pos += 1;
                let count = self.small_number()?.unwrap_or(1);
                Ok(match ch {
                    b'D' => AtomPrimitive::Degree(count),
                    b'H' => AtomPrimitive::TotalHydrogens(count),
                    b'h' => AtomPrimitive::ImplicitHydrogens(count),
                    b'X' => AtomPrimitive::Connectivity(count),
                    _ => AtomPrimitive::Valence(count),
                })
            }
            b'x' | b'R' | b'r' if !self.starts_element() => {
                self.pos += 1;
                let count = self.small_number()?;
                Ok(match ch {
                    b'x' => AtomPrimitive::RingConnectivity(count),
                    b'R' => AtomPrimitive::RingCount(count),
                    _ => AtomPrimitive::SmallestRing(count),
                })
            }
            b'a' if self.peek_at(1) != Some(b's') => {
                self.pos += 1;
                Ok(AtomPrimitive::Aromatic)
            }
            b'A' if !self.starts_element() => {
                self.pos += 1;
                Ok(AtomPrimitive::Aliphatic)
            }
            _ => self.element_symbol(),
        }
    }

    // A lone `H` (optionally charged) is the hydrogen atom, not a count.
    fn is_hydrogen_atom(&self) -> bool {
        let at_start = self.pos > 0 && self.input[self.pos - 1] == b'[';
        at_start && matches!(self.peek_at(1), Some(b']' | b'+' | b'-'))
    }

    fn starts_element(&self) -> bool {
        let (Some(first), Some(second)) = (self.peek(), self.peek_at(1)) else {
            return false;
        };
        if !first.is_ascii_uppercase() || !second.is_ascii_lowercase() {
            return false;
        }
        two_letter_element(first, second).is_some()
    }

    fn element_symbol(&mut self) -> Result<AtomPrimitive, SmartsError> {
        let rest = &self.input[self.pos..];
        for (symbol, element) in [("se", Element::Se), ("as", Element::As)] {
            if rest.starts_with(symbol.as_bytes()) {
                self.pos += 2;
                return Ok(AtomPrimitive::Element {
                    element,
                    aromatic: true,
                });
            }
        }

        let first = rest[0];
        if first.is_ascii_uppercase() {
            if let Some(element) = rest.get(1).and_then(|&s| two_letter_element(first, s)) {
                self.pos += 2;
                return Ok(AtomPrimitive::Element {
                    element,
                    aromatic: false,
                });
            }
            let symbol = (first as char).to_string();
            let element = Element::from_str(&symbol)
                .map_err(|_| SmartsError::UnknownElement(symbol.clone()))?;
            self.pos += 1;
            return Ok(AtomPrimitive::Element {
                element,
                aromatic: false,
            });
        }

        let element = match first {
            b'b' => Element::B,
            b'c' => Element::C,
            b'n' => Element::N,
            b'o' => Element::O,
            b'p' => Element::P,
            b's' => Element::S,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(AtomPrimitive::Element {
            element,
            aromatic: true,
        })
    }

    fn recursive(&mut self) -> Result<AtomPrimitive, SmartsError> {
        self.pos += 1;
        let open = self.pos;
        self.expect(b'(')?;
        let start = self.pos;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Some(b'(') => depth += 1,
                Some(b')') => depth -= 1,
                Some(_) => {}
                None => return Err(SmartsError::UnbalancedParen(open)),
            }
            self.pos += 1;
        }
        let inner = std::str::from_utf8(&self.input[start..self.pos - 1])
            .map_err(|_| SmartsError::UnexpectedEnd)?;
        let pattern = SmartsPattern::parse(inner).map_err(|e| shift(e, start))?;
        Ok(AtomPrimitive::Recursive(Box::new(pattern)))
    }

    fn charge(&mut self) -> Result<i8, SmartsError> {
        let symbol = self.input[self.pos];
        let sign: i8 = if symbol == b'+' { 1 } else { -1 };
        self.pos += 1;
        if let Some(n) = self.number() {
            let magnitude = i8::try_from(n).map_err(|_| self.unexpected())?;
            return Ok(sign * magnitude);
        }
        let mut magnitude = 1i8;
        while self.peek() == Some(symbol) {
            self.pos += 1;
            magnitude += 1;
        }
        Ok(sign * magnitude)
    }

    fn number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    fn small_number(&mut self) -> Result<Option<u8>, SmartsError> {
        match self.number() {
            Some(n) => u8::try_from(n).map(Some).map_err(|_| self.unexpected()),
            None => Ok(None),
        }
    }

    // bond := or (';' or)*, with or/and/not as for atoms.
    fn bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut terms = vec![self.bond_or()?];
        while self.peek() == Some(b';') {
            self.pos += 1;
            terms.push(self.bond_or()?);
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        let mut terms = vec![self.bond_and()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            terms.push(self.bond_and()?);
        }
        Ok(collapse(terms, BondExpr::Or))
    }

    fn bond_and(&mut self) -> Result<BondExpr, SmartsError> {
        let mut terms = vec![self.bond_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.pos += 1;
                    terms.push(self.bond_not()?);
                }
                Some(b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'!' | b'/' | b'\\') => {
                    terms.push(self.bond_not()?);
                }
                _ => break,
            }
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn bond_not(&mut self) -> Result<BondExpr, SmartsError> {
        if self.peek() == Some(b'!') {
            self.pos += 1;
            return Ok(BondExpr::Not(Box::new(self.bond_not()?)));
        }
        let expr = match self.peek() {
            Some(b'-') => BondExpr::Single,
            Some(b'=') => BondExpr::Double,
            Some(b'#') => BondExpr::Triple,
            Some(b':') => BondExpr::Aromatic,
            Some(b'~') => BondExpr::Any,
            Some(b'@') => BondExpr::Ring,
            // Directional bonds are single bonds without stereo meaning here.
            Some(b'/' | b'\\') => BondExpr::Single,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(expr)
    }
}

fn collapse<T>(mut terms: Vec<T>, join: fn(Vec<T>) -> T) -> T {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        join(terms)
    }
}

fn two_letter_element(first: u8, second: u8) -> Option<Element> {
    let symbol = format!("{}{}", first as char, second as char);
    Element::from_str(&symbol)
        .ok()
        .filter(|e| e.atomic_number() <= MAX_TWO_LETTER_Z)
}

fn shift(err: SmartsError, by: usize) -> SmartsError {
    match err {
        SmartsError::Unexpected { found, position } => SmartsError::Unexpected {
            found,
            position: position + by,
        },
        SmartsError::UnbalancedParen(position) => SmartsError::UnbalancedParen(position + by),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_atoms(smarts: &str) -> Vec<AtomExpr> {
        parse(smarts).unwrap().0
    }

    #[test]
    fn parse_degree_and_hydrogens() {
        let atoms = make_atoms("[OX2H1]");
        assert_eq!(
            atoms[0],
            AtomExpr::And(vec![
                AtomExpr::Primitive(AtomPrimitive::Element {
                    element: Element::O,
                    aromatic: false
                }),
                AtomExpr::Primitive(AtomPrimitive::Connectivity(2)),
                AtomExpr::Primitive(AtomPrimitive::TotalHydrogens(1)),
            ])
        );
    }

    #[test]
    fn parse_two_letter_elements_in_brackets() {
        let atoms = make_atoms("[Cl][Na+][Nh]");
        assert!(matches!(
            atoms[0],
            AtomExpr::Primitive(AtomPrimitive::Element {
                element: Element::Cl,
                ..
            })
        ));
        assert!(matches!(&atoms[1], AtomExpr::And(t) if t.len() == 2));
        assert_eq!(
            atoms[2],
            AtomExpr::And(vec![
                AtomExpr::Primitive(AtomPrimitive::Element {
                    element: Element::N,
                    aromatic: false
                }),
                AtomExpr::Primitive(AtomPrimitive::ImplicitHydrogens(1)),
            ])
        );
    }

    #[test]
    fn parse_precedence() {
        // `,` binds tighter than `;`.
        let atoms = make_atoms("[N,O;H1]");
        let AtomExpr::And(terms) = &atoms[0] else {
            panic!("expected low-precedence and");
        };
        assert!(matches!(terms[0], AtomExpr::Or(_)));
    }

    #[test]
    fn parse_recursive() {
        let atoms = make_atoms("[$([OH]C=O)]");
        let AtomExpr::Primitive(AtomPrimitive::Recursive(inner)) = &atoms[0] else {
            panic!("expected recursive primitive");
        };
        assert_eq!(inner.atom_count(), 3);
    }

    #[test]
    fn parse_bonds_and_rings() {
        let (atoms, bonds) = parse("c1ccccc1!@[N;!$(NC=O)]").unwrap();
        assert_eq!(atoms.len(), 7);
        assert_eq!(bonds.len(), 7);
        assert_eq!(bonds[5].expr, BondExpr::Implicit);
        assert_eq!(
            bonds[6].expr,
            BondExpr::Not(Box::new(BondExpr::Ring))
        );
    }

    #[test]
    fn parse_hydrogen_atom() {
        let atoms = make_atoms("[H]O");
        assert_eq!(
            atoms[0],
            AtomExpr::Primitive(AtomPrimitive::Element {
                element: Element::H,
                aromatic: false
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse(""), Err(SmartsError::Empty));
        assert_eq!(parse("C1CC"), Err(SmartsError::UnclosedRing(1)));
        assert!(matches!(parse("C(C"), Err(SmartsError::UnbalancedParen(_))));
        assert!(matches!(parse("[C"), Err(SmartsError::UnexpectedEnd)));
        assert!(matches!(parse("C=]"), Err(SmartsError::Unexpected { .. })));
        assert!(matches!(
            parse("[$(C(C)]"),
            Err(SmartsError::UnbalancedParen(_) | SmartsError::UnexpectedEnd)
        ));
    }
}
