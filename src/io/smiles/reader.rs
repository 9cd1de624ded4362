use std::collections::BTreeMap;
use std::io::BufRead;
use std::str::FromStr;

use super::{AROMATIC_SYMBOLS, ORGANIC_SUBSET};
use crate::io::{Format, Position, Record, error::Error};
use crate::model::atom::Atom;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::{Bond, Molecule};
use crate::model::types::{BondOrder, Element};
use crate::perceive::{self, RingInfo, SanitizeError, valence};

/// Parses one SMILES string into a sanitized molecule.
///
/// Stereo markers (`@`, `/`, `\`) and atom classes are accepted and
/// discarded.
pub fn parse(smiles: &str) -> Result<Molecule, Error> {
    let parsed = Parser::new(smiles.trim()).run()?;
    let molecule = parsed.into_molecule()?;
    perceive::sanitize(molecule).map_err(|e| Error::sanitize(Format::Smiles, e))
}

/// Reads a SMILES file: one structure per line, optional title after the
/// first run of whitespace.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<Record>, Error> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (smiles, name) = match trimmed.split_once(char::is_whitespace) {
            Some((smiles, rest)) => (smiles, Some(rest.trim().to_string())),
            None => (trimmed, None),
        };

        let molecule = parse(smiles).map_err(|e| match e {
            Error::Parse {
                format,
                position: Position::Column(col),
                details,
            } => Error::parse(format, line_no, format!("{details} (column {col})")),
            other => other,
        })?;

        records.push(Record {
            name: name.filter(|n| !n.is_empty()),
            molecule,
        });
    }
    Ok(records)
}

struct ParsedAtom {
    atom: Atom,
    bracket: bool,
}

struct ParsedBond {
    i: usize,
    j: usize,
    order: Option<BondOrder>,
}

struct Parsed {
    atoms: Vec<ParsedAtom>,
    bonds: Vec<ParsedBond>,
}

impl Parsed {
    fn into_molecule(self) -> Result<Molecule, Error> {
        let aromatic: Vec<bool> = self.atoms.iter().map(|a| a.atom.is_aromatic).collect();
        let implicit: Vec<bool> = self.bonds.iter().map(|b| b.order.is_none()).collect();

        let bonds: Vec<Bond> = self
            .bonds
            .iter()
            .map(|b| {
                let order = b.order.unwrap_or(if aromatic[b.i] && aromatic[b.j] {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                });
                Bond::new(b.i, b.j, order)
            })
            .collect();

        let bracket: Vec<bool> = self.atoms.iter().map(|a| a.bracket).collect();
        let atoms: Vec<Atom> = self.atoms.into_iter().map(|a| a.atom).collect();
        let molecule = Molecule::new(atoms, bonds)
            .map_err(|e| Error::sanitize(Format::Smiles, SanitizeError::from(e)))?;

        // An unwritten bond between aromatic atoms of different rings
        // (biphenyl written without '-') is single.
        let rings = RingInfo::perceive(&molecule);
        let (atoms, mut bonds) = molecule.into_parts();
        for (idx, bond) in bonds.iter_mut().enumerate() {
            if implicit[idx] && bond.order == BondOrder::Aromatic && !rings.is_bond_in_ring(idx) {
                bond.order = BondOrder::Single;
            }
        }

        let relinked = Molecule::from_validated_parts(atoms, bonds);
        let valences: Vec<u8> = (0..relinked.atom_count())
            .map(|id| relinked.bond_valence(id))
            .collect();
        let (mut atoms, bonds) = relinked.into_parts();
        for ((atom, bond_valence), bracket) in atoms.iter_mut().zip(valences).zip(bracket) {
            if !bracket {
                atom.implicit_hydrogens = valence::implicit_hydrogens(
                    atom.element,
                    atom.formal_charge,
                    atom.is_aromatic,
                    bond_valence,
                );
            }
        }
        Ok(Molecule::from_validated_parts(atoms, bonds))
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<ParsedAtom>,
    bonds: Vec<ParsedBond>,
    branches: Vec<usize>,
    prev: Option<usize>,
    pending: Option<BondOrder>,
    pending_at: usize,
    rings: BTreeMap<u16, (usize, Option<BondOrder>, usize)>,
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
            pending_at: 0,
            rings: BTreeMap::new(),
        }
    }

    fn error(&self, at: usize, details: impl Into<String>) -> Error {
        Error::parse_at(Format::Smiles, at, details)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Parsed, Error> {
        if self.input.is_empty() {
            return Err(self.error(0, "empty SMILES string"));
        }

        while let Some(ch) = self.peek() {
            let start = self.pos;
            match ch {
                b'(' => {
                    let prev = self
                        .prev
                        .ok_or_else(|| self.error(start, "branch opened before any atom"))?;
                    self.branches.push(prev);
                    self.pos += 1;
                }
                b')' => {
                    if self.pending.is_some() {
                        return Err(self.error(start, "bond symbol before ')'"));
                    }
                    self.prev = Some(
                        self.branches
                            .pop()
                            .ok_or_else(|| self.error(start, "unbalanced ')'"))?,
                    );
                    self.pos += 1;
                }
                b'-' | b'=' | b'#' | b':' => {
                    if self.prev.is_none() {
                        return Err(self.error(start, "bond symbol without a preceding atom"));
                    }
                    if self.pending.is_some() {
                        return Err(self.error(start, "two consecutive bond symbols"));
                    }
                    self.pending = Some(match ch {
                        b'-' => BondOrder::Single,
                        b'=' => BondOrder::Double,
                        b'#' => BondOrder::Triple,
                        _ => BondOrder::Aromatic,
                    });
                    self.pending_at = start;
                    self.pos += 1;
                }
                b'/' | b'\\' => {
                    self.pos += 1;
                }
                b'$' => return Err(self.error(start, "quadruple bonds are not supported")),
                b'.' => {
                    if self.pending.is_some() {
                        return Err(self.error(start, "bond symbol before '.'"));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                b'%' | b'0'..=b'9' => {
                    let number = self.ring_number()?;
                    self.ring_closure(number, start)?;
                }
                b'[' => {
                    let atom = self.bracket_atom()?;
                    self.push_atom(atom, true);
                }
                b'*' => return Err(self.error(start, "wildcard atoms are not supported")),
                _ => {
                    let atom = self.organic_atom()?;
                    self.push_atom(atom, false);
                }
            }
        }

        if let Some((number, &(_, _, at))) = self.rings.iter().next() {
            return Err(self.error(at, format!("ring bond {number} is never closed")));
        }
        if !self.branches.is_empty() {
            return Err(self.error(self.input.len(), "unbalanced '('"));
        }
        if self.pending.is_some() {
            return Err(self.error(self.pending_at, "bond symbol without a following atom"));
        }
        if self.atoms.is_empty() {
            return Err(self.error(0, "SMILES contains no atoms"));
        }

        Ok(Parsed {
            atoms: self.atoms,
            bonds: self.bonds,
        })
    }

    fn push_atom(&mut self, atom: Atom, bracket: bool) {
        let id = self.atoms.len();
        self.atoms.push(ParsedAtom { atom, bracket });
        if let Some(prev) = self.prev {
            self.bonds.push(ParsedBond {
                i: prev,
                j: id,
                order: self.pending.take(),
            });
        }
        self.prev = Some(id);
    }

    fn ring_number(&mut self) -> Result<u16, Error> {
        let start = self.pos;
        if self.peek() == Some(b'%') {
            self.pos += 1;
            let digits = self.input.get(self.pos..self.pos + 2).unwrap_or_default();
            if digits.len() != 2 || !digits.iter().all(u8::is_ascii_digit) {
                return Err(self.error(start, "'%' must be followed by two digits"));
            }
            self.pos += 2;
            return Ok(u16::from(digits[0] - b'0') * 10 + u16::from(digits[1] - b'0'));
        }
        let digit = self.input[self.pos] - b'0';
        self.pos += 1;
        Ok(u16::from(digit))
    }

    fn ring_closure(&mut self, number: u16, at: usize) -> Result<(), Error> {
        let current = self
            .prev
            .ok_or_else(|| self.error(at, "ring bond before any atom"))?;
        let order = self.pending.take();

        match self.rings.remove(&number) {
            Some((open, open_order, _)) => {
                if open == current {
                    return Err(self.error(at, format!("ring bond {number} closes on itself")));
                }
                let order = match (open_order, order) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(
                            self.error(at, format!("conflicting bond orders on ring bond {number}"))
                        );
                    }
                    (a, b) => a.or(b),
                };
                self.bonds.push(ParsedBond {
                    i: open,
                    j: current,
                    order,
                });
            }
            None => {
                self.rings.insert(number, (current, order, at));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, Error> {
        let start = self.pos;
        let rest = &self.input[self.pos..];

        for (symbol, element) in [("Cl", Element::Cl), ("Br", Element::Br)] {
            if rest.starts_with(symbol.as_bytes()) {
                self.pos += 2;
                return Ok(Atom::new(element));
            }
        }

        let ch = rest[0] as char;
        let symbol = ch.to_string();
        if ORGANIC_SUBSET.contains(&symbol.as_str()) {
            self.pos += 1;
            let element = Element::from_str(&symbol).map_err(|e| self.error(start, e.to_string()))?;
            return Ok(Atom::new(element));
        }
        if AROMATIC_SYMBOLS[..6].contains(&symbol.as_str()) {
            self.pos += 1;
            let element = Element::from_str(&symbol.to_ascii_uppercase())
                .map_err(|e| self.error(start, e.to_string()))?;
            return Ok(Atom::new(element).aromatic());
        }

        if ch.is_ascii_alphabetic() {
            Err(self.error(
                start,
                format!("'{ch}' is not an organic-subset atom; use brackets"),
            ))
        } else {
            Err(self.error(start, format!("unexpected character '{ch}'")))
        }
    }

    fn bracket_atom(&mut self) -> Result<Atom, Error> {
        let open = self.pos;
        self.pos += 1;

        let isotope = self.number();

        let (element, aromatic) = self.bracket_symbol(open)?;
        let mut atom = Atom::new(element);
        atom.is_aromatic = aromatic;
        atom.isotope = isotope
            .map(|v| u16::try_from(v).map_err(|_| self.error(open, "isotope out of range")))
            .transpose()?;

        self.skip_chirality();

        if self.peek() == Some(b'H') {
            self.pos += 1;
            let count = self.number().unwrap_or(1);
            atom.implicit_hydrogens =
                u8::try_from(count).map_err(|_| self.error(open, "hydrogen count out of range"))?;
        }

        atom.formal_charge = self.charge(open)?;

        if self.peek() == Some(b':') {
            self.pos += 1;
            if self.number().is_none() {
                return Err(self.error(self.pos, "atom class must be a number"));
            }
        }

        if self.peek() != Some(b']') {
            return Err(self.error(open, "unterminated bracket atom"));
        }
        self.pos += 1;
        Ok(atom)
    }

    fn bracket_symbol(&mut self, open: usize) -> Result<(Element, bool), Error> {
        let rest = &self.input[self.pos..];
        for symbol in &AROMATIC_SYMBOLS[6..] {
            if rest.starts_with(symbol.as_bytes()) {
                self.pos += symbol.len();
                return Ok((guess_aromatic(symbol).ok_or_else(|| self.error(open, "bad symbol"))?, true));
            }
        }

        match rest.first().copied() {
            Some(c) if c.is_ascii_lowercase() => {
                let symbol = (c as char).to_string();
                if !AROMATIC_SYMBOLS.contains(&symbol.as_str()) {
                    return Err(self.error(open, format!("'{symbol}' cannot be aromatic")));
                }
                self.pos += 1;
                Ok((guess_aromatic(&symbol).ok_or_else(|| self.error(open, "bad symbol"))?, true))
            }
            Some(c) if c.is_ascii_uppercase() => {
                if let Some(&second) = rest.get(1).filter(|b| b.is_ascii_lowercase()) {
                    let two = format!("{}{}", c as char, second as char);
                    if let Ok(element) = Element::from_str(&two) {
                        self.pos += 2;
                        return Ok((element, false));
                    }
                }
                let one = (c as char).to_string();
                let element = Element::from_str(&one).map_err(|e| self.error(open, e.to_string()))?;
                self.pos += 1;
                Ok((element, false))
            }
            _ => Err(self.error(open, "bracket atom without an element symbol")),
        }
    }

    fn skip_chirality(&mut self) {
        if self.peek() != Some(b'@') {
            return;
        }
        while self.peek() == Some(b'@') {
            self.pos += 1;
        }
        let class = [self.peek(), self.peek_at(1)];
        if let [Some(a), Some(b)] = class {
            if matches!(&[a, b], b"TH" | b"AL" | b"SP" | b"TB" | b"OH") {
                self.pos += 2;
                self.number();
            }
        }
    }

    fn charge(&mut self, open: usize) -> Result<i8, Error> {
        let sign: i8 = match self.peek() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Ok(0),
        };
        let symbol = self.input[self.pos];
        self.pos += 1;

        if let Some(magnitude) = self.number() {
            let magnitude =
                i8::try_from(magnitude).map_err(|_| self.error(open, "charge out of range"))?;
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
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}

fn guess_aromatic(symbol: &str) -> Option<Element> {
    crate::io::util::guess_element_symbol(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Hybridization;

    fn hydrogens(mol: &Molecule) -> Vec<u8> {
        mol.atoms().iter().map(|a| a.implicit_hydrogens).collect()
    }

    #[test]
    fn parses_acetic_acid() {
        let mol = parse("CC(=O)O").unwrap();
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bond_count(), 3);
        assert_eq!(hydrogens(&mol), vec![3, 0, 0, 1]);
        assert_eq!(mol.bonds()[1].order, BondOrder::Double);
        assert_eq!(mol.atoms()[1].hybridization, Hybridization::SP2);
    }

    #[test]
    fn parses_aromatic_rings() {
        let mol = parse("c1ccncc1").unwrap();
        assert!(mol.atoms().iter().all(|a| a.is_aromatic));
        assert!(mol.bonds().iter().all(|b| b.order == BondOrder::Aromatic));
        assert_eq!(hydrogens(&mol), vec![1, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn kekule_benzene_is_aromatized() {
        let mol = parse("C1=CC=CC=C1").unwrap();
        assert!(mol.atoms().iter().all(|a| a.is_aromatic));
        assert!(hydrogens(&mol).iter().all(|&h| h == 1));
    }

    #[test]
    fn bracket_atoms() {
        let mol = parse("[NH4+].[O-]C(=O)C.[2H]O[13CH3]").unwrap();
        let atoms = mol.atoms();
        assert_eq!(atoms[0].formal_charge, 1);
        assert_eq!(atoms[0].implicit_hydrogens, 4);
        assert_eq!(atoms[1].formal_charge, -1);
        assert_eq!(atoms[1].implicit_hydrogens, 0);
        assert_eq!(atoms[5].isotope, Some(2));
        assert_eq!(atoms[7].isotope, Some(13));
        assert_eq!(atoms[7].implicit_hydrogens, 3);
    }

    #[test]
    fn pyrrole_needs_explicit_hydrogen() {
        let mol = parse("c1cc[nH]c1").unwrap();
        assert_eq!(mol.atoms()[3].implicit_hydrogens, 1);
        assert!(mol.atoms()[3].is_aromatic);
    }

    #[test]
    fn stereo_is_discarded() {
        let mol = parse("C/C=C\\[C@@H](N)O").unwrap();
        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.atoms()[3].implicit_hydrogens, 1);
    }

    #[test]
    fn two_digit_ring_closures() {
        let mol = parse("C%10CCCCC%10").unwrap();
        assert_eq!(mol.bond_count(), 6);
    }

    #[test]
    fn biphenyl_link_is_single() {
        let mol = parse("c1ccccc1c1ccccc1").unwrap();
        let link = mol.bond_between(5, 6).unwrap();
        assert_eq!(link.order, BondOrder::Single);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse("C1CC"), Err(Error::Parse { .. })));
        assert!(matches!(parse("CC(C"), Err(Error::Parse { .. })));
        assert!(matches!(parse("CC)C"), Err(Error::Parse { .. })));
        assert!(matches!(parse(""), Err(Error::Parse { .. })));
        assert!(matches!(parse("CXC"), Err(Error::Parse { .. })));
        assert!(matches!(parse("C="), Err(Error::Parse { .. })));
        assert!(matches!(parse("[Zz]"), Err(Error::Parse { .. })));
    }

    #[test]
    fn rejects_chemically_invalid_input() {
        assert!(matches!(parse("C(C)(C)(C)(C)C"), Err(Error::Sanitize { .. })));
        assert!(matches!(parse("C1C1"), Err(Error::Sanitize { .. })));
    }

    #[test]
    fn rejects_aromatic_rings_without_kekule_form() {
        for smiles in ["n1cccc1", "c1cccc1", "c1cc1", "c1cc(C)(C)ccc1"] {
            let err = parse(smiles).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Sanitize {
                        source: SanitizeError::Kekulize { .. },
                        ..
                    }
                ),
                "{smiles}: {err}"
            );
        }
        assert!(parse("c1cc[nH]c1").is_ok());
        assert!(parse("O=c1cccc[nH]1").is_ok());
        assert!(parse("Cn1cnc2c1c(=O)n(C)c(=O)n2C").is_ok());
    }

    #[test]
    fn reads_titled_lines() {
        let input = "# comment\nCCO ethanol\n\nc1ccccc1\n";
        let records = read(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("ethanol"));
        assert_eq!(records[1].name, None);
    }

    #[test]
    fn read_reports_line_numbers() {
        let err = read("CCO\nC1CC\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                position: Position::Line(2),
                ..
            }
        ));
    }
}
