use crate::io::{Format, Record, error::Error, util};
use crate::model::{
    atom::Atom,
    graph::MolecularGraph,
    molecule::{Bond, Molecule},
    types::BondOrder,
};
use crate::perceive::{self, valence};
use std::io::BufRead;

/// Reads every record of a V2000 SD file.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<Record>, Error> {
    let mut records = Vec::new();
    for block in collect_blocks(reader)? {
        records.push(parse_block(&block)?);
    }
    Ok(records)
}

fn parse_block(lines: &[(usize, String)]) -> Result<Record, Error> {
    if lines.len() < 4 {
        return Err(Error::parse(
            Format::Sdf,
            lines.first().map_or(1, |(ln, _)| *ln),
            "SDF block must contain at least a header and counts line",
        ));
    }

    let name = Some(lines[0].1.trim().to_string()).filter(|n| !n.is_empty());

    let counts_line_no = lines[3].0;
    let counts_line = &lines[3].1;
    if counts_line.contains("V3000") {
        return Err(Error::parse(
            Format::Sdf,
            counts_line_no,
            "V3000 is not supported",
        ));
    }

    let (atom_count, bond_count) = parse_counts(counts_line, counts_line_no)?;
    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let props_start = bond_start + bond_count;

    if lines.len() < props_start {
        return Err(Error::parse(
            Format::Sdf,
            lines.last().map(|(ln, _)| *ln).unwrap_or(counts_line_no),
            "SDF block ended before atoms/bonds were fully specified",
        ));
    }

    let mut atoms = parse_atoms(&lines[atom_start..bond_start])?;
    let bonds = parse_bonds(&lines[bond_start..props_start], atom_count)?;
    apply_properties(&lines[props_start..], &mut atoms)?;

    let molecule = Molecule::new(atoms, bonds)
        .map_err(|e| Error::sanitize(Format::Sdf, e.into()))?;
    let molecule = complete_hydrogens(molecule);
    let molecule = perceive::sanitize(molecule).map_err(|e| Error::sanitize(Format::Sdf, e))?;

    Ok(Record { name, molecule })
}

fn collect_blocks<R: BufRead>(reader: R) -> Result<Vec<Vec<(usize, String)>>, Error> {
    let mut blocks = Vec::new();
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let content = line.map_err(|e| Error::Io { source: e })?;
        let ln = i + 1;
        if content.trim() == "$$$$" {
            if !lines.is_empty() {
                blocks.push(std::mem::take(&mut lines));
            }
            continue;
        }
        lines.push((ln, content));
    }
    if lines.iter().any(|(_, l)| !l.trim().is_empty()) {
        blocks.push(lines);
    }
    Ok(blocks)
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), Error> {
    let padded = format!("{line:<6}");
    let atoms = padded[0..3]
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse(Format::Sdf, line_no, "invalid atom count"))?;
    let bonds = padded[3..6]
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse(Format::Sdf, line_no, "invalid bond count"))?;
    Ok((atoms, bonds))
}

fn parse_atoms(lines: &[(usize, String)]) -> Result<Vec<Atom>, Error> {
    let mut atoms = Vec::with_capacity(lines.len());
    for (ln, raw) in lines {
        let padded = format!("{raw:<40}");
        for (range, axis) in [(0..10, "x"), (10..20, "y"), (20..30, "z")] {
            padded[range].trim().parse::<f64>().map_err(|_| {
                Error::parse(
                    Format::Sdf,
                    *ln,
                    format!("invalid {axis} coordinate in atom line"),
                )
            })?;
        }

        let element_token = padded[31..34].trim();
        let element = util::guess_element_symbol(element_token)
            .ok_or_else(|| Error::parse(Format::Sdf, *ln, "unable to infer element symbol"))?;

        let charge_code = match padded[36..39].trim() {
            "" => 0,
            code => code
                .parse::<i32>()
                .map_err(|_| Error::parse(Format::Sdf, *ln, "invalid charge field"))?,
        };
        let charge = util::charge_from_ctfile(charge_code)
            .ok_or_else(|| Error::parse(Format::Sdf, *ln, "unsupported charge code"))?;

        let mut atom = Atom::new(element).with_charge(charge);
        atom.isotope = util::isotope_from_symbol(element_token);
        atoms.push(atom);
    }
    Ok(atoms)
}

fn parse_bonds(lines: &[(usize, String)], atom_count: usize) -> Result<Vec<Bond>, Error> {
    let mut bonds = Vec::with_capacity(lines.len());
    for (ln, raw) in lines {
        let padded = format!("{raw:<9}");
        let field = |range: std::ops::Range<usize>, what: &str| {
            padded[range]
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::parse(Format::Sdf, *ln, format!("invalid {what}")))
        };

        let a1 = field(0..3, "first atom index")?;
        let a2 = field(3..6, "second atom index")?;
        let order_val = field(6..9, "bond order value")?;

        let order = util::bond_order_from_ctfile(order_val)
            .ok_or_else(|| Error::parse(Format::Sdf, *ln, "unsupported bond order in bond line"))?;

        let in_range = |a: i32| a >= 1 && (a as usize) <= atom_count;
        if !in_range(a1) || !in_range(a2) {
            return Err(Error::parse(
                Format::Sdf,
                *ln,
                "bond references atom outside declared range",
            ));
        }

        bonds.push(Bond::new(a1 as usize - 1, a2 as usize - 1, order));
    }
    Ok(bonds)
}

// `M  CHG` supersedes every atom-block charge in the record.
fn apply_properties(lines: &[(usize, String)], atoms: &mut [Atom]) -> Result<(), Error> {
    let mut charges_reset = false;
    for (ln, raw) in lines {
        if raw.starts_with("M  END") {
            break;
        }
        let is_charge = raw.starts_with("M  CHG");
        if !is_charge && !raw.starts_with("M  ISO") {
            continue;
        }

        let values = parse_property_pairs(raw, *ln, atoms.len())?;
        if is_charge && !charges_reset {
            atoms.iter_mut().for_each(|a| a.formal_charge = 0);
            charges_reset = true;
        }
        for (atom, value) in values {
            if is_charge {
                atoms[atom].formal_charge = i8::try_from(value)
                    .map_err(|_| Error::parse(Format::Sdf, *ln, "charge out of range"))?;
            } else {
                atoms[atom].isotope = Some(
                    u16::try_from(value)
                        .map_err(|_| Error::parse(Format::Sdf, *ln, "isotope out of range"))?,
                );
            }
        }
    }
    Ok(())
}

fn parse_property_pairs(
    raw: &str,
    ln: usize,
    atom_count: usize,
) -> Result<Vec<(usize, i32)>, Error> {
    let tokens: Vec<i32> = raw[6..]
        .split_whitespace()
        .map(|t| t.parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|_| Error::parse(Format::Sdf, ln, "invalid property line"))?;

    let Some((&count, pairs)) = tokens.split_first() else {
        return Err(Error::parse(Format::Sdf, ln, "empty property line"));
    };
    if count < 0 || pairs.len() != count as usize * 2 {
        return Err(Error::parse(
            Format::Sdf,
            ln,
            "property entry count does not match its values",
        ));
    }

    pairs
        .chunks_exact(2)
        .map(|pair| {
            let atom = pair[0];
            if atom < 1 || atom as usize > atom_count {
                return Err(Error::parse(
                    Format::Sdf,
                    ln,
                    "property references atom outside declared range",
                ));
            }
            Ok((atom as usize - 1, pair[1]))
        })
        .collect()
}

// Heavy atoms get hydrogens up to their lowest fitting valence; atoms
// touching an aromatic bond are flagged aromatic first.
fn complete_hydrogens(molecule: Molecule) -> Molecule {
    let aromatic: Vec<bool> = (0..molecule.atom_count())
        .map(|a| {
            molecule
                .neighbors(a)
                .iter()
                .any(|&(_, b)| molecule.bonds()[b].order == BondOrder::Aromatic)
        })
        .collect();
    let valences: Vec<u8> = (0..molecule.atom_count())
        .map(|a| molecule.bond_valence(a))
        .collect();

    let (mut atoms, bonds) = molecule.into_parts();
    for (idx, atom) in atoms.iter_mut().enumerate() {
        atom.is_aromatic = aromatic[idx];
        if !atom.is_hydrogen() {
            atom.implicit_hydrogens = valence::implicit_hydrogens(
                atom.element,
                atom.formal_charge,
                atom.is_aromatic,
                valences[idx],
            );
        }
    }
    Molecule::from_validated_parts(atoms, bonds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element;
    use std::io::Cursor;

    const ACETATE: &str = "\
acetate
  test

  4  3  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.2000    1.2000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
    2.2000   -1.2000    0.0000 O   0  5  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  2  3  2  0
  2  4  1  0
M  END
$$$$
";

    const BENZENE_AROMATIC: &str = "
  test

  6  6  0  0  0  0  0  0  0  0999 V2000
    0.0000    1.4000    0.0000 C   0  0
    1.2124    0.7000    0.0000 C   0  0
    1.2124   -0.7000    0.0000 C   0  0
    0.0000   -1.4000    0.0000 C   0  0
   -1.2124   -0.7000    0.0000 C   0  0
   -1.2124    0.7000    0.0000 C   0  0
  1  2  4  0
  2  3  4  0
  3  4  4  0
  4  5  4  0
  5  6  4  0
  6  1  4  0
M  END
$$$$
";

    #[test]
    fn reads_charges_and_hydrogens() {
        let records = read(Cursor::new(ACETATE)).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name.as_deref(), Some("acetate"));

        let atoms = record.molecule.atoms();
        assert_eq!(atoms[0].implicit_hydrogens, 3);
        assert_eq!(atoms[2].implicit_hydrogens, 0);
        assert_eq!(atoms[3].formal_charge, -1);
        assert_eq!(atoms[3].implicit_hydrogens, 0);
        assert_eq!(record.molecule.bonds()[1].order, BondOrder::Double);
    }

    #[test]
    fn charge_property_overrides_atom_block() {
        let text = ACETATE.replace("M  END", "M  CHG  1   4  -1\nM  END");
        let text = text.replacen("O   0  5", "O   0  0", 1);
        let records = read(Cursor::new(text)).unwrap();
        assert_eq!(records[0].molecule.atoms()[3].formal_charge, -1);
    }

    #[test]
    fn reads_multiple_records() {
        let text = format!("{ACETATE}{BENZENE_AROMATIC}");
        let records = read(Cursor::new(text)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, None);

        let benzene = &records[1].molecule;
        assert!(benzene.atoms().iter().all(|a| a.is_aromatic));
        assert!(benzene.atoms().iter().all(|a| a.implicit_hydrogens == 1));
        assert!(benzene.atoms().iter().all(|a| a.element == Element::C));
    }

    #[test]
    fn rejects_truncated_blocks() {
        let truncated: String = ACETATE.lines().take(6).collect::<Vec<_>>().join("\n");
        let err = read(Cursor::new(truncated)).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn rejects_v3000() {
        let text = ACETATE.replace("V2000", "V3000");
        assert!(matches!(
            read(Cursor::new(text)),
            Err(Error::Parse { .. })
        ));
    }
}
