//! Ionization site detection.

use serde::Serialize;
use tracing::debug;

use super::patterns::PatternTable;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::AtomId;
use crate::model::types::Polarity;
use crate::smarts::MatchContext;

/// A detected site and the pattern that claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IonizationSite {
    pub atom: AtomId,
    pub pattern: String,
}

/// Candidate atoms for `polarity`, in pattern definition order.
///
/// Each pattern's matches are visited in enumeration order and the atoms at
/// its site positions are collected. The first pattern to reach an atom
/// claims it; ids are never repeated.
pub fn detect<G: MolecularGraph + ?Sized>(
    molecule: &G,
    polarity: Polarity,
    patterns: &PatternTable,
) -> Vec<AtomId> {
    detect_sites(molecule, polarity, patterns)
        .into_iter()
        .map(|site| site.atom)
        .collect()
}

/// Like [`detect`], keeping the name of the claiming pattern.
pub fn detect_sites<G: MolecularGraph + ?Sized>(
    molecule: &G,
    polarity: Polarity,
    patterns: &PatternTable,
) -> Vec<IonizationSite> {
    let ctx = MatchContext::new(molecule);
    let mut claimed = vec![false; molecule.atom_count()];
    let mut sites = Vec::new();

    for pattern in patterns.for_polarity(polarity) {
        let before = sites.len();
        for hit in pattern.smarts.find_all_in(&ctx) {
            for &position in &pattern.sites {
                let atom = hit[position];
                if !claimed[atom] {
                    claimed[atom] = true;
                    sites.push(IonizationSite {
                        atom,
                        pattern: pattern.name.clone(),
                    });
                }
            }
        }
        if sites.len() > before {
            debug!(
                %polarity,
                pattern = %pattern.name,
                sites = sites.len() - before,
                "pattern matched"
            );
        }
    }

    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;
    use crate::model::molecule::Molecule;
    use crate::model::types::Element;
    use crate::pka::config::NormalizeConfig;
    use crate::pka::normalize::normalize;
    use crate::pka::patterns::default_patterns;

    fn make_prepared(smiles: &str) -> Molecule {
        let mol = io::read_smiles(smiles).unwrap();
        normalize(&mol, &NormalizeConfig::default()).unwrap()
    }

    fn elements(mol: &Molecule, ids: &[AtomId]) -> Vec<Element> {
        ids.iter().map(|&id| mol.atoms()[id].element).collect()
    }

    #[test]
    fn acetic_acid_sites() {
        let mol = make_prepared("CC(=O)O");
        let table = default_patterns().unwrap();

        let acid = detect(&mol, Polarity::Acid, table);
        assert_eq!(acid.len(), 1);
        let oxygen = acid[0];
        assert_eq!(mol.atoms()[oxygen].element, Element::O);
        assert_eq!(mol.total_hydrogens(oxygen), 1);

        let base = detect(&mol, Polarity::Base, table);
        assert!(base.is_empty());
    }

    #[test]
    fn reference_structure_sites() {
        let mol = make_prepared("CN(C)CCCN1C2=CC=CC=C2SC2=C1C=C(C=C2)C(C)=O");
        let table = default_patterns().unwrap();

        let base = detect_sites(&mol, Polarity::Base, table);
        let names: Vec<_> = base.iter().map(|s| s.pattern.as_str()).collect();
        assert_eq!(names, ["aliphatic_amine", "aniline"]);
        assert_eq!(
            elements(&mol, &detect(&mol, Polarity::Base, table)),
            [Element::N, Element::N]
        );
        assert!(detect(&mol, Polarity::Acid, table).is_empty());
    }

    #[test]
    fn first_pattern_claims_the_atom() {
        let mol = make_prepared("OC(=O)c1ccccc1");
        let table = default_patterns().unwrap();
        let sites = detect_sites(&mol, Polarity::Acid, table);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].pattern, "carboxylic_acid");
    }

    #[test]
    fn ids_are_unique_and_deterministic() {
        let mol = make_prepared("OP(=O)(O)c1ccc(N)cc1");
        let table = default_patterns().unwrap();
        for polarity in Polarity::BOTH {
            let first = detect(&mol, polarity, table);
            let mut dedup = first.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(dedup.len(), first.len());
            assert_eq!(detect(&mol, polarity, table), first);
        }
        assert_eq!(detect(&mol, Polarity::Acid, table).len(), 2);
    }

    #[test]
    fn heterocycles() {
        let table = default_patterns().unwrap();

        let imidazole = make_prepared("c1c[nH]cn1");
        assert_eq!(detect(&imidazole, Polarity::Acid, table).len(), 1);
        assert_eq!(detect(&imidazole, Polarity::Base, table).len(), 1);

        let pyridine = make_prepared("c1ccncc1");
        assert!(detect(&pyridine, Polarity::Acid, table).is_empty());
        assert_eq!(detect(&pyridine, Polarity::Base, table).len(), 1);
    }

    #[test]
    fn amides_are_not_basic() {
        let table = default_patterns().unwrap();
        let mol = make_prepared("CC(=O)NC");
        assert!(detect(&mol, Polarity::Base, table).is_empty());
        let acid = detect_sites(&mol, Polarity::Acid, table);
        assert_eq!(acid.len(), 1);
        assert_eq!(acid[0].pattern, "amide_nh");
    }
}
