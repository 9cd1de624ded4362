//! Tabular and JSON-lines output of prediction and site reports.
//!
//! Atom ids index the normalized structure. With the default normalization
//! the heavy atoms follow the atom order of the reported SMILES and explicit
//! hydrogens come after them.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use pka_forge::io as chem_io;
use pka_forge::{IonizationSite, Molecule, Polarity, Prediction};

use crate::util::text::format_pka;

#[derive(Debug, Serialize)]
pub struct PredictionReport {
    pub name: String,
    pub smiles: String,
    #[serde(flatten)]
    pub prediction: Prediction,
    #[serde(skip)]
    pub molecule: Molecule,
}

impl PredictionReport {
    pub fn new(name: String, molecule: Molecule, prediction: Prediction) -> Self {
        Self {
            name,
            smiles: heavy_atom_smiles(&molecule),
            prediction,
            molecule,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SitesReport {
    pub name: String,
    pub smiles: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Vec<IonizationSite>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acid: Option<Vec<IonizationSite>>,
    #[serde(skip)]
    pub molecule: Molecule,
}

impl SitesReport {
    pub fn new(name: String, molecule: Molecule) -> Self {
        Self {
            name,
            smiles: heavy_atom_smiles(&molecule),
            base: None,
            acid: None,
            molecule,
        }
    }

    pub fn set(&mut self, polarity: Polarity, sites: Vec<IonizationSite>) {
        match polarity {
            Polarity::Base => self.base = Some(sites),
            Polarity::Acid => self.acid = Some(sites),
        }
    }

    /// Reported site lists, base first.
    pub fn lists(&self) -> Vec<(Polarity, Vec<IonizationSite>)> {
        [(Polarity::Base, &self.base), (Polarity::Acid, &self.acid)]
            .into_iter()
            .filter_map(|(polarity, sites)| sites.clone().map(|s| (polarity, s)))
            .collect()
    }
}

fn heavy_atom_smiles(molecule: &Molecule) -> String {
    chem_io::write_smiles(&molecule.remove_hydrogens())
}

fn element_of(molecule: &Molecule, atom: usize) -> String {
    molecule
        .atom(atom)
        .map(|a| a.element.to_string())
        .unwrap_or_else(|| "?".to_string())
}

pub fn write_predictions(
    out: &mut impl Write,
    reports: &[PredictionReport],
    json: bool,
) -> Result<()> {
    if json {
        return write_json_lines(out, reports);
    }

    writeln!(out, "name\tsmiles\tpolarity\tatom\telement\tpka")?;
    for report in reports {
        let mut written = false;
        for polarity in [Polarity::Base, Polarity::Acid] {
            for (atom, pka) in report.prediction.get(polarity).iter() {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    report.name,
                    report.smiles,
                    polarity,
                    atom,
                    element_of(&report.molecule, atom),
                    format_pka(pka)
                )?;
                written = true;
            }
        }
        if !written {
            writeln!(out, "{}\t{}\t-\t-\t-\t-", report.name, report.smiles)?;
        }
    }
    Ok(())
}

pub fn write_sites(out: &mut impl Write, reports: &[SitesReport], json: bool) -> Result<()> {
    if json {
        return write_json_lines(out, reports);
    }

    writeln!(out, "name\tsmiles\tpolarity\tatom\telement\tpattern")?;
    for report in reports {
        let mut written = false;
        for (polarity, sites) in report.lists() {
            for site in sites {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    report.name,
                    report.smiles,
                    polarity,
                    site.atom,
                    element_of(&report.molecule, site.atom),
                    site.pattern
                )?;
                written = true;
            }
        }
        if !written {
            writeln!(out, "{}\t{}\t-\t-\t-\t-", report.name, report.smiles)?;
        }
    }
    Ok(())
}

fn write_json_lines<T: Serialize>(out: &mut impl Write, items: &[T]) -> Result<()> {
    for item in items {
        serde_json::to_writer(&mut *out, item)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pka_forge::PkaMap;

    fn make_acetic_acid_report() -> PredictionReport {
        let molecule = chem_io::read_smiles("CC(=O)O").unwrap();
        let prediction = Prediction {
            base: PkaMap::new(),
            acid: [(3, 4.756)].into_iter().collect(),
        };
        PredictionReport::new("acetic".to_string(), molecule, prediction)
    }

    fn render(reports: &[PredictionReport], json: bool) -> String {
        let mut buf = Vec::new();
        write_predictions(&mut buf, reports, json).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_output_has_one_row_per_site() {
        let text = render(&[make_acetic_acid_report()], false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name\tsmiles\tpolarity\tatom\telement\tpka");
        assert_eq!(lines[1], "acetic\tCC(=O)O\tacid\t3\tO\t4.76");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn structures_without_sites_still_get_a_row() {
        let molecule = chem_io::read_smiles("CC").unwrap();
        let report = PredictionReport::new("ethane".to_string(), molecule, Prediction::default());
        let text = render(&[report], false);
        assert_eq!(text.lines().nth(1), Some("ethane\tCC\t-\t-\t-\t-"));
    }

    #[test]
    fn json_lines_map_atoms_to_values() {
        let text = render(&[make_acetic_acid_report()], true);
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["name"], "acetic");
        assert_eq!(value["smiles"], "CC(=O)O");
        assert_eq!(value["acid"]["3"], 4.756);
        assert!(value["base"].as_object().unwrap().is_empty());
        assert!(value.get("molecule").is_none());
    }

    #[test]
    fn sites_json_omits_unrequested_polarity() {
        let molecule = chem_io::read_smiles("CC(=O)O").unwrap();
        let mut report = SitesReport::new("acetic".to_string(), molecule);
        report.set(
            Polarity::Acid,
            vec![IonizationSite {
                atom: 3,
                pattern: "carboxylic_acid".to_string(),
            }],
        );

        let mut buf = Vec::new();
        write_sites(&mut buf, &[report], true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["acid"][0]["atom"], 3);
        assert_eq!(value["acid"][0]["pattern"], "carboxylic_acid");
        assert!(value.get("base").is_none());
    }
}
