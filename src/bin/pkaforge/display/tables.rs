use std::io::{self, Write};

use pka_forge::{IonizationSite, Molecule, Polarity, Prediction};

use crate::util::text::{format_pka, truncate};

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_input_summary(rows: &[(&str, String)]) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    print_kv_table(&mut out, "Input Summary", rows);
}

pub fn print_prediction(title: &str, molecule: &Molecule, prediction: &Prediction) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let rows: Vec<SiteRow> = Polarity::BOTH
        .iter()
        .flat_map(move |&polarity| {
            prediction
                .get(polarity)
                .iter()
                .map(move |(atom, pka)| SiteRow {
                    atom: atom_label(molecule, atom),
                    polarity,
                    value: format_pka(pka),
                })
        })
        .collect();

    print_site_table(&mut out, title, "pKa", &rows);
}

pub fn print_sites(title: &str, molecule: &Molecule, sites: &[(Polarity, Vec<IonizationSite>)]) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let rows: Vec<SiteRow> = sites
        .iter()
        .flat_map(move |(polarity, list)| {
            list.iter().map(move |site| SiteRow {
                atom: atom_label(molecule, site.atom),
                polarity: *polarity,
                value: site.pattern.clone(),
            })
        })
        .collect();

    print_site_table(&mut out, title, "Pattern", &rows);
}

pub fn atom_label(molecule: &Molecule, atom: usize) -> String {
    match molecule.atom(atom) {
        Some(a) => format!("{}{}", a.element, atom),
        None => atom.to_string(),
    }
}

struct SiteRow {
    atom: String,
    polarity: Polarity,
    value: String,
}

fn print_site_table(out: &mut impl Write, title: &str, value_header: &str, rows: &[SiteRow]) {
    let atom_w = 10usize;
    let kind_w = 8usize;
    let sep_overhead = 6;
    let value_w = SAFE_TABLE_WIDTH.saturating_sub(atom_w + kind_w + sep_overhead);

    let _ = writeln!(
        out,
        "{}┌─ {} ─┐",
        INDENT,
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(
        out,
        "{}┌{atom_line}┬{kind_line}┬{value_line}┐",
        INDENT,
        atom_line = "─".repeat(atom_w + 2),
        kind_line = "─".repeat(kind_w + 2),
        value_line = "─".repeat(value_w + 2)
    );
    let _ = writeln!(
        out,
        "{}│ {:<atom_w$} │ {:<kind_w$} │ {:>value_w$} │",
        INDENT,
        "Atom",
        "Kind",
        value_header,
    );
    let _ = writeln!(
        out,
        "{}├{atom_line}┼{kind_line}┼{value_line}┤",
        INDENT,
        atom_line = "─".repeat(atom_w + 2),
        kind_line = "─".repeat(kind_w + 2),
        value_line = "─".repeat(value_w + 2)
    );

    if rows.is_empty() {
        let _ = writeln!(
            out,
            "{}│ {:<atom_w$} │ {:<kind_w$} │ {:>value_w$} │",
            INDENT, "-", "-", "no ionizable sites",
        );
    }

    for row in rows {
        let _ = writeln!(
            out,
            "{}│ {:<atom_w$} │ {:<kind_w$} │ {:>value_w$} │",
            INDENT,
            truncate(&row.atom, atom_w),
            row.polarity.as_str(),
            truncate(&row.value, value_w),
        );
    }

    let _ = writeln!(
        out,
        "{}└{atom_line}┴{kind_line}┴{value_line}┘",
        INDENT,
        atom_line = "─".repeat(atom_w + 2),
        kind_line = "─".repeat(kind_w + 2),
        value_line = "─".repeat(value_w + 2)
    );
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);

    let _ = writeln!(
        out,
        "{}┌─ {} ─┐",
        INDENT,
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(
        out,
        "{}┌{k_line}┬{v_line}┐",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
    let _ = writeln!(
        out,
        "{}│ {:<key_w$} │ {:>val_w$} │",
        INDENT, "Setting", "Value",
    );
    let _ = writeln!(
        out,
        "{}├{k_line}┼{v_line}┤",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );

    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{}│ {:<key_w$} │ {:>val_w$} │",
            INDENT,
            truncate(key, key_w),
            truncate(val, val_w),
        );
    }

    let _ = writeln!(
        out,
        "{}└{k_line}┴{v_line}┘",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
}
