use crate::model::types::{BondOrder, Element};
use std::str::FromStr;

/// Resolves a CTfile atom symbol, tolerating upper-case and padded forms
/// such as `CL` or ` Br`. Deuterium and tritium map to hydrogen.
pub fn guess_element_symbol(token: &str) -> Option<Element> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if matches!(token, "D" | "T") {
        return Some(Element::H);
    }

    let mut chars = token.chars();
    let first = chars.next()?.to_ascii_uppercase();
    let rest: String = chars.map(|c| c.to_ascii_lowercase()).collect();
    Element::from_str(&format!("{first}{rest}")).ok()
}

/// Isotope mass number implied by a hydrogen isotope symbol.
pub fn isotope_from_symbol(token: &str) -> Option<u16> {
    match token.trim() {
        "D" => Some(2),
        "T" => Some(3),
        _ => None,
    }
}

/// Maps a V2000 bond type field to a bond order. Query types (5-8) are
/// rejected.
pub fn bond_order_from_ctfile(value: i32) -> Option<BondOrder> {
    match value {
        1 => Some(BondOrder::Single),
        2 => Some(BondOrder::Double),
        3 => Some(BondOrder::Triple),
        4 => Some(BondOrder::Aromatic),
        _ => None,
    }
}

/// Decodes the legacy V2000 atom-block charge code (columns 37-39).
pub fn charge_from_ctfile(code: i32) -> Option<i8> {
    match code {
        0 => Some(0),
        1 => Some(3),
        2 => Some(2),
        3 => Some(1),
        4 => Some(0), // doublet radical
        5 => Some(-1),
        6 => Some(-2),
        7 => Some(-3),
        _ => None,
    }
}
