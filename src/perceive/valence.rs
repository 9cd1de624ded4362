//! Default valence model.
//!
//! Implicit hydrogen counts for SMILES organic-subset atoms and CTfile atoms
//! are derived from the lowest allowed valence that accommodates the
//! explicit bonds. Charged atoms use the valence list of their
//! isoelectronic neutral analogue (N+ behaves like C, O- like F, ...).

use crate::model::types::Element;

/// Allowed valences of the neutral element, lowest first.
pub fn default_valences(element: Element) -> &'static [u8] {
    match element {
        Element::H => &[1],
        Element::B | Element::Al => &[3],
        Element::C | Element::Si | Element::Ge => &[4],
        Element::N => &[3, 5],
        Element::P | Element::As => &[3, 5],
        Element::O => &[2],
        Element::S | Element::Se | Element::Te => &[2, 4, 6],
        Element::F => &[1],
        Element::Cl | Element::Br | Element::I => &[1, 3, 5, 7],
        _ => &[],
    }
}

/// Allowed valences after adjusting for a formal charge.
pub fn allowed_valences(element: Element, charge: i8) -> Vec<u8> {
    let base = default_valences(element);
    if charge == 0 {
        return base.to_vec();
    }

    let q = i16::from(charge);
    let shift = match element.valence_electrons() {
        Some(3) => -q,
        Some(4) => -q.abs(),
        Some(5..=7) => q,
        _ => 0,
    };

    base.iter()
        .filter_map(|&v| u8::try_from(i16::from(v) + shift).ok())
        .collect()
}

/// Implicit hydrogens needed to complete `bond_valence` for an atom that
/// does not state its hydrogen count explicitly.
///
/// Aromatic atoms add one to the explicit valence for their π bond and
/// only consider the lowest allowed valence.
pub fn implicit_hydrogens(element: Element, charge: i8, aromatic: bool, bond_valence: u8) -> u8 {
    let valences = allowed_valences(element, charge);
    let Some(&lowest) = valences.first() else {
        return 0;
    };

    if aromatic {
        return lowest.saturating_sub(bond_valence + 1);
    }

    valences
        .iter()
        .find(|&&v| v >= bond_valence)
        .map_or(0, |&v| v - bond_valence)
}

/// Highest valence accepted during sanitization, or `None` when the element
/// is not covered by the valence model.
pub fn max_valence(element: Element, charge: i8) -> Option<u8> {
    allowed_valences(element, charge).last().copied()
}
