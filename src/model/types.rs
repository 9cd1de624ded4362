use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or unsupported element symbol: '{0}'")]
pub struct ParseElementError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bond order string: '{0}'")]
pub struct ParseBondOrderError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid polarity '{0}' (expected 'acid' or 'base')")]
pub struct ParsePolarityError(String);

/// Chemical element, discriminant equal to the atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H = 1,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Sc,
    Ti,
    V,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Rb,
    Sr,
    Y,
    Zr,
    Nb,
    Mo,
    Tc,
    Ru,
    Rh,
    Pd,
    Ag,
    Cd,
    In,
    Sn,
    Sb,
    Te,
    I,
    Xe,
    Cs,
    Ba,
    La,
    Ce,
    Pr,
    Nd,
    Pm,
    Sm,
    Eu,
    Gd,
    Tb,
    Dy,
    Ho,
    Er,
    Tm,
    Yb,
    Lu,
    Hf,
    Ta,
    W,
    Re,
    Os,
    Ir,
    Pt,
    Au,
    Hg,
    Tl,
    Pb,
    Bi,
    Po,
    At,
    Rn,
    Fr,
    Ra,
    Ac,
    Th,
    Pa,
    U,
    Np,
    Pu,
    Am,
    Cm,
    Bk,
    Cf,
    Es,
    Fm,
    Md,
    No,
    Lr,
    Rf,
    Db,
    Sg,
    Bh,
    Hs,
    Mt,
    Ds,
    Rg,
    Cn,
    Nh,
    Fl,
    Mc,
    Lv,
    Ts,
    Og = 118,
}

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

impl Element {
    /// Every element, ordered by atomic number.
    pub const ALL: [Element; 118] = {
        use Element::*;
        [
            H, He, Li, Be, B, C, N, O, F, Ne, Na, Mg, Al, Si, P, S, Cl, Ar, K, Ca, Sc, Ti, V, Cr,
            Mn, Fe, Co, Ni, Cu, Zn, Ga, Ge, As, Se, Br, Kr, Rb, Sr, Y, Zr, Nb, Mo, Tc, Ru, Rh, Pd,
            Ag, Cd, In, Sn, Sb, Te, I, Xe, Cs, Ba, La, Ce, Pr, Nd, Pm, Sm, Eu, Gd, Tb, Dy, Ho, Er,
            Tm, Yb, Lu, Hf, Ta, W, Re, Os, Ir, Pt, Au, Hg, Tl, Pb, Bi, Po, At, Rn, Fr, Ra, Ac, Th,
            Pa, U, Np, Pu, Am, Cm, Bk, Cf, Es, Fm, Md, No, Lr, Rf, Db, Sg, Bh, Hs, Mt, Ds, Rg, Cn,
            Nh, Fl, Mc, Lv, Ts, Og,
        ]
    };

    #[inline]
    pub fn atomic_number(&self) -> u8 {
        *self as u8
    }

    pub fn from_atomic_number(number: u8) -> Option<Self> {
        let idx = usize::from(number).checked_sub(1)?;
        Self::ALL.get(idx).copied()
    }

    pub fn symbol(&self) -> &'static str {
        SYMBOLS[usize::from(self.atomic_number()) - 1]
    }

    /// Outer-shell electron count for main-group elements.
    pub fn valence_electrons(&self) -> Option<u8> {
        match self {
            Element::H | Element::Li | Element::Na | Element::K | Element::Rb | Element::Cs => {
                Some(1)
            }
            Element::Be | Element::Mg | Element::Ca | Element::Sr | Element::Ba => Some(2),
            Element::B | Element::Al | Element::Ga | Element::In | Element::Tl => Some(3),
            Element::C | Element::Si | Element::Ge | Element::Sn | Element::Pb => Some(4),
            Element::N | Element::P | Element::As | Element::Sb | Element::Bi => Some(5),
            Element::O | Element::S | Element::Se | Element::Te | Element::Po => Some(6),
            Element::F | Element::Cl | Element::Br | Element::I | Element::At => Some(7),
            Element::He | Element::Ne | Element::Ar | Element::Kr | Element::Xe | Element::Rn => {
                Some(8)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        *self == Element::H
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SYMBOLS
            .iter()
            .position(|&sym| sym == s)
            .map(|idx| Self::ALL[idx])
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn value(&self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }

    /// Integral contribution to valence; aromatic bonds count once and are
    /// corrected for by the valence model.
    pub fn valence(&self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondOrder::Single => write!(f, "Single"),
            BondOrder::Double => write!(f, "Double"),
            BondOrder::Triple => write!(f, "Triple"),
            BondOrder::Aromatic => write!(f, "Aromatic"),
        }
    }
}

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "1" | "-" => Ok(BondOrder::Single),
            "double" | "2" | "=" => Ok(BondOrder::Double),
            "triple" | "3" | "#" => Ok(BondOrder::Triple),
            "aromatic" | "ar" | ":" => Ok(BondOrder::Aromatic),
            _ => Err(ParseBondOrderError(s.to_string())),
        }
    }
}

/// Orbital hybridization state of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Hybridization {
    S,
    SP,
    SP2,
    SP3,
    SP3D,
    SP3D2,
    #[default]
    Unspecified,
}

impl fmt::Display for Hybridization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Hybridization::S => "S",
            Hybridization::SP => "SP",
            Hybridization::SP2 => "SP2",
            Hybridization::SP3 => "SP3",
            Hybridization::SP3D => "SP3D",
            Hybridization::SP3D2 => "SP3D2",
            Hybridization::Unspecified => "?",
        };
        f.write_str(s)
    }
}

/// Direction of proton transfer a site or model is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Acid,
    Base,
}

impl Polarity {
    pub const BOTH: [Polarity; 2] = [Polarity::Acid, Polarity::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Acid => "acid",
            Polarity::Base => "base",
        }
    }

    #[inline]
    pub(crate) fn slot(&self) -> usize {
        match self {
            Polarity::Acid => 0,
            Polarity::Base => 1,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = ParsePolarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "acid" | "acidic" | "a" => Ok(Polarity::Acid),
            "base" | "basic" | "b" => Ok(Polarity::Base),
            _ => Err(ParsePolarityError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn element_from_str_valid() {
        assert_eq!(Element::from_str("H").unwrap(), Element::H);
        assert_eq!(Element::from_str("Cl").unwrap(), Element::Cl);
        assert_eq!(Element::from_str("Fe").unwrap(), Element::Fe);
        assert_eq!(Element::from_str("Og").unwrap(), Element::Og);
    }

    #[test]
    fn element_from_str_invalid_case() {
        let err = Element::from_str("cl").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid or unsupported element symbol: 'cl'"
        );
    }

    #[test]
    fn element_table_is_consistent() {
        for (idx, element) in Element::ALL.iter().enumerate() {
            assert_eq!(usize::from(element.atomic_number()), idx + 1);
            assert_eq!(Element::from_str(element.symbol()).unwrap(), *element);
        }
        assert_eq!(Element::from_atomic_number(8), Some(Element::O));
        assert_eq!(Element::from_atomic_number(0), None);
        assert_eq!(Element::from_atomic_number(119), None);
    }

    #[test]
    fn valence_electrons_main_group() {
        assert_eq!(Element::C.valence_electrons(), Some(4));
        assert_eq!(Element::N.valence_electrons(), Some(5));
        assert_eq!(Element::Br.valence_electrons(), Some(7));
        assert_eq!(Element::Fe.valence_electrons(), None);
    }

    #[test]
    fn bondorder_from_str_variants() {
        assert_eq!(BondOrder::from_str("single").unwrap(), BondOrder::Single);
        assert_eq!(BondOrder::from_str("=").unwrap(), BondOrder::Double);
        assert_eq!(BondOrder::from_str("3").unwrap(), BondOrder::Triple);
        assert_eq!(BondOrder::from_str("AR").unwrap(), BondOrder::Aromatic);
        assert_eq!(
            BondOrder::from_str("quad").unwrap_err().to_string(),
            "invalid bond order string: 'quad'"
        );
    }

    #[test]
    fn bondorder_valence_counts_aromatic_once() {
        assert_eq!(BondOrder::Single.valence(), 1);
        assert_eq!(BondOrder::Aromatic.valence(), 1);
        assert_eq!(BondOrder::Triple.valence(), 3);
        assert!((BondOrder::Aromatic.value() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn polarity_parse_and_display() {
        assert_eq!(Polarity::from_str("Acid").unwrap(), Polarity::Acid);
        assert_eq!(Polarity::from_str("basic").unwrap(), Polarity::Base);
        assert!(Polarity::from_str("neutral").is_err());
        assert_eq!(Polarity::Base.to_string(), "base");
        assert_ne!(Polarity::Acid.slot(), Polarity::Base.slot());
    }
}
