use super::types::{Element, Hybridization};

/// A single atom of a molecular graph.
///
/// Hydrogens may be carried either as explicit [`Atom`]s bonded to their
/// parent or as the parent's `implicit_hydrogens` count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub element: Element,
    pub formal_charge: i8,
    pub is_aromatic: bool,
    pub hybridization: Hybridization,
    pub implicit_hydrogens: u8,
    pub isotope: Option<u16>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            formal_charge: 0,
            is_aromatic: false,
            hybridization: Hybridization::Unspecified,
            implicit_hydrogens: 0,
            isotope: None,
        }
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.formal_charge = charge;
        self
    }

    pub fn with_hydrogens(mut self, count: u8) -> Self {
        self.implicit_hydrogens = count;
        self
    }

    pub fn aromatic(mut self) -> Self {
        self.is_aromatic = true;
        self
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}
