//! Chemical perception on top of the raw molecular graph.
//!
//! Readers build a [`Molecule`] from bonds and explicit attributes only;
//! [`sanitize`] then checks valences and Kekulé structures, perceives rings
//! and aromaticity, and assigns hybridization so every downstream consumer
//! sees a consistent chemical interpretation regardless of the input
//! notation.

use thiserror::Error;
use tracing::trace;

use crate::model::graph::MolecularGraph;
use crate::model::molecule::{AtomId, GraphError, Molecule};
use crate::model::types::Element;

pub mod aromaticity;
pub mod canon;
pub mod hybridization;
pub mod kekule;
pub mod rings;
pub mod valence;

pub use rings::RingInfo;

/// Reasons a structure is rejected during sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// The bond list itself is inconsistent.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An atom has more bonds than its element and charge allow.
    #[error(
        "explicit valence {valence} of atom {atom} ({element}) exceeds the allowed maximum of {max}"
    )]
    Valence {
        atom: AtomId,
        element: Element,
        valence: u8,
        max: u8,
    },

    /// An atom was marked aromatic but does not sit in any ring.
    #[error("atom {atom} is marked aromatic but is not in a ring")]
    NonRingAromatic { atom: AtomId },

    /// Aromatic atoms that cannot be given alternating double bonds.
    #[error("cannot kekulize the aromatic system around atoms {atoms:?}")]
    Kekulize { atoms: Vec<AtomId> },
}

/// Validates and perceives a freshly read molecule.
///
/// Elements outside the valence model (metals, noble gases) are accepted
/// without a valence check.
pub fn sanitize(molecule: Molecule) -> Result<Molecule, SanitizeError> {
    let rings = RingInfo::perceive(&molecule);

    for (id, atom) in molecule.atoms().iter().enumerate() {
        if atom.is_aromatic && !rings.is_atom_in_ring(id) {
            return Err(SanitizeError::NonRingAromatic { atom: id });
        }

        let Some(max) = valence::max_valence(atom.element, atom.formal_charge) else {
            continue;
        };
        // Aromatic bonds count once here; kekulization checks the π share.
        let total = molecule
            .bond_valence(id)
            .saturating_add(atom.implicit_hydrogens);
        if total > max {
            return Err(SanitizeError::Valence {
                atom: id,
                element: atom.element,
                valence: total,
                max,
            });
        }
    }

    let doubles =
        kekule::kekulize(&molecule).map_err(|atoms| SanitizeError::Kekulize { atoms })?;

    let molecule = aromaticity::aromatize(molecule, &rings);
    trace!(
        kekule_doubles = doubles.len(),
        atoms = molecule.atom_count(),
        rings = rings.num_rings(),
        "sanitized molecule"
    );
    Ok(hybridization::assign(molecule))
}
