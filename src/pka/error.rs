//! Error types for pKa prediction.
//!
//! Every failure of the prediction pipeline is reported through the single
//! [`Error`] enum, re-exported at the crate root as
//! [`PkaError`](crate::PkaError). Reader and perception errors are folded
//! into [`Error::InvalidStructure`] at the boundary.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::molecule::AtomId;
use crate::model::types::Polarity;

/// Errors that can occur while predicting pKa values.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be parsed or failed chemical sanitization.
    ///
    /// Covers malformed SMILES or SDF text, impossible valences, aromatic
    /// flags outside rings, aromatic systems with no Kekulé structure and
    /// disconnected input under the default fragment policy.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// The weights for one polarity could not be loaded.
    ///
    /// Occurs when the weight file is missing, cannot be decoded, or its
    /// tensor shapes do not describe a network compatible with the
    /// featurizer.
    #[error("failed to load {polarity} model from '{}': {detail}", path.display())]
    ModelLoad {
        /// Polarity the model was requested for.
        polarity: Polarity,
        /// Location the weights were looked up at.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },

    /// An atom id does not belong to the molecule it was used with.
    #[error("atom id {atom} is out of range for a molecule with {atom_count} atoms")]
    InvalidAtomId { atom: AtomId, atom_count: usize },

    /// A custom ionization pattern table is malformed.
    #[error("invalid ionization pattern table: {0}")]
    PatternTable(String),

    /// The tensor runtime failed during a forward pass.
    #[error("model inference failed: {0}")]
    Inference(String),
}

impl From<crate::io::Error> for Error {
    fn from(e: crate::io::Error) -> Self {
        Error::InvalidStructure(e.to_string())
    }
}

impl From<crate::perceive::SanitizeError> for Error {
    fn from(e: crate::perceive::SanitizeError) -> Self {
        Error::InvalidStructure(e.to_string())
    }
}

impl From<candle_core::Error> for Error {
    fn from(e: candle_core::Error) -> Self {
        Error::Inference(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::PatternTable(e.to_string())
    }
}

impl Error {
    /// Creates a [`ModelLoad`](Error::ModelLoad) error.
    ///
    /// # Arguments
    ///
    /// * `polarity` — Polarity of the requested model
    /// * `path` — Weight file location
    /// * `details` — Description of the problem
    pub fn model_load(
        polarity: Polarity,
        path: impl Into<PathBuf>,
        details: impl Into<String>,
    ) -> Self {
        Self::ModelLoad {
            polarity,
            path: path.into(),
            detail: details.into(),
        }
    }

    /// Creates an [`InvalidAtomId`](Error::InvalidAtomId) error.
    pub fn invalid_atom_id(atom: AtomId, atom_count: usize) -> Self {
        Self::InvalidAtomId { atom, atom_count }
    }
}
