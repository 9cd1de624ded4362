//! Graph neural network pKa prediction for the ionizable atoms of small molecules.
//! It normalizes the input structure, finds acidic and basic sites with an
//! ordered table of SMARTS rules, and scores every site with a per-polarity
//! graph convolutional network running on `candle`.
//!
//! # Features
//!
//! - **Structure input** — SMILES and MDL SDF (V2000) readers with valence
//!   checking, ring and aromaticity perception
//! - **Normalization** — Charge neutralization, canonical atom order and
//!   explicit hydrogens, so atom ids are stable for a given structure
//! - **Site detection** — Versioned, replaceable TOML table of SMARTS
//!   patterns, evaluated first-match-wins per atom
//! - **Inference** — GCN weights from safetensors or PyTorch state dicts,
//!   loaded lazily once per polarity, on CPU, CUDA or Metal
//!
//! # Quick Start
//!
//! Site detection needs no model files:
//!
//! ```
//! use pka_forge::{MolecularGraph, NormalizeConfig, Polarity, default_patterns, detect, io, normalize};
//!
//! let acetic = io::read_smiles("CC(=O)O")?;
//! let prepared = normalize(&acetic, &NormalizeConfig::default())?;
//! let table = default_patterns()?;
//!
//! // The hydroxyl oxygen is the only acidic site; the carbonyl is not basic.
//! let acid = detect(&prepared, Polarity::Acid, table);
//! assert_eq!(acid.len(), 1);
//! assert_eq!(prepared.total_hydrogens(acid[0]), 1);
//! assert!(detect(&prepared, Polarity::Base, table).is_empty());
//! # Ok::<(), pka_forge::PkaError>(())
//! ```
//!
//! Full prediction reads `weight_acid` and `weight_base` from the model
//! directory configured in [`PkaConfig`]:
//!
//! ```no_run
//! use pka_forge::{PkaConfig, predict_smiles};
//!
//! let prediction = predict_smiles("CN(C)CCCN1C2=CC=CC=C2SC2=C1C=C(C=C2)C(C)=O", &PkaConfig::default())?;
//! for (atom, pka) in prediction.base.iter() {
//!     println!("base site {atom}: {pka:.2}");
//! }
//! # Ok::<(), pka_forge::PkaError>(())
//! ```
//!
//! # Cargo Features
//!
//! - `cli` (default) — The `pkaforge` binary and its dependencies; library
//!   users can turn it off with `default-features = false`
//! - `rdkit` — Neutralize charges with RDKit's `Uncharger` during
//!   normalization (needs the native RDKit library)
//! - `cuda`, `metal` — GPU backends for `candle`
//!
//! # Module Organization
//!
//! - [`io`] — SMILES and SDF input, canonical SMILES output
//! - [`perceive`] — Rings, valence, aromaticity, hybridization, canonical ranks
//! - [`smarts`] — SMARTS parsing and substructure search
//! - [`Predictor`] — The reusable prediction pipeline
//!
//! # Data Types
//!
//! - [`Molecule`] — Immutable molecular graph
//! - [`MolecularGraph`] — Read access consumed by perception, matching and featurization
//! - [`Prediction`] / [`PkaMap`] — Ordered atom → pKa mappings per polarity
//! - [`IonizationSite`] — A detected site and the pattern that claimed it
//! - [`FeatureTensor`] — Network input for one candidate atom
//! - [`Featurizer`] — Per-molecule encoding shared by its candidate atoms

mod model;
mod pka;

pub mod io;
pub mod perceive;
pub mod smarts;

pub use model::atom::Atom;
pub use model::graph::MolecularGraph;
pub use model::molecule::{AtomId, Bond, GraphError, Molecule};
pub use model::prediction::{PkaMap, Prediction};
pub use model::types::{
    BondOrder, Element, Hybridization, ParseBondOrderError, ParseElementError,
    ParsePolarityError, Polarity,
};

pub use pka::{
    ATOM_FEATURES, BOND_FEATURES, DEFAULT_MODEL_DIR, DeviceKind, FeatureTensor, Featurizer,
    FragmentPolicy, GcnModel, IonizationPattern, IonizationSite, ModelCache, ModelSource,
    NormalizeConfig, PATTERN_TABLE_VERSION, ParseDeviceError, PatternSet, PatternTable, PkaConfig,
    Predictor, default_patterns, detect, detect_sites, featurize, load_patterns, normalize,
    predict, predict_smiles,
};

pub use pka::Error as PkaError;
