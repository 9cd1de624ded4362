//! Core data structures for molecules and prediction results.
//!
//! - [`types`] – Elements, bond orders, hybridization states and polarity.
//! - [`atom`] – Per-atom chemical attributes.
//! - [`molecule`] – Immutable molecular graphs with hydrogen completion.
//! - [`graph`] – The [`MolecularGraph`](graph::MolecularGraph) capability trait
//!   consumed by perception, matching and featurization.
//! - [`prediction`] – Per-polarity atom → pKa mappings.

pub mod atom;
pub mod graph;
pub mod molecule;
pub mod prediction;
pub mod types;
