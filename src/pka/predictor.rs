use std::sync::Arc;

use candle_core::Device;
use tracing::debug;

use super::cache::ModelCache;
use super::config::PkaConfig;
use super::error::Error;
use super::featurize::Featurizer;
use super::ionization::{self, IonizationSite};
use super::net::GcnModel;
use super::normalize::normalize;
use super::patterns::{PatternSet, PatternTable, load_patterns};
use crate::io;
use crate::model::graph::MolecularGraph;
use crate::model::molecule::Molecule;
use crate::model::prediction::{PkaMap, Prediction};
use crate::model::types::Polarity;

/// A reusable prediction pipeline.
///
/// Holds the compiled pattern table, the compute device and one model slot
/// per polarity. Models load on the first request that needs them and are
/// reused afterwards. `Predictor` is `Sync` and can be shared across threads
/// by reference.
///
/// # Examples
///
/// ```no_run
/// use pka_forge::{PkaConfig, Predictor, io};
///
/// let predictor = Predictor::new(PkaConfig::default())?;
/// let molecule = io::read_smiles("CC(=O)O")?;
/// let (prediction, prepared) = predictor.predict_for_protonate(&molecule)?;
/// for (atom, pka) in prediction.acid.iter() {
///     println!("{} {atom}: {pka:.2}", prepared.atoms()[atom].element);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Predictor {
    config: PkaConfig,
    patterns: PatternSet,
    device: Device,
    cache: ModelCache,
}

impl Predictor {
    /// Compiles the pattern table and opens the device. Models are not
    /// touched until a prediction needs them.
    pub fn new(config: PkaConfig) -> Result<Self, Error> {
        let patterns = load_patterns(config.patterns.as_deref())?;
        let device = config.device.select();
        Ok(Self {
            config,
            patterns,
            device,
            cache: ModelCache::new(),
        })
    }

    pub fn config(&self) -> &PkaConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Normalizes `molecule` with this predictor's settings.
    pub fn normalize(&self, molecule: &Molecule) -> Result<Molecule, Error> {
        normalize(molecule, &self.config.normalize)
    }

    /// Ionization sites of an already normalized molecule.
    pub fn sites<G: MolecularGraph + ?Sized>(
        &self,
        molecule: &G,
        polarity: Polarity,
    ) -> Vec<IonizationSite> {
        ionization::detect_sites(molecule, polarity, &self.patterns)
    }

    /// Predicts every `polarity` site of an already normalized molecule.
    ///
    /// Returns an empty map without loading the model when no site matches.
    pub fn predict_polarity<G: MolecularGraph + ?Sized>(
        &self,
        molecule: &G,
        polarity: Polarity,
    ) -> Result<PkaMap, Error> {
        let candidates = ionization::detect(molecule, polarity, &self.patterns);
        if candidates.is_empty() {
            debug!(%polarity, "no ionization sites");
            return Ok(PkaMap::new());
        }

        let model = self.model(polarity)?;
        let featurizer = Featurizer::new(molecule);
        let mut result = PkaMap::with_capacity(candidates.len());
        for atom in candidates {
            let features = featurizer.encode(atom)?;
            let pka = model.forward(&features)?;
            debug!(%polarity, atom, pka, "predicted");
            result.insert(atom, pka);
        }
        Ok(result)
    }

    /// Normalizes `molecule`, then predicts base and acid sites.
    pub fn predict(&self, molecule: &Molecule) -> Result<Prediction, Error> {
        self.predict_for_protonate(molecule)
            .map(|(prediction, _)| prediction)
    }

    /// Like [`predict`](Self::predict), also returning the normalized
    /// molecule the atom ids refer to.
    pub fn predict_for_protonate(
        &self,
        molecule: &Molecule,
    ) -> Result<(Prediction, Molecule), Error> {
        let prepared = self.normalize(molecule)?;
        let base = self.predict_polarity(&prepared, Polarity::Base)?;
        let acid = self.predict_polarity(&prepared, Polarity::Acid)?;
        Ok((Prediction { base, acid }, prepared))
    }

    fn model(&self, polarity: Polarity) -> Result<Arc<GcnModel>, Error> {
        self.cache.get_or_load(polarity, || {
            let path = self.config.models.weight_path(polarity);
            GcnModel::load(&path, polarity, &self.device)
        })
    }
}

/// One-shot prediction with a fresh [`Predictor`].
pub fn predict(molecule: &Molecule, config: &PkaConfig) -> Result<Prediction, Error> {
    Predictor::new(config.clone())?.predict(molecule)
}

/// Parses `smiles` and predicts it with a fresh [`Predictor`].
pub fn predict_smiles(smiles: &str, config: &PkaConfig) -> Result<Prediction, Error> {
    let molecule = io::read_smiles(smiles)?;
    predict(&molecule, config)
}
