use std::sync::{Arc, OnceLock};

use super::error::Error;
use super::net::GcnModel;
use crate::model::types::Polarity;

/// One lazily filled model slot per polarity.
///
/// A slot is written at most once; failed loads leave it empty so the next
/// request retries. Concurrent first requests may both load, only one
/// result is kept.
#[derive(Debug, Default)]
pub struct ModelCache {
    slots: [OnceLock<Arc<GcnModel>>; 2],
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, polarity: Polarity) -> Option<Arc<GcnModel>> {
        self.slots[polarity.slot()].get().cloned()
    }

    pub fn is_loaded(&self, polarity: Polarity) -> bool {
        self.slots[polarity.slot()].get().is_some()
    }

    pub fn get_or_load<F>(&self, polarity: Polarity, load: F) -> Result<Arc<GcnModel>, Error>
    where
        F: FnOnce() -> Result<GcnModel, Error>,
    {
        let slot = &self.slots[polarity.slot()];
        if let Some(model) = slot.get() {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(load()?);
        Ok(Arc::clone(slot.get_or_init(|| model)))
    }

    /// Stores a preloaded model. Returns it back if the slot is taken.
    pub fn insert(&self, polarity: Polarity, model: GcnModel) -> Result<(), GcnModel> {
        self.slots[polarity.slot()]
            .set(Arc::new(model))
            .map_err(Arc::unwrap_or_clone)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use candle_core::Device;

    use super::*;
    use crate::pka::net::synthetic_params;

    fn make_model() -> GcnModel {
        GcnModel::from_tensors(synthetic_params(2, 0.0), &Device::Cpu).unwrap()
    }

    #[test]
    fn loads_once_per_polarity() {
        let cache = ModelCache::new();
        let calls = Cell::new(0);
        let loader = || {
            calls.set(calls.get() + 1);
            Ok(make_model())
        };

        let first = cache.get_or_load(Polarity::Acid, loader).unwrap();
        let second = cache
            .get_or_load(Polarity::Acid, || {
                calls.set(calls.get() + 1);
                Ok(make_model())
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_loaded(Polarity::Acid));
        assert!(!cache.is_loaded(Polarity::Base));
    }

    #[test]
    fn failed_load_leaves_slot_empty() {
        let cache = ModelCache::new();
        let err = cache
            .get_or_load(Polarity::Base, || {
                Err(Error::model_load(Polarity::Base, "missing.pth", "not found"))
            })
            .unwrap_err();
        assert!(matches!(err, Error::ModelLoad { .. }));
        assert!(cache.get(Polarity::Base).is_none());

        assert!(cache.get_or_load(Polarity::Base, || Ok(make_model())).is_ok());
        assert!(cache.is_loaded(Polarity::Base));
    }

    #[test]
    fn insert_refuses_occupied_slot() {
        let cache = ModelCache::new();
        assert!(cache.insert(Polarity::Acid, make_model()).is_ok());
        assert!(cache.insert(Polarity::Acid, make_model()).is_err());
    }
}
