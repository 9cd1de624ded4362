use serde::{Serialize, Serializer};

use super::molecule::AtomId;
use super::types::Polarity;

/// Ordered atom → pKa mapping for one polarity.
///
/// Iteration follows insertion order, which is the order in which the site
/// detector emitted its candidates. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PkaMap {
    entries: Vec<(AtomId, f64)>,
}

impl PkaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Inserts or overwrites the value for `atom`, returning the old value.
    /// An overwritten key keeps its original position.
    pub fn insert(&mut self, atom: AtomId, pka: f64) -> Option<f64> {
        match self.entries.iter_mut().find(|(a, _)| *a == atom) {
            Some((_, value)) => Some(std::mem::replace(value, pka)),
            None => {
                self.entries.push((atom, pka));
                None
            }
        }
    }

    pub fn get(&self, atom: AtomId) -> Option<f64> {
        self.entries
            .iter()
            .find(|(a, _)| *a == atom)
            .map(|&(_, pka)| pka)
    }

    pub fn contains(&self, atom: AtomId) -> bool {
        self.get(atom).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.entries.iter().map(|&(a, _)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, f64)> + '_ {
        self.entries.iter().copied()
    }
}

impl FromIterator<(AtomId, f64)> for PkaMap {
    fn from_iter<T: IntoIterator<Item = (AtomId, f64)>>(iter: T) -> Self {
        let mut map = PkaMap::new();
        for (atom, pka) in iter {
            map.insert(atom, pka);
        }
        map
    }
}

impl Serialize for PkaMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(atom, pka)| (atom, pka)))
    }
}

/// Base and acid mappings for one molecule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prediction {
    pub base: PkaMap,
    pub acid: PkaMap,
}

impl Prediction {
    pub fn get(&self, polarity: Polarity) -> &PkaMap {
        match polarity {
            Polarity::Acid => &self.acid,
            Polarity::Base => &self.base,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.acid.is_empty()
    }
}
