mod cache;
mod config;
mod error;
mod featurize;
mod ionization;
mod net;
mod normalize;
mod patterns;
mod predictor;
mod uncharge;

pub use cache::ModelCache;
pub use config::{
    DEFAULT_MODEL_DIR, DeviceKind, FragmentPolicy, ModelSource, NormalizeConfig, ParseDeviceError,
    PkaConfig,
};
pub use error::Error;
pub use featurize::{ATOM_FEATURES, BOND_FEATURES, FeatureTensor, Featurizer, featurize};
pub use ionization::{IonizationSite, detect, detect_sites};
pub use net::GcnModel;
pub use normalize::normalize;
pub use patterns::{
    IonizationPattern, PATTERN_TABLE_VERSION, PatternSet, PatternTable, default_patterns,
    load_patterns,
};
pub use predictor::{Predictor, predict, predict_smiles};
