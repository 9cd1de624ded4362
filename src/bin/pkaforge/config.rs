use std::fs;

use anyhow::{Context, Result};

use pka_forge::io::Format;
use pka_forge::{DeviceKind, FragmentPolicy, ModelSource, NormalizeConfig, PkaConfig, Polarity};

use crate::cli::{InputFormat, ModelOptions, NormalizeOptions, PolarityFilter};

pub fn build_normalize_config(opts: &NormalizeOptions) -> NormalizeConfig {
    NormalizeConfig {
        uncharge: !opts.keep_charges,
        fragments: if opts.largest_fragment {
            FragmentPolicy::KeepLargest
        } else {
            FragmentPolicy::Reject
        },
    }
}

pub fn read_patterns(opts: &NormalizeOptions) -> Result<Option<String>> {
    opts.patterns
        .as_ref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read pattern table: {}", path.display()))
        })
        .transpose()
}

pub fn build_model_source(opts: &ModelOptions) -> ModelSource {
    opts.model_dir
        .as_ref()
        .map(ModelSource::new)
        .unwrap_or_default()
}

pub fn build_device(opts: &ModelOptions) -> Result<DeviceKind> {
    opts.device
        .parse::<DeviceKind>()
        .with_context(|| format!("Invalid --device value '{}'", opts.device))
}

pub fn build_predict_config(
    normalize: &NormalizeOptions,
    model: &ModelOptions,
) -> Result<PkaConfig> {
    Ok(PkaConfig {
        normalize: build_normalize_config(normalize),
        patterns: read_patterns(normalize)?,
        models: build_model_source(model),
        device: build_device(model)?,
    })
}

pub fn build_sites_config(normalize: &NormalizeOptions) -> Result<PkaConfig> {
    Ok(PkaConfig {
        normalize: build_normalize_config(normalize),
        patterns: read_patterns(normalize)?,
        ..Default::default()
    })
}

pub fn build_demo_config(model: &ModelOptions) -> Result<PkaConfig> {
    Ok(PkaConfig {
        models: build_model_source(model),
        device: build_device(model)?,
        ..Default::default()
    })
}

impl From<InputFormat> for Format {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Smiles => Format::Smiles,
            InputFormat::Sdf => Format::Sdf,
        }
    }
}

impl PolarityFilter {
    pub fn polarities(self) -> &'static [Polarity] {
        match self {
            PolarityFilter::Acid => &[Polarity::Acid],
            PolarityFilter::Base => &[Polarity::Base],
            PolarityFilter::Both => &Polarity::BOTH,
        }
    }
}
