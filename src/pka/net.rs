//! Inference-only graph convolutional network.
//!
//! Architecture: a stack of GCN layers `H' = Â H W + b`, each followed by
//! ReLU and an optional eval-mode batch norm, global sum pooling over atoms
//! and a chain of dense layers ending in one scalar. Layer sizes come from
//! the weight file.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::Linear;
use tracing::info;

use super::error::Error;
use super::featurize::{ATOM_FEATURES, FeatureTensor};
use crate::model::types::Polarity;

const BATCH_NORM_EPS: f64 = 1e-5;

#[derive(Debug, Clone)]
struct GraphConv {
    /// `in × out`.
    weight: Tensor,
    bias: Option<Tensor>,
    norm: Option<BatchNorm>,
}

/// Eval-mode batch norm folded into a per-channel affine map.
#[derive(Debug, Clone)]
struct BatchNorm {
    scale: Tensor,
    shift: Tensor,
}

impl BatchNorm {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        x.broadcast_mul(&self.scale)?.broadcast_add(&self.shift)
    }
}

/// A loaded pKa regression network.
#[derive(Debug, Clone)]
pub struct GcnModel {
    convs: Vec<GraphConv>,
    dense: Vec<Linear>,
    widths: Vec<usize>,
    device: Device,
}

impl GcnModel {
    /// Reads `path` (safetensors, or a PyTorch state dict otherwise).
    pub fn load(path: &Path, polarity: Polarity, device: &Device) -> Result<Self, Error> {
        let fail = |detail: String| Error::model_load(polarity, path, detail);
        if !path.is_file() {
            return Err(fail("weight file not found".to_string()));
        }

        let tensors = read_weights(path).map_err(|e| fail(e.to_string()))?;
        let model = Self::from_tensors(tensors, device).map_err(|e| fail(e.to_string()))?;

        info!(
            %polarity,
            path = %path.display(),
            layers = %model.describe(),
            "loaded model"
        );
        Ok(model)
    }

    /// Assembles a model from named parameters.
    ///
    /// Convolutions are `conv{i}.lin.weight` (`out × in`) or `conv{i}.weight`
    /// (`in × out`) with an optional `conv{i}.bias`; batch norms are
    /// `bn{i}.{weight,bias,running_mean,running_var}`; dense layers are
    /// `fc{j}.weight`/`fc{j}.bias`. Layers run in ascending index order and a
    /// leading `module.` prefix is ignored. Any parameter left over once the
    /// layers are assembled is an error.
    pub fn from_tensors(
        tensors: HashMap<String, Tensor>,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let mut params = HashMap::with_capacity(tensors.len());
        for (name, tensor) in tensors {
            let name = name.strip_prefix("module.").map(str::to_string).unwrap_or(name);
            let tensor = tensor.to_dtype(DType::F32)?.to_device(device)?;
            params.insert(name, tensor);
        }

        let conv_ids = layer_indices(&params, "conv");
        let fc_ids = layer_indices(&params, "fc");
        if conv_ids.is_empty() {
            candle_core::bail!("no graph convolution layers (conv*) in weight file");
        }
        if fc_ids.is_empty() {
            candle_core::bail!("no dense layers (fc*) in weight file");
        }

        let mut widths = vec![ATOM_FEATURES];
        let mut convs = Vec::with_capacity(conv_ids.len());
        for i in conv_ids {
            let width = *widths.last().unwrap_or(&ATOM_FEATURES);
            let conv = conv_layer(&mut params, i, width)?;
            widths.push(conv.weight.dim(1)?);
            convs.push(conv);
        }

        let mut dense = Vec::with_capacity(fc_ids.len());
        for j in fc_ids {
            let width = *widths.last().unwrap_or(&ATOM_FEATURES);
            let Some(weight) = params.remove(&format!("fc{j}.weight")) else {
                candle_core::bail!("fc{j}.bias has no matching fc{j}.weight");
            };
            let (out, inp) = weight.dims2()?;
            if inp != width {
                candle_core::bail!("fc{j} expects {inp} inputs but receives {width}");
            }
            let bias = take_vector(&mut params, &format!("fc{j}.bias"), out)?;
            widths.push(out);
            dense.push(Linear::new(weight, bias));
        }

        if widths.last() != Some(&1) {
            candle_core::bail!(
                "last dense layer has {} outputs, expected 1",
                widths.last().copied().unwrap_or(0)
            );
        }
        if !params.is_empty() {
            let mut unused: Vec<&str> = params.keys().map(String::as_str).collect();
            unused.sort_unstable();
            candle_core::bail!("unrecognized parameters: {}", unused.join(", "));
        }

        Ok(Self {
            convs,
            dense,
            widths,
            device: device.clone(),
        })
    }

    /// Layer widths from input to output, e.g. `38-64-64-32-1`.
    pub fn describe(&self) -> String {
        let widths: Vec<String> = self.widths.iter().map(usize::to_string).collect();
        widths.join("-")
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Predicts one pKa value for the candidate encoded in `features`.
    pub fn forward(&self, features: &FeatureTensor) -> Result<f64, Error> {
        let n = features.num_atoms();
        let x = Tensor::from_slice(features.atom_features(), (n, ATOM_FEATURES), &self.device)?;
        let adjacency = Tensor::from_vec(normalized_adjacency(features), (n, n), &self.device)?;

        let mut h = x;
        for conv in &self.convs {
            h = adjacency.matmul(&h.matmul(&conv.weight)?)?;
            if let Some(bias) = &conv.bias {
                h = h.broadcast_add(bias)?;
            }
            h = h.relu()?;
            if let Some(norm) = &conv.norm {
                h = norm.forward(&h)?;
            }
        }

        let mut z = h.sum_keepdim(0)?;
        let last = self.dense.len() - 1;
        for (k, layer) in self.dense.iter().enumerate() {
            z = layer.forward(&z)?;
            if k < last {
                z = z.relu()?;
            }
        }

        let value = z.flatten_all()?.to_vec1::<f32>()?;
        value
            .first()
            .map(|&v| f64::from(v))
            .ok_or_else(|| Error::Inference("network produced no output".to_string()))
    }
}

fn read_weights(path: &Path) -> candle_core::Result<HashMap<String, Tensor>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("safetensors") => candle_core::safetensors::load(path, &Device::Cpu),
        _ => Ok(candle_core::pickle::read_all(path)?.into_iter().collect()),
    }
}

fn layer_indices(params: &HashMap<String, Tensor>, prefix: &str) -> Vec<usize> {
    let mut ids: Vec<usize> = params
        .keys()
        .filter_map(|name| {
            let (id, _) = name.strip_prefix(prefix)?.split_once('.')?;
            id.parse().ok()
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn conv_layer(
    params: &mut HashMap<String, Tensor>,
    i: usize,
    width: usize,
) -> candle_core::Result<GraphConv> {
    let weight = if let Some(w) = params.remove(&format!("conv{i}.lin.weight")) {
        w.t()?.contiguous()?
    } else if let Some(w) = params.remove(&format!("conv{i}.weight")) {
        w
    } else {
        candle_core::bail!("conv{i} has no weight (conv{i}.lin.weight or conv{i}.weight)");
    };

    let (inp, out) = weight.dims2()?;
    if inp != width {
        candle_core::bail!("conv{i} expects {inp} inputs but receives {width}");
    }
    let bias = match take_vector(params, &format!("conv{i}.bias"), out)? {
        Some(b) => Some(b),
        None => take_vector(params, &format!("conv{i}.lin.bias"), out)?,
    };

    let norm = match take_vector(params, &format!("bn{i}.weight"), out)? {
        Some(gamma) => {
            let beta = require_vector(params, &format!("bn{i}.bias"), out)?;
            let mean = require_vector(params, &format!("bn{i}.running_mean"), out)?;
            let var = require_vector(params, &format!("bn{i}.running_var"), out)?;
            let scale = gamma.div(&(var + BATCH_NORM_EPS)?.sqrt()?)?;
            let shift = beta.sub(&mean.mul(&scale)?)?;
            Some(BatchNorm { scale, shift })
        }
        None => None,
    };

    Ok(GraphConv { weight, bias, norm })
}

fn take_vector(
    params: &mut HashMap<String, Tensor>,
    name: &str,
    len: usize,
) -> candle_core::Result<Option<Tensor>> {
    match params.remove(name) {
        Some(t) => {
            let found = t.dims1()?;
            if found != len {
                candle_core::bail!("{name} has {found} entries, expected {len}");
            }
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

fn require_vector(
    params: &mut HashMap<String, Tensor>,
    name: &str,
    len: usize,
) -> candle_core::Result<Tensor> {
    match take_vector(params, name, len)? {
        Some(t) => Ok(t),
        None => candle_core::bail!("missing {name}"),
    }
}

/// `D^-1/2 (A + I) D^-1/2` as a row-major `n × n` matrix.
fn normalized_adjacency(features: &FeatureTensor) -> Vec<f32> {
    let n = features.num_atoms();
    let mut a = vec![0.0f32; n * n];
    for i in 0..n {
        a[i * n + i] = 1.0;
    }
    for &(s, t) in features.edge_index() {
        a[s * n + t] = 1.0;
    }

    let inv_sqrt: Vec<f32> = a
        .chunks_exact(n)
        .map(|row| 1.0 / row.iter().sum::<f32>().sqrt())
        .collect();
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] *= inv_sqrt[i] * inv_sqrt[j];
        }
    }
    a
}

/// Zero convolution and a summing output layer: every prediction equals
/// `out_bias`.
#[cfg(test)]
pub(crate) fn synthetic_params(hidden: usize, out_bias: f32) -> HashMap<String, Tensor> {
    let device = Device::Cpu;
    let zeros = |shape: (usize, usize)| Tensor::zeros(shape, DType::F32, &device);
    let params = [
        ("conv0.lin.weight", zeros((hidden, ATOM_FEATURES))),
        ("conv0.bias", Tensor::zeros(hidden, DType::F32, &device)),
        ("fc0.weight", Tensor::ones((1, hidden), DType::F32, &device)),
        ("fc0.bias", Tensor::new(&[out_bias], &device)),
    ];
    params
        .into_iter()
        .map(|(name, t)| (name.to_string(), t.expect("synthetic tensor")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;
    use crate::pka::featurize::featurize;

    fn make_features() -> FeatureTensor {
        let mol = io::read_smiles("CC(=O)O").unwrap().add_hydrogens();
        featurize(&mol, 3).unwrap()
    }

    #[test]
    fn zero_weights_yield_the_output_bias() {
        let model = GcnModel::from_tensors(synthetic_params(8, 4.5), &Device::Cpu).unwrap();
        assert_eq!(model.describe(), "38-8-1");
        let value = model.forward(&make_features()).unwrap();
        assert!((value - 4.5).abs() < 1e-6);
    }

    #[test]
    fn random_weights_give_finite_deterministic_output() {
        let device = Device::Cpu;
        let mut params = HashMap::new();
        params.insert(
            "conv1.weight".to_string(),
            Tensor::rand(-0.1f32, 0.1, (ATOM_FEATURES, 16), &device).unwrap(),
        );
        params.insert(
            "conv2.weight".to_string(),
            Tensor::rand(-0.1f32, 0.1, (16, 8), &device).unwrap(),
        );
        params.insert(
            "bn2.weight".to_string(),
            Tensor::ones(8, DType::F32, &device).unwrap(),
        );
        params.insert(
            "bn2.bias".to_string(),
            Tensor::zeros(8, DType::F32, &device).unwrap(),
        );
        params.insert(
            "bn2.running_mean".to_string(),
            Tensor::zeros(8, DType::F32, &device).unwrap(),
        );
        params.insert(
            "bn2.running_var".to_string(),
            Tensor::ones(8, DType::F32, &device).unwrap(),
        );
        params.insert(
            "fc1.weight".to_string(),
            Tensor::rand(-0.1f32, 0.1, (4, 8), &device).unwrap(),
        );
        params.insert(
            "fc2.weight".to_string(),
            Tensor::rand(-0.1f32, 0.1, (1, 4), &device).unwrap(),
        );

        let model = GcnModel::from_tensors(params, &device).unwrap();
        assert_eq!(model.describe(), "38-16-8-4-1");
        let features = make_features();
        let a = model.forward(&features).unwrap();
        let b = model.forward(&features).unwrap();
        assert!(a.is_finite());
        assert_eq!(a, b);
    }

    #[test]
    fn data_parallel_prefix_is_ignored() {
        let params = synthetic_params(4, 1.0)
            .into_iter()
            .map(|(name, t)| (format!("module.{name}"), t))
            .collect();
        assert!(GcnModel::from_tensors(params, &Device::Cpu).is_ok());
    }

    #[test]
    fn incompatible_shapes_are_rejected() {
        let device = Device::Cpu;

        let mut wrong_input = synthetic_params(4, 0.0);
        wrong_input.insert(
            "conv0.lin.weight".to_string(),
            Tensor::zeros((4, ATOM_FEATURES - 1), DType::F32, &device).unwrap(),
        );
        assert!(GcnModel::from_tensors(wrong_input, &device).is_err());

        let mut wrong_output = synthetic_params(4, 0.0);
        wrong_output.insert(
            "fc0.weight".to_string(),
            Tensor::zeros((2, 4), DType::F32, &device).unwrap(),
        );
        wrong_output.remove("fc0.bias");
        assert!(GcnModel::from_tensors(wrong_output, &device).is_err());

        let mut no_dense = synthetic_params(4, 0.0);
        no_dense.retain(|name, _| !name.starts_with("fc"));
        assert!(GcnModel::from_tensors(no_dense, &device).is_err());
    }

    #[test]
    fn unconsumed_parameters_are_rejected() {
        let device = Device::Cpu;
        let vector = |len: usize| Tensor::zeros(len, DType::F32, &device).unwrap();

        let mut params = synthetic_params(4, 0.0);
        params.insert("conv0.lin.bias".to_string(), vector(4));
        params.insert("bn9.weight".to_string(), vector(4));
        params.insert(
            "lin_out.weight".to_string(),
            Tensor::zeros((1, 4), DType::F32, &device).unwrap(),
        );

        let err = GcnModel::from_tensors(params, &device)
            .unwrap_err()
            .to_string();
        assert!(
            err.contains("bn9.weight, conv0.lin.bias, lin_out.weight"),
            "{err}"
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weight_base.safetensors");
        let mut trailing_norm = synthetic_params(4, 0.0);
        trailing_norm.insert("fc0.running_mean".to_string(), vector(1));
        candle_core::safetensors::save(&trailing_norm, &path).unwrap();
        let err = GcnModel::load(&path, Polarity::Base, &device).unwrap_err();
        assert!(matches!(
            err,
            Error::ModelLoad { polarity: Polarity::Base, .. }
        ));
    }

    #[test]
    fn load_reads_safetensors_and_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weight_acid.safetensors");
        candle_core::safetensors::save(&synthetic_params(4, 2.0), &path).unwrap();

        let model = GcnModel::load(&path, Polarity::Acid, &Device::Cpu).unwrap();
        let value = model.forward(&make_features()).unwrap();
        assert!((value - 2.0).abs() < 1e-6);

        let missing = dir.path().join("weight_base.safetensors");
        let err = GcnModel::load(&missing, Polarity::Base, &Device::Cpu).unwrap_err();
        assert!(matches!(
            err,
            Error::ModelLoad { polarity: Polarity::Base, .. }
        ));
    }

    #[test]
    fn corrupt_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weight_acid.safetensors");
        std::fs::write(&path, b"not a tensor file").unwrap();
        let err = GcnModel::load(&path, Polarity::Acid, &Device::Cpu).unwrap_err();
        assert!(matches!(err, Error::ModelLoad { .. }));
    }

    #[test]
    fn adjacency_rows_are_normalized() {
        let features = make_features();
        let n = features.num_atoms();
        let a = normalized_adjacency(&features);
        for i in 0..n {
            for j in 0..n {
                assert_eq!(a[i * n + j], a[j * n + i]);
            }
        }
        // Hydrogen 4 is bonded only to carbon 0 (four neighbors).
        let expected = 1.0 / (2.0f32 * 5.0).sqrt();
        assert!((a[4 * n] - expected).abs() < 1e-6);
    }
}
