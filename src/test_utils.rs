use crate::data::{SpectralDataset, SpectralSample};
use burn::backend::{Autodiff, NdArray};
use burn::module::{ModuleVisitor, Param};
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type TestBackend = Autodiff<NdArray>;

pub fn device() -> <TestBackend as Backend>::Device {
    Default::default()
}

pub fn labels<B: Backend>(values: &[i64], device: &B::Device) -> Tensor<B, 1, Int> {
    Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), device)
}

struct ParamCollector {
    values: Vec<f32>,
}

impl<B: Backend> ModuleVisitor<B> for ParamCollector {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        let values = param.val().into_data().convert::<f32>().to_vec::<f32>().unwrap();
        self.values.extend(values);
    }
}

/// Every float parameter of `module`, flattened in visiting order.
pub fn parameter_values<B: Backend, M: Module<B>>(module: &M) -> Vec<f32> {
    let mut collector = ParamCollector { values: Vec::new() };
    module.visit(&mut collector);
    collector.values
}

/// Classes separated by their mean reflectance, so a classifier can learn them.
pub fn toy_dataset(samples: usize, bands: usize, classes: usize, seed: u64) -> SpectralDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = (0..samples)
        .map(|idx| {
            let label = idx % classes;
            let level = (label + 1) as f32 / (classes + 1) as f32;
            let spectrum = (0..bands)
                .map(|_| level + rng.random_range(-0.05..0.05))
                .collect();
            SpectralSample { spectrum, label }
        })
        .collect();
    SpectralDataset::new(samples)
}
