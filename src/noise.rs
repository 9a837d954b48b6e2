use burn::prelude::*;
use burn::tensor::Distribution;

/// Draws generator inputs: Gaussian noise followed by a one-hot label block.
#[derive(Clone, Debug)]
pub struct NoiseLabelSampler {
    bands_count: usize,
    classes_count: usize,
    mean: f64,
    std: f64,
}

impl NoiseLabelSampler {
    /// Sampler drawing noise from Normal(0.5, 0.1).
    pub fn new(bands_count: usize, classes_count: usize) -> Self {
        Self {
            bands_count,
            classes_count,
            mean: 0.5,
            std: 0.1,
        }
    }

    pub fn with_distribution(mut self, mean: f64, std: f64) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn bands_count(&self) -> usize {
        self.bands_count
    }

    pub fn classes_count(&self) -> usize {
        self.classes_count
    }

    /// Width of a sampled row, `bands + classes`.
    pub fn width(&self) -> usize {
        self.bands_count + self.classes_count
    }

    /// Sample `[labels.len(), bands + classes]`. Every call draws new noise.
    pub fn sample<B: Backend>(&self, labels: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        let [batch_size] = labels.dims();
        let device = labels.device();
        let noise = Tensor::<B, 2>::random(
            [batch_size, self.bands_count],
            Distribution::Normal(self.mean, self.std),
            &device,
        );
        let one_hot = labels.one_hot::<2>(self.classes_count).float();
        Tensor::cat(vec![noise, one_hot], 1)
    }
}
