use crate::model::layers::{leaky_stack, stack_output, LeakyDense};
use crate::model::SpectralClassifier;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// Configuration for the auxiliary spectral classifier.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub bands_count: usize,
    pub classes_count: usize,
    pub classifier_dim: usize,
    #[config(default = 2)]
    pub hidden_layers: usize,
    #[config(default = 0.2)]
    pub leaky_slope: f64,
}

/// Perceptron producing class logits, trained with cross entropy.
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    hidden: Vec<LeakyDense<B>>,
    logits: Linear<B>,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        let hidden = leaky_stack(
            self.bands_count,
            self.classifier_dim,
            self.hidden_layers,
            self.leaky_slope,
            device,
        );
        let d_hidden = stack_output(self.bands_count, self.classifier_dim, self.hidden_layers);
        let logits = LinearConfig::new(d_hidden, self.classes_count).init(device);
        Classifier { hidden, logits }
    }
}

impl<B: Backend> Classifier<B> {
    pub fn forward(&self, samples: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(samples, |x, layer| layer.forward(x));
        self.logits.forward(x)
    }
}

impl<B: Backend> SpectralClassifier<B> for Classifier<B> {
    fn classify(&self, samples: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(samples)
    }

    fn criterion(&self, logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{device, labels, TestBackend};

    #[test]
    fn criterion_is_positive_cross_entropy() {
        let device = device();
        let classifier = ClassifierConfig::new(4, 3, 6).init::<TestBackend>(&device);
        let samples = Tensor::<TestBackend, 2>::ones([2, 4], &device);

        let logits = classifier.classify(samples);
        assert_eq!(logits.dims(), [2, 3]);
        let loss = classifier
            .criterion(logits, labels(&[0, 2], &device))
            .into_scalar()
            .elem::<f64>();
        assert!(loss > 0.0);
    }
}
