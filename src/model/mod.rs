pub mod classifier;
pub mod discriminator;
pub mod generator;
pub mod layers;

use burn::prelude::*;

pub use classifier::{Classifier, ClassifierConfig};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig};

/// Maps conditioned noise (`[batch, bands + classes]`) to spectra (`[batch, bands]`).
pub trait SpectralGenerator<B: Backend> {
    fn generate(&self, noise: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Wasserstein critic scoring spectra.
pub trait SpectralCritic<B: Backend> {
    /// Critic score per sample, `[batch, 1]`.
    fn criticize(&self, samples: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Critic score together with d score / d samples (`[batch, bands]`).
    ///
    /// The gradient must be composed of differentiable tensor ops over the
    /// critic parameters: the gradient penalty backpropagates through it.
    fn criticize_with_input_gradient(&self, samples: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>);
}

/// Auxiliary classifier providing the class-conditioning signal.
pub trait SpectralClassifier<B: Backend> {
    /// Class logits, `[batch, classes]`.
    fn classify(&self, samples: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Per-batch loss of `logits` against integer `labels`.
    fn criterion(&self, logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1>;
}

/// Sizes of the reference generator, discriminator and classifier.
#[derive(Config, Debug)]
pub struct ModelConfig {
    pub bands_count: usize,
    pub classes_count: usize,
    pub generator_dim: usize,
    pub discriminator_dim: usize,
    pub classifier_dim: usize,
    #[config(default = 2)]
    pub hidden_layers: usize,
    #[config(default = 0.2)]
    pub leaky_slope: f64,
}

impl ModelConfig {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::new(self.bands_count, self.classes_count, self.generator_dim)
            .with_hidden_layers(self.hidden_layers)
            .with_leaky_slope(self.leaky_slope)
    }

    pub fn discriminator_config(&self) -> DiscriminatorConfig {
        DiscriminatorConfig::new(self.bands_count, self.discriminator_dim)
            .with_hidden_layers(self.hidden_layers)
            .with_leaky_slope(self.leaky_slope)
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.bands_count, self.classes_count, self.classifier_dim)
            .with_hidden_layers(self.hidden_layers)
            .with_leaky_slope(self.leaky_slope)
    }

    pub fn init_generator<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        self.generator_config().init(device)
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        self.discriminator_config().init(device)
    }

    pub fn init_classifier<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        self.classifier_config().init(device)
    }
}
