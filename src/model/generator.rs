use crate::model::layers::{leaky_stack, stack_output, LeakyDense};
use crate::model::SpectralGenerator;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

/// Configuration for the conditional spectrum generator.
#[derive(Config, Debug)]
pub struct GeneratorConfig {
    pub bands_count: usize,
    pub classes_count: usize,
    pub generator_dim: usize,
    #[config(default = 2)]
    pub hidden_layers: usize,
    #[config(default = 0.2)]
    pub leaky_slope: f64,
}

/// Perceptron mapping noise plus a one-hot label to a spectrum in (0, 1).
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    hidden: Vec<LeakyDense<B>>,
    output: Linear<B>,
}

impl GeneratorConfig {
    /// Width of the conditioned noise the generator expects.
    pub fn input_dim(&self) -> usize {
        self.bands_count + self.classes_count
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let hidden = leaky_stack(
            self.input_dim(),
            self.generator_dim,
            self.hidden_layers,
            self.leaky_slope,
            device,
        );
        let d_hidden = stack_output(self.input_dim(), self.generator_dim, self.hidden_layers);
        let output = LinearConfig::new(d_hidden, self.bands_count).init(device);
        Generator { hidden, output }
    }
}

impl<B: Backend> Generator<B> {
    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(noise, |x, layer| layer.forward(x));
        sigmoid(self.output.forward(x))
    }
}

impl<B: Backend> SpectralGenerator<B> for Generator<B> {
    fn generate(&self, noise: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(noise)
    }
}
