use crate::model::layers::{leaky_stack, linear_input_gradient, stack_output, LeakyDense};
use crate::model::SpectralCritic;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// Configuration for the spectral critic.
#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    pub bands_count: usize,
    pub discriminator_dim: usize,
    #[config(default = 2)]
    pub hidden_layers: usize,
    #[config(default = 0.2)]
    pub leaky_slope: f64,
}

/// Perceptron critic with an unbounded scalar head (no sigmoid, WGAN style).
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    hidden: Vec<LeakyDense<B>>,
    head: Linear<B>,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let hidden = leaky_stack(
            self.bands_count,
            self.discriminator_dim,
            self.hidden_layers,
            self.leaky_slope,
            device,
        );
        let d_hidden = stack_output(self.bands_count, self.discriminator_dim, self.hidden_layers);
        let head = LinearConfig::new(d_hidden, 1).init(device);
        Discriminator { hidden, head }
    }
}

impl<B: Backend> Discriminator<B> {
    pub fn forward(&self, samples: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(samples, |x, layer| layer.forward(x));
        self.head.forward(x)
    }
}

impl<B: Backend> SpectralCritic<B> for Discriminator<B> {
    fn criticize(&self, samples: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(samples)
    }

    fn criticize_with_input_gradient(&self, samples: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch_size, _] = samples.dims();
        let device = samples.device();

        let mut x = samples;
        let mut pre_activations = Vec::with_capacity(self.hidden.len());
        for layer in &self.hidden {
            let (activation, pre) = layer.forward_traced(x);
            pre_activations.push(pre);
            x = activation;
        }
        let scores = self.head.forward(x);

        // Each score depends only on its own row, so seeding with ones yields
        // per-sample gradients.
        let seed = Tensor::<B, 2>::ones([batch_size, 1], &device);
        let mut gradient = linear_input_gradient(&self.head, seed);
        for (layer, pre) in self.hidden.iter().zip(pre_activations).rev() {
            gradient = layer.input_gradient(gradient, pre);
        }

        (scores, gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{device, TestBackend};
    use burn::tensor::Distribution;

    #[test]
    fn input_gradient_matches_autodiff() {
        let device = device();
        let critic = DiscriminatorConfig::new(5, 7)
            .with_hidden_layers(3)
            .init::<TestBackend>(&device);
        let samples =
            Tensor::<TestBackend, 2>::random([4, 5], Distribution::Uniform(-1.0, 1.0), &device)
                .require_grad();

        let (scores, analytic) = critic.criticize_with_input_gradient(samples.clone());
        let grads = scores.sum().backward();
        let autodiff = samples.grad(&grads).unwrap();

        let analytic = analytic.into_data().to_vec::<f32>().unwrap();
        let autodiff = autodiff.into_data().to_vec::<f32>().unwrap();
        assert_eq!(analytic.len(), 20);
        for (a, b) in analytic.iter().zip(autodiff.iter()) {
            assert!((a - b).abs() < 1e-4, "analytic {a} vs autodiff {b}");
        }
    }

    #[test]
    fn scores_match_forward() {
        let device = device();
        let critic = DiscriminatorConfig::new(3, 4).init::<TestBackend>(&device);
        let samples =
            Tensor::<TestBackend, 2>::random([2, 3], Distribution::Uniform(0.0, 1.0), &device);

        let direct = critic.criticize(samples.clone());
        let (traced, gradient) = critic.criticize_with_input_gradient(samples);

        assert_eq!(traced.dims(), [2, 1]);
        assert_eq!(gradient.dims(), [2, 3]);
        let direct = direct.into_data().to_vec::<f32>().unwrap();
        let traced = traced.into_data().to_vec::<f32>().unwrap();
        for (a, b) in direct.iter().zip(traced.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
