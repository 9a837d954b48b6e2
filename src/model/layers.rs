use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::leaky_relu;

/// Fully connected layer followed by a leaky ReLU.
#[derive(Module, Debug)]
pub struct LeakyDense<B: Backend> {
    linear: Linear<B>,
    #[module(ignore)]
    slope: f64,
}

impl<B: Backend> LeakyDense<B> {
    /// Create the layer with a `[d_input, d_output]` weight.
    pub fn new(d_input: usize, d_output: usize, slope: f64, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(d_input, d_output).init(device),
            slope,
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        leaky_relu(self.linear.forward(x), self.slope)
    }

    /// Forward pass that also returns the pre-activation, needed to walk the
    /// layer backwards in [`LeakyDense::input_gradient`].
    pub fn forward_traced(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let pre = self.linear.forward(x);
        (leaky_relu(pre.clone(), self.slope), pre)
    }

    /// Propagate `upstream` (d out / d activation, `[batch, d_output]`) to the
    /// layer input. Built from regular tensor ops, so the result stays
    /// differentiable with respect to the layer weight.
    pub fn input_gradient(&self, upstream: Tensor<B, 2>, pre: Tensor<B, 2>) -> Tensor<B, 2> {
        let slope = pre
            .greater_elem(0.0)
            .float()
            .mul_scalar(1.0 - self.slope)
            .add_scalar(self.slope);
        upstream
            .mul(slope)
            .matmul(self.linear.weight.val().transpose())
    }
}

/// Propagate `upstream` through a plain linear layer to its input.
pub fn linear_input_gradient<B: Backend>(
    linear: &Linear<B>,
    upstream: Tensor<B, 2>,
) -> Tensor<B, 2> {
    upstream.matmul(linear.weight.val().transpose())
}

/// Build `layers` leaky dense blocks of width `hidden`, starting from `d_input`.
pub fn leaky_stack<B: Backend>(
    d_input: usize,
    hidden: usize,
    layers: usize,
    slope: f64,
    device: &B::Device,
) -> Vec<LeakyDense<B>> {
    (0..layers)
        .map(|idx| {
            let d_in = if idx == 0 { d_input } else { hidden };
            LeakyDense::new(d_in, hidden, slope, device)
        })
        .collect()
}

/// Output width of a stack built by [`leaky_stack`].
pub fn stack_output(d_input: usize, hidden: usize, layers: usize) -> usize {
    if layers == 0 {
        d_input
    } else {
        hidden
    }
}
