use crate::model::SpectralCritic;
use burn::prelude::*;
use burn::tensor::Distribution;

/// WGAN-GP gradient penalty: `lambda_gp * mean((||d critic / d x_hat||_2 - 1)^2)`
/// over random interpolates `x_hat = alpha * real + (1 - alpha) * fake`,
/// with one `alpha ~ U(0, 1)` per sample.
///
/// The result stays attached to the critic parameters, so it can be added to
/// the critic loss before the backward pass. A vanishing input gradient makes
/// the norm's derivative undefined and the penalty NaN.
pub fn gradient_penalty<B: Backend, D: SpectralCritic<B>>(
    critic: &D,
    real_samples: Tensor<B, 2>,
    fake_samples: Tensor<B, 2>,
    lambda_gp: f64,
) -> Tensor<B, 1> {
    let [batch_size, _] = real_samples.dims();
    let alpha = Tensor::<B, 2>::random(
        [batch_size, 1],
        Distribution::Uniform(0.0, 1.0),
        &real_samples.device(),
    );
    let interpolates = real_samples
        .mul(alpha.clone())
        .add(fake_samples.mul(alpha.neg().add_scalar(1.0)));

    let (_, gradients) = critic.criticize_with_input_gradient(interpolates);
    penalty_from_gradients(gradients, lambda_gp)
}

/// Penalty term for already computed per-sample input gradients.
pub fn penalty_from_gradients<B: Backend>(gradients: Tensor<B, 2>, lambda_gp: f64) -> Tensor<B, 1> {
    gradients
        .square()
        .sum_dim(1)
        .sqrt()
        .sub_scalar(1.0)
        .square()
        .mean()
        .mul_scalar(lambda_gp)
}
