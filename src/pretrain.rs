use crate::data::SpectralBatch;
use crate::model::SpectralClassifier;
use anyhow::Result;
use burn::data::dataloader::DataLoader;
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use log::info;

/// Fit the auxiliary classifier on real spectra before GAN training.
///
/// Returns the trained classifier and the mean criterion value of the last epoch.
pub fn pretrain_classifier<B, C, O>(
    mut classifier: C,
    optimizer: &mut O,
    loader: &dyn DataLoader<B, SpectralBatch<B>>,
    epochs: usize,
    learning_rate: f64,
) -> Result<(C, f64)>
where
    B: AutodiffBackend,
    C: AutodiffModule<B> + SpectralClassifier<B>,
    O: Optimizer<C, B>,
{
    let mut last_loss = f64::NAN;

    for epoch in 0..epochs {
        let mut total = 0.0;
        let mut batches = 0usize;

        for SpectralBatch { samples, labels } in loader.iter() {
            let logits = classifier.classify(samples);
            let loss = classifier.criterion(logits, labels).mean();
            total += loss.clone().into_scalar().elem::<f64>();
            batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &classifier);
            classifier = optimizer.step(learning_rate, classifier, grads);
        }

        if batches == 0 {
            return Err(anyhow::anyhow!("classifier loader yielded no batches"));
        }
        last_loss = total / batches as f64;
        info!("[classifier epoch {epoch}] [loss: {last_loss:.5}]");
    }

    Ok((classifier, last_loss))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::build_loader;
    use crate::model::ClassifierConfig;
    use crate::test_utils::{device, toy_dataset, TestBackend};
    use burn::optim::AdamConfig;

    #[test]
    fn pretraining_reduces_loss() {
        let device = device();
        let loader = build_loader::<TestBackend>(toy_dataset(60, 5, 3, 11), 10, 11, &device);
        let classifier = ClassifierConfig::new(5, 3, 16).init::<TestBackend>(&device);
        let mut optimizer = AdamConfig::new().init();

        let (classifier, first) =
            pretrain_classifier(classifier, &mut optimizer, loader.as_ref(), 1, 1e-2).unwrap();
        let (_, last) =
            pretrain_classifier(classifier, &mut optimizer, loader.as_ref(), 30, 1e-2).unwrap();

        assert!(last < first, "loss went from {first} to {last}");
    }

    #[test]
    fn empty_loader_is_an_error() {
        let device = device();
        let loader = build_loader::<TestBackend>(toy_dataset(0, 5, 3, 1), 4, 1, &device);
        let classifier = ClassifierConfig::new(5, 3, 4).init::<TestBackend>(&device);
        let mut optimizer = AdamConfig::new().init();

        assert!(pretrain_classifier(classifier, &mut optimizer, loader.as_ref(), 1, 1e-3).is_err());
    }
}
