use crate::data::SpectralSample;
use crate::model::SpectralGenerator;
use crate::noise::NoiseLabelSampler;
use anyhow::{Context, Result};
use burn::prelude::*;
use burn::tensor::TensorData;

/// Generate `samples_per_class` labeled spectra for every class.
pub fn synthesize<B: Backend, G: SpectralGenerator<B>>(
    generator: &G,
    sampler: &NoiseLabelSampler,
    samples_per_class: usize,
    device: &B::Device,
) -> Result<Vec<SpectralSample>> {
    let classes_count = sampler.classes_count();
    let labels: Vec<i64> = (0..classes_count as i64)
        .flat_map(|label| std::iter::repeat(label).take(samples_per_class))
        .collect();
    if labels.is_empty() {
        return Ok(Vec::new());
    }

    let ids =
        Tensor::<B, 1, Int>::from_data(TensorData::new(labels.clone(), [labels.len()]), device);
    let spectra = generator.generate(sampler.sample(ids));
    let [_, bands_count] = spectra.dims();
    let values = spectra
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .context("failed to read generated spectra")?;

    Ok(values
        .chunks(bands_count)
        .zip(labels)
        .map(|(spectrum, label)| SpectralSample {
            spectrum: spectrum.to_vec(),
            label: label as usize,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeneratorConfig;
    use crate::test_utils::{device, TestBackend};

    #[test]
    fn synthesizes_balanced_classes() {
        let device = device();
        let generator = GeneratorConfig::new(5, 3, 8).init::<TestBackend>(&device);
        let sampler = NoiseLabelSampler::new(5, 3);

        let samples = synthesize(&generator, &sampler, 4, &device).unwrap();

        assert_eq!(samples.len(), 12);
        assert!(samples.iter().all(|sample| sample.spectrum.len() == 5));
        for class in 0..3 {
            assert_eq!(samples.iter().filter(|s| s.label == class).count(), 4);
        }
    }

    #[test]
    fn zero_samples_is_empty() {
        let device = device();
        let generator = GeneratorConfig::new(5, 3, 8).init::<TestBackend>(&device);
        let sampler = NoiseLabelSampler::new(5, 3);
        assert!(synthesize(&generator, &sampler, 0, &device).unwrap().is_empty());
    }
}
