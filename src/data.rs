use anyhow::{Context, Result};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

/// One labeled pixel spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralSample {
    pub spectrum: Vec<f32>,
    pub label: usize,
}

/// Labeled spectra stored as a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralCorpus {
    pub bands_count: usize,
    pub classes_count: usize,
    pub samples: Vec<SpectralSample>,
}

impl SpectralCorpus {
    /// Load and validate a corpus from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let corpus: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to decode corpus {}", path.display()))?;
        corpus.validate()?;
        Ok(corpus)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("failed to write corpus {}", path.display()))?;
        Ok(())
    }

    /// Check every spectrum has `bands_count` values and every label is in range.
    pub fn validate(&self) -> Result<()> {
        for (idx, sample) in self.samples.iter().enumerate() {
            if sample.spectrum.len() != self.bands_count {
                return Err(anyhow::anyhow!(
                    "sample {idx} has {} bands, expected {}",
                    sample.spectrum.len(),
                    self.bands_count
                ));
            }
            if sample.label >= self.classes_count {
                return Err(anyhow::anyhow!(
                    "sample {idx} has label {}, expected fewer than {} classes",
                    sample.label,
                    self.classes_count
                ));
            }
        }
        Ok(())
    }

    pub fn into_dataset(self) -> SpectralDataset {
        SpectralDataset::new(self.samples)
    }
}

/// In-memory dataset of labeled spectra.
#[derive(Clone, Debug)]
pub struct SpectralDataset {
    samples: Vec<Arc<SpectralSample>>,
}

impl SpectralDataset {
    pub fn new(samples: Vec<SpectralSample>) -> Self {
        Self {
            samples: samples.into_iter().map(Arc::new).collect(),
        }
    }

    /// Number of samples per class, indexed by label.
    pub fn class_counts(&self, classes_count: usize) -> Vec<usize> {
        let mut counts = vec![0; classes_count];
        for sample in &self.samples {
            if let Some(count) = counts.get_mut(sample.label) {
                *count += 1;
            }
        }
        counts
    }
}

impl Dataset<Arc<SpectralSample>> for SpectralDataset {
    fn get(&self, index: usize) -> Option<Arc<SpectralSample>> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of spectra (`[batch, bands]`) and their labels (`[batch]`).
#[derive(Clone, Debug)]
pub struct SpectralBatch<B: Backend> {
    pub samples: Tensor<B, 2>,
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug, Default)]
pub struct SpectralBatcher;

impl<B: Backend> Batcher<B, Arc<SpectralSample>, SpectralBatch<B>> for SpectralBatcher {
    fn batch(&self, items: Vec<Arc<SpectralSample>>, device: &B::Device) -> SpectralBatch<B> {
        let batch_size = items.len();
        let bands_count = items.first().map(|item| item.spectrum.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(batch_size * bands_count);
        let mut labels = Vec::with_capacity(batch_size);

        for item in &items {
            values.extend_from_slice(&item.spectrum);
            labels.push(item.label as i64);
        }

        let samples = Tensor::<B, 2>::from_data(
            TensorData::new(values, [batch_size, bands_count]),
            device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

        SpectralBatch { samples, labels }
    }
}

/// Shuffling loader over `dataset`; the last batch of an epoch may be smaller.
pub fn build_loader<B: Backend>(
    dataset: SpectralDataset,
    batch_size: usize,
    seed: u64,
    device: &B::Device,
) -> Arc<dyn DataLoader<B, SpectralBatch<B>>> {
    DataLoaderBuilder::<B, Arc<SpectralSample>, SpectralBatch<B>>::new(SpectralBatcher)
        .batch_size(batch_size)
        .shuffle(seed)
        .set_device(device.clone())
        .build(dataset)
}
