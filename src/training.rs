use crate::checkpoint::{load_record, GeneratorCheckpointer};
use crate::data::{build_loader, SpectralBatch, SpectralCorpus};
use crate::gan::{GanConfig, GanTrainer, TrainingReport};
use crate::metrics::JsonlMetricSink;
use crate::model::{Classifier, ModelConfig};
use crate::pretrain::pretrain_classifier;
use anyhow::{Context, Result};
use burn::config::Config;
use burn::data::dataloader::DataLoader;
use burn::optim::AdamConfig;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use log::info;
use std::path::{Path, PathBuf};

/// Training configuration loaded from `config.json`.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    pub gan: GanConfig,
    /// Spectral corpus, relative to the experiment directory unless absolute.
    pub data_path: String,
    pub num_epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub optimizer_gen: AdamConfig,
    pub optimizer_disc: AdamConfig,
    /// Pre-trained classifier record; the classifier is fitted on the corpus when absent.
    pub classifier_path: Option<String>,
    #[config(default = 10)]
    pub classifier_epochs: usize,
    #[config(default = 1e-3)]
    pub classifier_learning_rate: f64,
}

/// Record name of the fitted classifier.
pub const CLASSIFIER_NAME: &str = "classifier_model";

/// Directory receiving checkpoints, metrics and the saved config.
pub fn artifacts_dir(experiment_dir: &Path) -> PathBuf {
    experiment_dir.join("artifacts")
}

/// Train the conditional WGAN-GP on the experiment's corpus.
pub fn train<B: AutodiffBackend>(
    experiment_dir: &Path,
    config: TrainingConfig,
    device: B::Device,
) -> Result<TrainingReport> {
    let artifacts = artifacts_dir(experiment_dir);
    std::fs::create_dir_all(&artifacts)
        .with_context(|| format!("failed to create {}", artifacts.display()))?;
    config.save(artifacts.join("config.json"))?;

    let data_path = resolve_path(experiment_dir, &config.data_path);
    let corpus = SpectralCorpus::load(&data_path)?;
    let model_config = &config.model;
    if corpus.bands_count != model_config.bands_count
        || corpus.classes_count != model_config.classes_count
    {
        return Err(anyhow::anyhow!(
            "corpus has {} bands and {} classes, model expects {} and {}",
            corpus.bands_count,
            corpus.classes_count,
            model_config.bands_count,
            model_config.classes_count
        ));
    }

    let dataset = corpus.into_dataset();
    info!(
        "samples per class -> {:?}",
        dataset.class_counts(model_config.classes_count)
    );

    B::seed(&device, config.seed);
    let loader = build_loader::<B>(dataset, config.batch_size, config.seed, &device);

    let classifier =
        prepare_classifier::<B>(experiment_dir, &artifacts, &config, loader.as_ref(), &device)?;
    let generator = model_config.init_generator::<B>(&device);
    let discriminator = model_config.init_discriminator::<B>(&device);
    info!(
        "parameters -> generator {}, discriminator {}, classifier {}",
        generator.num_params(),
        discriminator.num_params(),
        classifier.num_params()
    );

    let sink = JsonlMetricSink::open(&artifacts.join("metrics.jsonl"))?;
    let mut trainer = GanTrainer::new(
        generator,
        discriminator,
        classifier,
        config.optimizer_gen.init(),
        config.optimizer_disc.init(),
        config.gan.clone(),
    )
    .with_metric_sink(Box::new(sink));

    let report = trainer.train(
        loader.as_ref(),
        config.num_epochs,
        model_config.bands_count,
        config.batch_size,
        model_config.classes_count,
        &artifacts,
    )?;
    info!(
        "finished after {} epochs{}",
        report.epochs_completed,
        if report.stopped_early { " (early stop)" } else { "" }
    );
    Ok(report)
}

fn prepare_classifier<B: AutodiffBackend>(
    experiment_dir: &Path,
    artifacts: &Path,
    config: &TrainingConfig,
    loader: &dyn DataLoader<B, SpectralBatch<B>>,
    device: &B::Device,
) -> Result<Classifier<B>> {
    let classifier = config.model.init_classifier::<B>(device);
    if let Some(path) = &config.classifier_path {
        let path = resolve_path(experiment_dir, path);
        info!("loading classifier from {}", path.display());
        return load_record(classifier, &path, device);
    }

    info!("fitting classifier for {} epochs", config.classifier_epochs);
    let mut optimizer = AdamConfig::new().init();
    let (classifier, loss) = pretrain_classifier(
        classifier,
        &mut optimizer,
        loader,
        config.classifier_epochs,
        config.classifier_learning_rate,
    )?;
    let path = GeneratorCheckpointer::new(artifacts).save_as(&classifier, CLASSIFIER_NAME)?;
    info!("classifier loss {loss:.5}, saved to {}", path.display());
    Ok(classifier)
}

/// Resolve `path` relative to the experiment directory if needed.
pub fn resolve_path(experiment_dir: &Path, path: &str) -> PathBuf {
    let candidate = PathBuf::from(path);
    if candidate.is_relative() {
        experiment_dir.join(candidate)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SpectralSample;
    use crate::test_utils::{device, toy_dataset, TestBackend};
    use burn::data::dataset::Dataset;

    fn write_corpus(dir: &Path, bands: usize, classes: usize) {
        let dataset = toy_dataset(12, bands, classes, 21);
        let samples: Vec<SpectralSample> = (0..dataset.len())
            .filter_map(|idx| dataset.get(idx))
            .map(|sample| (*sample).clone())
            .collect();
        SpectralCorpus {
            bands_count: bands,
            classes_count: classes,
            samples,
        }
        .save(&dir.join("corpus.json"))
        .unwrap();
    }

    fn config(bands: usize, classes: usize) -> TrainingConfig {
        TrainingConfig::new(
            ModelConfig::new(bands, classes, 8, 8, 8),
            GanConfig::new().with_critic_iters(2),
            "corpus.json".to_string(),
            2,
            4,
            7,
            AdamConfig::new(),
            AdamConfig::new(),
        )
        .with_classifier_epochs(2)
    }

    #[test]
    fn experiment_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), 5, 2);

        let report = train::<TestBackend>(dir.path(), config(5, 2), device()).unwrap();

        assert_eq!(report.epochs_completed, 2);
        let artifacts = artifacts_dir(dir.path());
        assert!(artifacts.join("config.json").exists());
        assert!(artifacts.join("generator_model.mpk").exists());
        assert!(artifacts.join("classifier_model.mpk").exists());
        assert_eq!(
            std::fs::read_to_string(artifacts.join("metrics.jsonl"))
                .unwrap()
                .lines()
                .count(),
            2
        );
        assert!(TrainingConfig::load(artifacts.join("config.json")).is_ok());
    }

    #[test]
    fn experiment_reuses_saved_classifier() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), 5, 2);
        train::<TestBackend>(dir.path(), config(5, 2), device()).unwrap();

        let config = config(5, 2)
            .with_classifier_path(Some("artifacts/classifier_model.mpk".to_string()));
        assert!(train::<TestBackend>(dir.path(), config, device()).is_ok());
    }

    #[test]
    fn mismatched_corpus_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), 4, 2);
        assert!(train::<TestBackend>(dir.path(), config(5, 2), device()).is_err());
    }

    #[test]
    fn relative_paths_resolve_against_experiment() {
        let base = Path::new("/tmp/experiment");
        assert_eq!(resolve_path(base, "data.json"), base.join("data.json"));
        assert_eq!(resolve_path(base, "/data.json"), PathBuf::from("/data.json"));
    }
}
