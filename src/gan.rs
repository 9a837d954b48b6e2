use crate::checkpoint::GeneratorCheckpointer;
use crate::data::SpectralBatch;
use crate::early_stopping::{EarlyStopping, StoppingState};
use crate::freeze::Frozen;
use crate::metrics::{DiscriminatorLosses, GeneratorLosses, LossLedger, LossMetric, MetricSink};
use crate::model::{SpectralClassifier, SpectralCritic, SpectralGenerator};
use crate::noise::NoiseLabelSampler;
use crate::penalty::gradient_penalty;
use anyhow::{Context, Result};
use burn::data::dataloader::DataLoader;
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use log::{debug, info, warn};
use std::path::Path;

/// Hyperparameters of the WGAN-GP training core.
#[derive(Config, Debug)]
pub struct GanConfig {
    #[config(default = 10.0)]
    pub lambda_gp: f64,
    /// Discriminator steps per generator step.
    #[config(default = 5)]
    pub critic_iters: usize,
    /// Epochs without discriminator-loss improvement before stopping.
    pub patience: Option<usize>,
    #[config(default = true)]
    pub verbose: bool,
    #[config(default = 1e-4)]
    pub generator_learning_rate: f64,
    #[config(default = 1e-4)]
    pub discriminator_learning_rate: f64,
    /// Also keep the generator of the best early-stopping epoch.
    #[config(default = false)]
    pub keep_best_checkpoint: bool,
}

/// Record name of the best-epoch generator.
pub const BEST_GENERATOR_NAME: &str = "generator_model_best";

/// Step counts of one epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EpochStats {
    pub batches: usize,
    pub discriminator_steps: usize,
    pub generator_steps: usize,
}

/// Outcome of [`GanTrainer::train`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub epochs_completed: usize,
    pub stopped_early: bool,
    /// Best epoch mean discriminator loss, when early stopping is configured.
    pub best_discriminator_loss: Option<f64>,
}

/// Conditional WGAN-GP trainer with a frozen auxiliary classifier.
///
/// Each parameter set has one writer: the discriminator step updates the
/// discriminator, the generator step updates the generator, and the
/// classifier is never updated.
pub struct GanTrainer<B, G, D, C, OG, OD>
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + SpectralGenerator<B>,
    D: AutodiffModule<B> + SpectralCritic<B>,
    C: AutodiffModule<B> + SpectralClassifier<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    generator: Frozen<B, G>,
    discriminator: D,
    classifier: Frozen<B, C>,
    optim_gen: OG,
    optim_disc: OD,
    config: GanConfig,
    ledger: LossLedger,
    early_stopping: Option<EarlyStopping>,
    metric_sink: Option<Box<dyn MetricSink>>,
}

impl<B, G, D, C, OG, OD> GanTrainer<B, G, D, C, OG, OD>
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + SpectralGenerator<B>,
    D: AutodiffModule<B> + SpectralCritic<B>,
    C: AutodiffModule<B> + SpectralClassifier<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    pub fn new(
        generator: G,
        discriminator: D,
        classifier: C,
        optim_gen: OG,
        optim_disc: OD,
        config: GanConfig,
    ) -> Self {
        let early_stopping = config.patience.map(EarlyStopping::new);
        Self {
            generator: Frozen::new(generator),
            discriminator,
            classifier: Frozen::new(classifier),
            optim_gen,
            optim_disc,
            config,
            ledger: LossLedger::new(),
            early_stopping,
            metric_sink: None,
        }
    }

    pub fn with_metric_sink(mut self, sink: Box<dyn MetricSink>) -> Self {
        self.metric_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &GanConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        self.generator.module()
    }

    pub fn discriminator(&self) -> &D {
        &self.discriminator
    }

    pub fn classifier(&self) -> &C {
        self.classifier.module()
    }

    pub fn ledger(&self) -> &LossLedger {
        &self.ledger
    }

    /// The ledger is filled when reporting or when early stopping needs the D metric.
    fn collects_metrics(&self) -> bool {
        self.config.verbose || self.early_stopping.is_some()
    }

    /// One critic update on `real_samples` against samples generated from `noise`.
    pub fn discriminator_step(
        &mut self,
        real_samples: Tensor<B, 2>,
        noise: Tensor<B, 2>,
    ) -> DiscriminatorLosses {
        let fake_samples = self.generator.module().generate(noise).detach();

        let real_validity = self.discriminator.criticize(real_samples.clone()).mean();
        let fake_validity = self.discriminator.criticize(fake_samples.clone()).mean();
        let penalty = gradient_penalty(
            &self.discriminator,
            real_samples,
            fake_samples,
            self.config.lambda_gp,
        );

        let loss = fake_validity
            .clone()
            .sub(real_validity.clone())
            .add(penalty.clone());

        let losses = DiscriminatorLosses {
            loss: loss.clone().into_scalar().elem::<f64>(),
            real: real_validity.into_scalar().elem::<f64>(),
            fake: fake_validity.into_scalar().elem::<f64>(),
            gradient_penalty: penalty.into_scalar().elem::<f64>(),
        };

        let grads = GradientsParams::from_grads(loss.backward(), &self.discriminator);
        self.discriminator = self.optim_disc.step(
            self.config.discriminator_learning_rate,
            self.discriminator.clone(),
            grads,
        );

        losses
    }

    /// One generator update: adversarial loss plus the classifier's criterion
    /// on the generated samples.
    pub fn generator_step(
        &mut self,
        noise: Tensor<B, 2>,
        labels: Tensor<B, 1, Int>,
    ) -> GeneratorLosses {
        let lr = self.config.generator_learning_rate;
        let critic = Frozen::<B, D>::new(self.discriminator.clone());
        let classifier = self.classifier.module();
        let mut generator = self.generator.unfreeze();

        let fake_samples = generator.generate(noise);
        let adversarial_loss = critic.module().criticize(fake_samples.clone()).mean().neg();
        let classifier_loss = classifier
            .criterion(classifier.classify(fake_samples), labels)
            .mean();
        let loss = adversarial_loss.add(classifier_loss.clone());

        let losses = GeneratorLosses {
            loss: loss.clone().into_scalar().elem::<f64>(),
            classifier_loss: classifier_loss.into_scalar().elem::<f64>(),
        };

        let grads = GradientsParams::from_grads(loss.backward(), generator.module());
        generator.step(&mut self.optim_gen, lr, grads);

        losses
    }

    /// One pass over `loader`: a critic step per batch and a generator step
    /// every `critic_iters` batches.
    pub fn train_epoch(
        &mut self,
        loader: &dyn DataLoader<B, SpectralBatch<B>>,
        bands_count: usize,
        classes_count: usize,
    ) -> Result<EpochStats> {
        anyhow::ensure!(self.config.critic_iters > 0, "critic_iters must be at least 1");
        let sampler = NoiseLabelSampler::new(bands_count, classes_count);
        let collect = self.collects_metrics();
        let mut stats = EpochStats::default();

        for batch in loader.iter() {
            let SpectralBatch { samples, labels } = batch;
            let [_, bands] = samples.dims();
            if bands != bands_count {
                return Err(anyhow::anyhow!(
                    "batch has {bands} bands, expected {bands_count}"
                ));
            }
            stats.batches += 1;

            let noise = sampler.sample(labels.clone());
            let d_losses = self.discriminator_step(samples, noise);
            stats.discriminator_steps += 1;
            if collect {
                self.ledger.record_discriminator(&d_losses);
            }

            if stats.batches % self.config.critic_iters == 0 {
                let noise = sampler.sample(labels.clone());
                let g_losses = self.generator_step(noise, labels);
                stats.generator_steps += 1;
                if collect {
                    self.ledger.record_generator(&g_losses);
                }
            }
        }

        Ok(stats)
    }

    /// Train for up to `epochs` epochs, checkpointing the generator into
    /// `artifacts_path` after every completed epoch.
    pub fn train(
        &mut self,
        loader: &dyn DataLoader<B, SpectralBatch<B>>,
        epochs: usize,
        bands_count: usize,
        batch_size: usize,
        classes_count: usize,
        artifacts_path: &Path,
    ) -> Result<TrainingReport> {
        anyhow::ensure!(self.config.critic_iters > 0, "critic_iters must be at least 1");
        std::fs::create_dir_all(artifacts_path)
            .with_context(|| format!("failed to create {}", artifacts_path.display()))?;
        let checkpointer = GeneratorCheckpointer::new(artifacts_path);

        info!(
            "training for {epochs} epochs -> bands {bands_count}, classes {classes_count}, batch size {batch_size}, critic iters {}",
            self.config.critic_iters
        );

        let mut report = TrainingReport {
            epochs_completed: 0,
            stopped_early: false,
            best_discriminator_loss: None,
        };

        for epoch in 0..epochs {
            let stats = self.train_epoch(loader, bands_count, classes_count)?;
            debug!(
                "epoch {epoch}: {} batches, {} discriminator steps, {} generator steps",
                stats.batches, stats.discriminator_steps, stats.generator_steps
            );
            report.epochs_completed = epoch + 1;

            checkpointer.save(self.generator.module())?;

            if let Some(stopping) = self.early_stopping.as_mut() {
                let score = self.ledger.mean(LossMetric::D).unwrap_or(f64::NAN);
                let state = stopping.update(score);
                report.best_discriminator_loss = Some(stopping.best_score());
                match state {
                    StoppingState::Improving => {
                        if self.config.keep_best_checkpoint {
                            checkpointer.save_as(self.generator.module(), BEST_GENERATOR_NAME)?;
                        }
                    }
                    StoppingState::Stalled(epochs_without_improvement) => {
                        debug!("{epochs_without_improvement} epochs without improvement");
                    }
                    StoppingState::Stopped => {
                        if self.config.verbose {
                            warn!(
                                "{} epochs without improvement, terminating",
                                stopping.patience()
                            );
                        }
                        report.stopped_early = true;
                        break;
                    }
                }
            }

            if self.config.verbose {
                self.report_epoch(epoch)?;
            }
            self.ledger.reset();
        }

        Ok(report)
    }

    fn report_epoch(&mut self, epoch: usize) -> Result<()> {
        let summary = self.ledger.summary(epoch);
        if let Some(sink) = self.metric_sink.as_mut() {
            sink.add_scalars("GAN", &summary.adversarial_scalars(), epoch)?;
        }
        info!("{summary}");
        Ok(())
    }
}
