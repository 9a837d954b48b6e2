use anyhow::{Context, Result};
use burn::backend::wgpu::WgpuDevice;
use burn::backend::{NdArray, Wgpu};
use burn::config::Config;
use burn::prelude::Backend;
use clap::Parser;
use hsi_gan_burn::augment::synthesize;
use hsi_gan_burn::checkpoint::{load_record, DEFAULT_GENERATOR_NAME};
use hsi_gan_burn::data::SpectralCorpus;
use hsi_gan_burn::noise::NoiseLabelSampler;
use hsi_gan_burn::training::{artifacts_dir, TrainingConfig};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(about = "Synthesize labeled spectra with a trained generator")]
struct Args {
    #[arg(long)]
    experiment_dir: PathBuf,
    #[arg(long, default_value_t = 100)]
    samples_per_class: usize,
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value = DEFAULT_GENERATOR_NAME)]
    model_name: String,
    /// Run on the CPU backend instead of the GPU.
    #[arg(long)]
    cpu: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.cpu {
        run::<NdArray>(&args, Default::default())
    } else {
        run::<Wgpu<f32, i32>>(&args, WgpuDevice::default())
    }
}

fn run<B: Backend>(args: &Args, device: B::Device) -> Result<()> {
    let artifacts = artifacts_dir(&args.experiment_dir);
    let config_path = artifacts.join("config.json");
    let config = TrainingConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let model = &config.model;

    let generator = load_record(
        model.init_generator::<B>(&device),
        &artifacts.join(&args.model_name),
        &device,
    )?;
    let sampler = NoiseLabelSampler::new(model.bands_count, model.classes_count);
    let samples = synthesize(&generator, &sampler, args.samples_per_class, &device)?;
    log::info!(
        "generated {} samples for {} classes",
        samples.len(),
        model.classes_count
    );

    write_corpus(
        &args.output,
        SpectralCorpus {
            bands_count: model.bands_count,
            classes_count: model.classes_count,
            samples,
        },
    )
}

fn write_corpus(path: &Path, corpus: SpectralCorpus) -> Result<()> {
    corpus.save(path)?;
    log::info!("wrote {}", path.display());
    Ok(())
}
