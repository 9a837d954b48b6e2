#![recursion_limit = "256"]
use anyhow::{Context, Result};
use burn::backend::wgpu::WgpuDevice;
use burn::backend::{Autodiff, NdArray, Wgpu};
use burn::config::Config;
use clap::Parser;
use hsi_gan_burn::training::TrainingConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Train the conditional WGAN-GP on a spectral corpus")]
struct Args {
    #[arg(long)]
    experiment_dir: PathBuf,
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Run on the CPU backend instead of the GPU.
    #[arg(long)]
    cpu: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = TrainingConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let report = if args.cpu {
        type Backend = Autodiff<NdArray>;
        hsi_gan_burn::training::train::<Backend>(&args.experiment_dir, config, Default::default())?
    } else {
        type Backend = Autodiff<Wgpu<f32, i32>>;
        hsi_gan_burn::training::train::<Backend>(
            &args.experiment_dir,
            config,
            WgpuDevice::default(),
        )?
    };

    log::info!(
        "epochs completed: {}, stopped early: {}",
        report.epochs_completed,
        report.stopped_early
    );
    Ok(())
}
