//! Conditional WGAN-GP for synthesizing labeled hyperspectral samples.
//!
//! The generator is conditioned on one-hot class labels and trained against a
//! gradient-penalized critic plus a frozen auxiliary classifier, so generated
//! spectra carry the class they were asked for.

pub mod augment;
pub mod checkpoint;
pub mod data;
pub mod early_stopping;
pub mod freeze;
pub mod gan;
pub mod metrics;
pub mod model;
pub mod noise;
pub mod penalty;
pub mod pretrain;
pub mod training;

#[cfg(test)]
pub(crate) mod test_utils;
