use anyhow::{Context, Result};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use std::path::{Path, PathBuf};

/// Default record name of the rolling generator checkpoint.
pub const DEFAULT_GENERATOR_NAME: &str = "generator_model";

/// Writes module records into a directory, replacing earlier ones.
///
/// Records are full-precision named MessagePack without compression, so
/// saving identical parameters twice yields identical bytes.
#[derive(Clone, Debug)]
pub struct GeneratorCheckpointer {
    dir: PathBuf,
    name: String,
}

impl GeneratorCheckpointer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            name: DEFAULT_GENERATOR_NAME.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `name`, extension included.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(name).with_extension("mpk")
    }

    /// Path of the default record file.
    pub fn path(&self) -> PathBuf {
        self.record_path(&self.name)
    }

    /// Save `module` under the default name.
    pub fn save<B: Backend, M: Module<B>>(&self, module: &M) -> Result<PathBuf> {
        self.save_as(module, &self.name)
    }

    /// Save `module` under `name`, overwriting any existing record.
    pub fn save_as<B: Backend, M: Module<B>>(&self, module: &M, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        module
            .clone()
            .save_file(self.dir.join(name), &recorder())
            .with_context(|| format!("failed to save {name} into {}", self.dir.display()))?;
        Ok(self.record_path(name))
    }

    /// Load the default record into `module`.
    pub fn load<B: Backend, M: Module<B>>(&self, module: M, device: &B::Device) -> Result<M> {
        load_record(module, &self.dir.join(&self.name), device)
    }
}

/// Load a record saved by [`GeneratorCheckpointer`] from `path` (extension optional).
pub fn load_record<B: Backend, M: Module<B>>(
    module: M,
    path: &Path,
    device: &B::Device,
) -> Result<M> {
    module
        .load_file(path.to_path_buf(), &recorder(), device)
        .with_context(|| format!("failed to load record {}", path.display()))
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeneratorConfig;
    use crate::test_utils::{device, parameter_values, TestBackend};

    #[test]
    fn repeated_saves_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let device = device();
        let generator = GeneratorConfig::new(4, 3, 5).init::<TestBackend>(&device);
        let checkpointer = GeneratorCheckpointer::new(dir.path());

        let path = checkpointer.save(&generator).unwrap();
        let first = std::fs::read(&path).unwrap();
        checkpointer.save(&generator).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(path, dir.path().join("generator_model.mpk"));
        assert_eq!(first, second);
    }

    #[test]
    fn load_restores_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let device = device();
        let config = GeneratorConfig::new(4, 3, 5);
        let saved = config.init::<TestBackend>(&device);
        let checkpointer = GeneratorCheckpointer::new(dir.path()).with_name("custom");
        checkpointer.save(&saved).unwrap();
        assert!(dir.path().join("custom.mpk").exists());

        let fresh = config.init::<TestBackend>(&device);
        let loaded = checkpointer.load(fresh, &device).unwrap();
        assert_eq!(parameter_values(&loaded), parameter_values(&saved));
    }
}
