//! Checkpoint directories holding parameter blobs and attribute files.
//!
//! A checkpoint is a directory. Each network is one Burn binary record named
//! after its role (`PI.bin`, `V.bin`, `actor_logstd.bin`, `Q1.bin`), and each
//! persisted attribute is one JSON file named after the attribute
//! (`config.json`, `steps.json`, ...).

use std::fs;
use std::io;
use std::path::PathBuf;

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HybridRlError, Result};

/// Handle on one checkpoint directory.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    /// Create the directory (and parents) if it does not exist.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(HybridRlError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("checkpoint directory {} does not exist", dir.display()),
            )));
        }
        Ok(Self { dir })
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn attr_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Whether a blob called `name` was saved (Burn appends `.bin`).
    pub fn has_module(&self, name: &str) -> bool {
        self.blob_path(name).with_extension("bin").exists()
    }

    /// Save a module as a full-precision binary record.
    pub fn save_module<B: Backend, M: Module<B>>(&self, name: &str, module: &M) -> Result<()> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        module.clone().save_file(self.blob_path(name), &recorder)?;
        Ok(())
    }

    /// Load a record into a module of matching architecture.
    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        name: &str,
        template: M,
        device: &B::Device,
    ) -> Result<M> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        Ok(template.load_file(self.blob_path(name), &recorder, device)?)
    }

    pub fn write_attr<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::write(self.attr_path(name), serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    pub fn read_attr<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let text = fs::read_to_string(self.attr_path(name))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::linear::{InitLinear, InitLinearConfig};
    use burn::backend::NdArray;
    use burn::tensor::Tensor;
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_checkpoint_dir_creation() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("nested/checkpoint");
        Checkpointer::create(&subdir).unwrap();
        assert!(subdir.is_dir());
        assert!(Checkpointer::open(&subdir).is_ok());
    }

    #[test]
    fn test_open_missing_dir_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Checkpointer::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, HybridRlError::Io(_)));
    }

    #[test]
    fn test_attribute_round_trip() {
        let dir = tempdir().unwrap();
        let ckpt = Checkpointer::create(dir.path()).unwrap();
        ckpt.write_attr("steps", &42usize).unwrap();
        ckpt.write_attr("g_mean", &1.5f32).unwrap();
        assert!(dir.path().join("steps.json").exists());
        assert_eq!(ckpt.read_attr::<usize>("steps").unwrap(), 42);
        assert_eq!(ckpt.read_attr::<f32>("g_mean").unwrap(), 1.5);
        assert!(ckpt.read_attr::<f32>("eps").is_err());
    }

    #[test]
    fn test_module_round_trip() {
        let device = Default::default();
        let dir = tempdir().unwrap();
        let ckpt = Checkpointer::create(dir.path()).unwrap();

        let layer: InitLinear<TestBackend> = InitLinearConfig::new(3, 2).init(&device);
        ckpt.save_module("PI", &layer).unwrap();
        assert!(ckpt.has_module("PI"));
        assert!(!ckpt.has_module("V"));

        let fresh: InitLinear<TestBackend> = InitLinearConfig::new(3, 2).init(&device);
        let loaded = ckpt.load_module("PI", fresh, &device).unwrap();

        let x = Tensor::<TestBackend, 2>::ones([1, 3], &device);
        let diff: f32 = (layer.forward(x.clone()) - loaded.forward(x)).abs().max().into_scalar();
        assert!(diff < 1e-7);
    }
}
