//! Checkpoint persistence for agents.
//!
//! A checkpoint is a directory holding one file per component:
//!
//! - `policy.bin` / `value.bin`: network weights
//! - `policy_opt.bin` / `value_opt.bin`: Adam optimizer state
//! - `normalizer.bin`: running state statistics
//! - `trainer_state.bin`: completed update counter (u64, little-endian)
//!
//! Network and optimizer records go through burn's [`BinFileRecorder`]
//! at full precision; the normalizer and trainer state use their own
//! fixed little-endian layouts so they stay readable without a backend.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use burn::record::{BinFileRecorder, FullPrecisionSettings, Record, Recorder};
use burn::tensor::backend::Backend;

/// File stem for the policy network weights.
pub const POLICY_FILE: &str = "policy";
/// File stem for the value network weights.
pub const VALUE_FILE: &str = "value";
/// File stem for the policy optimizer state.
pub const POLICY_OPTIMIZER_FILE: &str = "policy_opt";
/// File stem for the value optimizer state.
pub const VALUE_OPTIMIZER_FILE: &str = "value_opt";
/// File name for the serialized normalizer.
pub const NORMALIZER_FILE: &str = "normalizer.bin";
/// File name for the trainer state counter.
pub const TRAINER_STATE_FILE: &str = "trainer_state.bin";

/// Error type for checkpoint operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// Filesystem error.
    Io(io::Error),
    /// Recorder failed to serialize or deserialize a record.
    Recorder(String),
    /// A checkpoint file exists but its contents are malformed.
    Corrupt(&'static str),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "checkpoint I/O error: {}", e),
            CheckpointError::Recorder(msg) => write!(f, "recorder error: {}", msg),
            CheckpointError::Corrupt(msg) => write!(f, "corrupt checkpoint: {}", msg),
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckpointError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Reads and writes the files of one checkpoint directory.
pub struct Checkpointer {
    dir: PathBuf,
    recorder: BinFileRecorder<FullPrecisionSettings>,
}

impl Checkpointer {
    /// Open a checkpointer at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            recorder: BinFileRecorder::<FullPrecisionSettings>::new(),
        })
    }

    /// Directory this checkpointer reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a named component. The recorder appends its own `.bin`
    /// extension to stems that lack one.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write a network or optimizer record.
    pub fn save_record<B, R>(&self, name: &str, record: R) -> Result<(), CheckpointError>
    where
        B: Backend,
        R: Record<B>,
    {
        self.recorder
            .record(record, self.path(name))
            .map_err(|e| CheckpointError::Recorder(e.to_string()))
    }

    /// Read a network or optimizer record.
    pub fn load_record<B, R>(&self, name: &str, device: &B::Device) -> Result<R, CheckpointError>
    where
        B: Backend,
        R: Record<B>,
    {
        self.recorder
            .load(self.path(name), device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))
    }

    /// Write a raw byte component.
    pub fn save_bytes(&self, name: &str, bytes: &[u8]) -> Result<(), CheckpointError> {
        fs::write(self.path(name), bytes)?;
        Ok(())
    }

    /// Read a raw byte component.
    pub fn load_bytes(&self, name: &str) -> Result<Vec<u8>, CheckpointError> {
        Ok(fs::read(self.path(name))?)
    }

    /// Whether every file of a full agent checkpoint is present.
    pub fn is_complete(&self) -> bool {
        let records = [
            POLICY_FILE,
            VALUE_FILE,
            POLICY_OPTIMIZER_FILE,
            VALUE_OPTIMIZER_FILE,
        ];
        records
            .iter()
            .all(|stem| self.path(stem).with_extension("bin").exists())
            && self.path(NORMALIZER_FILE).exists()
            && self.path(TRAINER_STATE_FILE).exists()
    }
}
