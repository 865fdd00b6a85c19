//! Checkpoint persistence.

pub mod checkpointer;

pub use checkpointer::{
    CheckpointError, Checkpointer, NORMALIZER_FILE, POLICY_FILE, POLICY_OPTIMIZER_FILE,
    TRAINER_STATE_FILE, VALUE_FILE, VALUE_OPTIMIZER_FILE,
};
