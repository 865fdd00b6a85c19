//! Learning rate scheduling.
//!
//! ## Available Schedulers
//!
//! - [`ConstantLR`]: No scheduling (constant rate)
//! - [`StepDecay`]: Staircase decay every N updates
//! - [`LinearDecay`]: Linear interpolation from start to end LR
//!
//! ## Example
//!
//! ```rust,ignore
//! use crop_rl::scheduling::{LRScheduler, StepDecay};
//!
//! // Decay 3e-4 by 0.7x every 100 updates
//! let scheduler = StepDecay::new(3e-4, 100, 0.7);
//! let lr = scheduler.get_lr(updates_completed);
//! ```

pub mod lr_scheduler;

pub use lr_scheduler::{ConstantLR, LRScheduler, LinearDecay, StepDecay};
