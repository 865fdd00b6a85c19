//! Core data types: transitions and running observation statistics.

pub mod running_stats;
pub mod transition;

pub use running_stats::RunningNormalizer;
pub use transition::Transition;
