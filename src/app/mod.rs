//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{load_configuration, configure_logging};
pub use execution::{run_command, run_count, run_slice, run_update, SliceRequest};
