//! Temporal slicing of hosted repositories and maintenance of a code-smell
//! count dataset built from per-slice analysis results.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod extract;
pub mod git;
pub mod logging;
pub mod output;
pub mod slicer;
pub mod smells;
