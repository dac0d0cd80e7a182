//! CLI module containing argument parsing and related functionality

pub mod args;
pub mod date_parser;

pub use args::{parse_args, validate_args, Args, Command};
