//! Core domain models for testgen
//!
//! Configuration, instruction files, source discovery, prompt rendering and
//! the state recorded for a run.

pub mod config;
pub mod error;
pub mod instructions;
pub mod prompt;
pub mod scanner;
pub mod state;

pub use config::{GeneratorConfig, Settings};
pub use error::ConfigError;
pub use instructions::{InstructionKind, InstructionSet};
pub use scanner::{SourceFile, SourceScanner};
pub use state::*;
