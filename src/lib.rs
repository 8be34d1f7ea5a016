//! testgen - LLM-driven C++ unit test generator

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod provider;

// Re-export commonly used types
pub use core::{
    GeneratorConfig, PipelineStep, RunState, RunStatus, Settings, StageKind, StageOutcome,
};
pub use execution::{GenerationEvent, TestGenerator};
pub use provider::{
    create_provider, LlmProvider, ProviderConfig, ProviderError, ProviderKind, ProviderResponse,
};
