//! CLI command definitions

use crate::core::{PipelineStep, Settings};
use crate::provider::ProviderKind;
use clap::Args;
use std::path::PathBuf;

/// Generate, refine, build or coverage-check tests for a project
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Root of the C++ project
    #[arg(short, long)]
    pub project_path: Option<PathBuf>,

    /// Directory for generated tests, CMakeLists.txt and the report
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// LLM provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model name passed to the provider
    #[arg(short, long)]
    pub model: Option<String>,

    /// API key for hosted providers
    #[arg(long)]
    pub api_key: Option<String>,

    /// Override the provider endpoint
    #[arg(long)]
    pub api_url: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens per response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// HTTP timeout per request, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Directory holding the instruction YAML files
    #[arg(long)]
    pub instructions_dir: Option<PathBuf>,

    /// cmake executable
    #[arg(long)]
    pub cmake: Option<String>,

    /// Which part of the pipeline to run
    #[arg(long, value_enum, default_value_t = StepArg::Full)]
    pub step: StepArg,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

impl RunCommand {
    /// Flags as a settings layer for merging with a settings file
    pub fn to_settings(&self) -> Settings {
        Settings {
            project_path: self.project_path.clone(),
            output_dir: self.output_dir.clone(),
            provider: self.provider.map(Into::into),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            api_url: self.api_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
            instructions_dir: self.instructions_dir.clone(),
            cmake: self.cmake.clone(),
        }
    }
}

/// List the sources a run would submit
#[derive(Debug, Args, Clone)]
pub struct ScanCommand {
    /// Root of the C++ project
    #[arg(short, long)]
    pub project_path: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Check that every instruction file loads
#[derive(Debug, Args, Clone)]
pub struct ValidateConfigCommand {
    /// Directory holding the instruction YAML files
    #[arg(long)]
    pub instructions_dir: Option<PathBuf>,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Project path to filter by
    #[arg(short, long)]
    pub project: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Provider argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    Ollama,
    Github,
    Gemini,
    Demo,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Ollama => ProviderKind::Ollama,
            ProviderArg::Github => ProviderKind::Github,
            ProviderArg::Gemini => ProviderKind::Gemini,
            ProviderArg::Demo => ProviderKind::Demo,
        }
    }
}

/// Step argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StepArg {
    Initial,
    Refine,
    Build,
    Coverage,
    Full,
}

impl From<StepArg> for PipelineStep {
    fn from(arg: StepArg) -> Self {
        match arg {
            StepArg::Initial => PipelineStep::Initial,
            StepArg::Refine => PipelineStep::Refine,
            StepArg::Build => PipelineStep::Build,
            StepArg::Coverage => PipelineStep::Coverage,
            StepArg::Full => PipelineStep::Full,
        }
    }
}
