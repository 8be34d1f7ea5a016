//! Per-stage prompt instructions loaded from YAML

use crate::core::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which instruction file a prompt is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    InitialGeneration,
    Refinement,
    BuildFix,
    CoverageImprovement,
}

impl InstructionKind {
    pub const ALL: [InstructionKind; 4] = [
        InstructionKind::InitialGeneration,
        InstructionKind::Refinement,
        InstructionKind::BuildFix,
        InstructionKind::CoverageImprovement,
    ];

    /// File stem under the instructions directory
    pub fn file_stem(&self) -> &'static str {
        match self {
            InstructionKind::InitialGeneration => "initial_test_generation",
            InstructionKind::Refinement => "test_refinement",
            InstructionKind::BuildFix => "build_fix",
            InstructionKind::CoverageImprovement => "coverage_improvement",
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.yaml", self.file_stem()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstructionFile {
    instructions: InstructionSet,
}

/// The `instructions:` mapping of one stage file
///
/// Only `role` and `objective` are mandatory. Every list defaults to empty
/// and unknown keys are ignored, so one struct covers all four stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstructionSet {
    /// Used verbatim as the system prompt
    pub role: String,

    pub objective: String,

    // initial generation
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub output_format: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub example_structure: String,

    // refinement
    #[serde(default)]
    pub refinement_tasks: Vec<String>,
    #[serde(default)]
    pub quality_checks: Vec<String>,

    // build fix
    #[serde(default)]
    pub analysis_steps: Vec<String>,
    #[serde(default)]
    pub fix_priorities: Vec<String>,

    // coverage improvement
    #[serde(default)]
    pub coverage_analysis: Vec<String>,
    #[serde(default)]
    pub improvement_strategies: Vec<String>,
}

impl InstructionSet {
    /// Load the instruction file for `kind` from `dir`
    pub fn load(dir: &Path, kind: InstructionKind) -> Result<Self, ConfigError> {
        Self::from_file(kind.path_in(dir))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|e| e.with_path(path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: InstructionFile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: None,
            source,
        })?;
        file.instructions.validate()?;
        Ok(file.instructions)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.role.trim().is_empty() {
            return Err(ConfigError::Invalid("instructions.role must not be empty".to_string()));
        }
        if self.objective.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "instructions.objective must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
