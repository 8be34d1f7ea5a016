//! Run and stage state models

use crate::provider::TokenUsage;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// Which part of the pipeline a `run` executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Initial,
    Refine,
    Build,
    Coverage,
    Full,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::Initial => "initial",
            PipelineStep::Refine => "refine",
            PipelineStep::Build => "build",
            PipelineStep::Coverage => "coverage",
            PipelineStep::Full => "full",
        };
        f.write_str(name)
    }
}

impl FromStr for PipelineStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(PipelineStep::Initial),
            "refine" => Ok(PipelineStep::Refine),
            "build" => Ok(PipelineStep::Build),
            "coverage" => Ok(PipelineStep::Coverage),
            "full" => Ok(PipelineStep::Full),
            other => Err(format!("unknown step: {}", other)),
        }
    }
}

/// Individual stages tracked in the run state and report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    InitialGeneration,
    Refinement,
    Build,
    BuildFix,
    CoverageAnalysis,
    CoverageImprovement,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::InitialGeneration => "Initial test generation",
            StageKind::Refinement => "Test refinement",
            StageKind::Build => "Build",
            StageKind::BuildFix => "Build fix suggestions",
            StageKind::CoverageAnalysis => "Coverage analysis",
            StageKind::CoverageImprovement => "Coverage improvements",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Succeeded,
    Failed,
}

/// Result of one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub status: StageStatus,

    /// Items the stage looked at (files, build steps)
    pub processed: usize,

    /// Items that produced output
    pub succeeded: usize,

    /// Short human-readable note
    pub detail: String,
}

impl StageOutcome {
    pub fn new(
        stage: StageKind,
        processed: usize,
        succeeded: usize,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            status: if succeeded > 0 {
                StageStatus::Succeeded
            } else {
                StageStatus::Failed
            },
            processed,
            succeeded,
            detail: detail.into(),
        }
    }

    pub fn succeeded(stage: StageKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Succeeded,
            processed: 1,
            succeeded: 1,
            detail: detail.into(),
        }
    }

    pub fn failed(stage: StageKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            processed: 0,
            succeeded: 0,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Succeeded
    }
}

/// Result of configuring and building the generated tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub success: bool,

    /// Captured tool output, or a description of why the tool could not run
    pub output: String,
}

impl BuildOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Result of running the compiled test binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageInfo {
    pub test_success: bool,
    pub test_output: String,
    pub test_errors: String,

    /// Counts from the GoogleTest summary lines, when present
    pub tests_passed: Option<usize>,
    pub tests_failed: Option<usize>,
}

impl CoverageInfo {
    pub fn from_test_run(test_success: bool, test_output: String, test_errors: String) -> Self {
        let (tests_passed, tests_failed) = gtest_counts(&test_output);
        Self {
            test_success,
            test_output,
            test_errors,
            tests_passed,
            tests_failed,
        }
    }
}

fn gtest_summary() -> Option<&'static Regex> {
    static SUMMARY: OnceLock<Option<Regex>> = OnceLock::new();
    SUMMARY
        .get_or_init(|| Regex::new(r"\[\s*(PASSED|FAILED)\s*\]\s+(\d+)\s+tests?").ok())
        .as_ref()
}

/// Parse `[  PASSED  ] 12 tests.` style summary lines; the last of each wins
fn gtest_counts(output: &str) -> (Option<usize>, Option<usize>) {
    let mut passed = None;
    let mut failed = None;
    let Some(summary) = gtest_summary() else {
        return (passed, failed);
    };
    for caps in summary.captures_iter(output) {
        let count = caps[2].parse().ok();
        match &caps[1] {
            "PASSED" => passed = count,
            _ => failed = count,
        }
    }
    (passed, failed)
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        };
        f.write_str(name)
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RunStatus::Pending),
            "Running" => Ok(RunStatus::Running),
            "Completed" => Ok(RunStatus::Completed),
            "Failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status: {}", other)),
        }
    }
}

/// Everything recorded about one generator run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub step: PipelineStep,
    pub status: RunStatus,
    pub stages: Vec<StageOutcome>,

    /// Test files written or rewritten during this run
    pub generated_files: Vec<String>,

    pub usage: TokenUsage,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Error that aborted the run, if any
    pub error: Option<String>,
}

impl RunState {
    pub fn new(step: PipelineStep) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            step,
            status: RunStatus::Pending,
            stages: Vec::new(),
            generated_files: Vec::new(),
            usage: TokenUsage::default(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn finish(&mut self, success: bool) {
        self.status = if success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.completed_at = Some(Utc::now());
    }

    /// Finish as failed, keeping the error for the summary and history
    pub fn abort(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.finish(false);
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn record(&mut self, outcome: StageOutcome) {
        self.stages.push(outcome);
    }

    pub fn record_file(&mut self, name: &str) {
        if !self.generated_files.iter().any(|f| f == name) {
            self.generated_files.push(name.to_string());
        }
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageOutcome> {
        self.stages.iter().rev().find(|s| s.stage == kind)
    }

    pub fn stages_succeeded(&self) -> usize {
        self.stages.iter().filter(|s| s.is_success()).count()
    }
}
