//! Test generator - runs the pipeline stages against a provider

use crate::{
    core::{
        prompt, BuildOutcome, CoverageInfo, GeneratorConfig, InstructionKind, InstructionSet,
        PipelineStep, RunState, RunStatus, SourceFile, SourceScanner, StageKind, StageOutcome,
    },
    execution::{
        build::BuildRunner,
        cmake::render_cmake_lists,
        report::{render_report, REPORT_FILE},
    },
    provider::{LlmProvider, ProviderError},
};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const CMAKE_FILE: &str = "CMakeLists.txt";
pub const BUILD_FIX_FILE: &str = "build_fix_suggestions.md";
pub const COVERAGE_FILE: &str = "coverage_improvements.cpp";

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    RunStarted {
        run_id: Uuid,
        step: PipelineStep,
    },
    StageStarted {
        stage: StageKind,
        /// Number of files the stage will process, 0 for single-shot stages
        total: usize,
    },
    FileWritten {
        stage: StageKind,
        source: String,
        output: String,
    },
    FileSkipped {
        stage: StageKind,
        file: String,
        reason: String,
    },
    FileFailed {
        stage: StageKind,
        file: String,
        error: String,
    },
    BuildFinished {
        outcome: BuildOutcome,
    },
    StageFinished {
        outcome: StageOutcome,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&GenerationEvent) + Send + Sync>;

fn is_test_file(name: &str) -> bool {
    name.starts_with("test_") && name.ends_with(".cpp")
}

/// Runs generation stages for one project
pub struct TestGenerator<P> {
    config: GeneratorConfig,
    provider: P,
    build_runner: BuildRunner,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<P: LlmProvider> TestGenerator<P> {
    pub fn new(config: GeneratorConfig, provider: P) -> Self {
        let build_runner = BuildRunner::new(config.cmake_program.clone(), &config.output_dir);
        Self {
            config,
            provider,
            build_runner,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(&GenerationEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    async fn emit_event(&self, event: GenerationEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(&event);
        }
    }

    fn load_instructions(&self, kind: InstructionKind) -> Result<InstructionSet> {
        InstructionSet::load(&self.config.instructions_dir, kind)
            .with_context(|| format!("Failed to load {} instructions", kind.file_stem()))
    }

    async fn ensure_output_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create output directory {}",
                    self.config.output_dir.display()
                )
            })
    }

    /// Find the C++ sources to generate tests for
    pub fn find_sources(&self) -> Result<Vec<SourceFile>> {
        SourceScanner::new(&self.config.project_path).scan()
    }

    /// Names of `test_*.cpp` files in the output directory, sorted
    pub async fn list_test_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.config.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e).context("Failed to read output directory"),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_test_file(&name) && entry.file_type().await?.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn ask(
        &self,
        state: &mut RunState,
        prompt: &str,
        instructions: &InstructionSet,
    ) -> Result<String, ProviderError> {
        debug!("Prompt length: {} characters", prompt.len());
        let response = self.provider.generate(prompt, &instructions.role).await?;
        if let Some(usage) = &response.usage {
            state.usage.add(usage);
        }
        debug!("Response length: {} characters", response.content.len());
        Ok(response.content)
    }

    async fn write_artifact(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.config.output_dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    async fn finish_stage(&self, state: &mut RunState, outcome: StageOutcome) -> StageOutcome {
        state.record(outcome.clone());
        self.emit_event(GenerationEvent::StageFinished {
            outcome: outcome.clone(),
        })
        .await;
        outcome
    }

    /// Generate an initial test file for every source file
    pub async fn generate_initial_tests(&self, state: &mut RunState) -> Result<StageOutcome> {
        let stage = StageKind::InitialGeneration;
        info!("Starting initial test generation...");

        let instructions = self.load_instructions(InstructionKind::InitialGeneration)?;
        self.ensure_output_dir().await?;

        let sources = self.find_sources()?;
        if sources.is_empty() {
            warn!("No C++ files found to generate tests for");
            let outcome = StageOutcome::failed(stage, "no C++ files found");
            return Ok(self.finish_stage(state, outcome).await);
        }

        self.emit_event(GenerationEvent::StageStarted {
            stage,
            total: sources.len(),
        })
        .await;

        let mut written_this_stage = HashSet::new();
        let mut success_count = 0;

        for source in &sources {
            let display_name = source.relative_path.display().to_string();
            info!("Generating tests for {}", source.file_name());

            let source_code = match tokio::fs::read_to_string(&source.path).await {
                Ok(code) if !code.trim().is_empty() => code,
                Ok(_) => {
                    warn!("Empty file: {}", display_name);
                    self.emit_event(GenerationEvent::FileSkipped {
                        stage,
                        file: display_name,
                        reason: "empty file".to_string(),
                    })
                    .await;
                    continue;
                }
                Err(e) => {
                    warn!("Unreadable file {}: {}", display_name, e);
                    self.emit_event(GenerationEvent::FileSkipped {
                        stage,
                        file: display_name,
                        reason: format!("unreadable: {}", e),
                    })
                    .await;
                    continue;
                }
            };

            let prompt =
                prompt::initial_test_prompt(&instructions, &source.file_name(), &source_code);

            let generated = match self.ask(state, &prompt, &instructions).await {
                Ok(content) => content,
                Err(e) => {
                    error!("Error generating test for {}: {}", display_name, e);
                    self.emit_event(GenerationEvent::FileFailed {
                        stage,
                        file: display_name,
                        error: e.to_string(),
                    })
                    .await;
                    continue;
                }
            };

            if generated.trim().is_empty() {
                warn!("No test generated for {}", display_name);
                self.emit_event(GenerationEvent::FileSkipped {
                    stage,
                    file: display_name,
                    reason: "empty response".to_string(),
                })
                .await;
                continue;
            }

            let test_name = source.test_file_name();
            if !written_this_stage.insert(test_name.clone()) {
                warn!(
                    "{} overwrites {} generated earlier in this run",
                    display_name, test_name
                );
            }

            let path = self.write_artifact(&test_name, &generated).await?;
            info!("Generated test file: {}", path.display());
            state.record_file(&test_name);
            success_count += 1;

            self.emit_event(GenerationEvent::FileWritten {
                stage,
                source: display_name,
                output: test_name,
            })
            .await;
        }

        info!(
            "Successfully generated tests for {}/{} files",
            success_count,
            sources.len()
        );
        let outcome = StageOutcome::new(
            stage,
            sources.len(),
            success_count,
            format!("{}/{} files", success_count, sources.len()),
        );
        Ok(self.finish_stage(state, outcome).await)
    }

    /// Ask the provider to improve every generated test file in place
    pub async fn refine_tests(&self, state: &mut RunState) -> Result<StageOutcome> {
        let stage = StageKind::Refinement;
        info!("Starting test refinement...");

        let instructions = self.load_instructions(InstructionKind::Refinement)?;

        let test_files = self.list_test_files().await?;
        if test_files.is_empty() {
            warn!("No test files found to refine");
            let outcome = StageOutcome::failed(stage, "no test files found");
            return Ok(self.finish_stage(state, outcome).await);
        }

        self.emit_event(GenerationEvent::StageStarted {
            stage,
            total: test_files.len(),
        })
        .await;

        let mut success_count = 0;

        for name in &test_files {
            info!("Refining test file: {}", name);
            let path = self.config.output_dir.join(name);

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) if !content.trim().is_empty() => content,
                _ => {
                    self.emit_event(GenerationEvent::FileSkipped {
                        stage,
                        file: name.clone(),
                        reason: "empty or unreadable".to_string(),
                    })
                    .await;
                    continue;
                }
            };

            let prompt = prompt::refinement_prompt(&instructions, name, &content);
            let refined = match self.ask(state, &prompt, &instructions).await {
                Ok(refined) => refined,
                Err(e) => {
                    error!("Error refining test {}: {}", name, e);
                    self.emit_event(GenerationEvent::FileFailed {
                        stage,
                        file: name.clone(),
                        error: e.to_string(),
                    })
                    .await;
                    continue;
                }
            };

            if refined.trim().is_empty() {
                self.emit_event(GenerationEvent::FileSkipped {
                    stage,
                    file: name.clone(),
                    reason: "empty response".to_string(),
                })
                .await;
                continue;
            }

            self.write_artifact(name, &refined).await?;
            info!("Refined test file: {}", path.display());
            state.record_file(name);
            success_count += 1;

            self.emit_event(GenerationEvent::FileWritten {
                stage,
                source: name.clone(),
                output: name.clone(),
            })
            .await;
        }

        info!(
            "Successfully refined {}/{} test files",
            success_count,
            test_files.len()
        );
        let outcome = StageOutcome::new(
            stage,
            test_files.len(),
            success_count,
            format!("{}/{} files", success_count, test_files.len()),
        );
        Ok(self.finish_stage(state, outcome).await)
    }

    /// Write CMakeLists.txt and build the generated tests
    pub async fn build_tests(&self, state: &mut RunState) -> Result<BuildOutcome> {
        info!("Building generated tests...");
        self.emit_event(GenerationEvent::StageStarted {
            stage: StageKind::Build,
            total: 0,
        })
        .await;

        self.ensure_output_dir().await?;
        let test_files = self.list_test_files().await?;
        let cmake = render_cmake_lists(&self.config.project_path, &test_files);
        self.write_artifact(CMAKE_FILE, &cmake).await?;

        let outcome = self
            .build_runner
            .build()
            .await
            .context("Failed to create build directory")?;

        self.emit_event(GenerationEvent::BuildFinished {
            outcome: outcome.clone(),
        })
        .await;

        let stage_outcome = if outcome.success {
            StageOutcome::succeeded(
                StageKind::Build,
                format!("{} test files built", test_files.len()),
            )
        } else {
            let first_line = outcome
                .output
                .lines()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no output")
                .to_string();
            StageOutcome::failed(StageKind::Build, format!("build failed: {}", first_line))
        };
        self.finish_stage(state, stage_outcome).await;

        Ok(outcome)
    }

    /// Ask the provider how to fix a failed build
    ///
    /// Suggestions are saved and logged but never applied, so the stage
    /// reports success only in the sense that suggestions were produced.
    pub async fn fix_build_issues(
        &self,
        state: &mut RunState,
        build_output: &str,
    ) -> Result<StageOutcome> {
        let stage = StageKind::BuildFix;
        info!("Attempting to fix build issues...");
        self.emit_event(GenerationEvent::StageStarted { stage, total: 0 }).await;

        let instructions = self.load_instructions(InstructionKind::BuildFix)?;
        let prompt = prompt::build_fix_prompt(&instructions, build_output);

        let outcome = match self.ask(state, &prompt, &instructions).await {
            Ok(suggestions) => {
                info!("LLM suggested fixes:\n{}", suggestions);
                self.write_artifact(BUILD_FIX_FILE, &suggestions).await?;
                StageOutcome::succeeded(
                    stage,
                    format!("suggestions saved to {} (not applied)", BUILD_FIX_FILE),
                )
            }
            Err(e) => {
                error!("Error getting build fixes: {}", e);
                StageOutcome::failed(stage, e.to_string())
            }
        };
        Ok(self.finish_stage(state, outcome).await)
    }

    /// Run the built test binary and capture its results
    pub async fn run_coverage_analysis(&self, state: &mut RunState) -> Option<CoverageInfo> {
        let stage = StageKind::CoverageAnalysis;
        info!("Running coverage analysis...");
        self.emit_event(GenerationEvent::StageStarted { stage, total: 0 }).await;

        let info = self.build_runner.run_tests().await;
        let outcome = match &info {
            Some(info) => {
                let counts = match (info.tests_passed, info.tests_failed) {
                    (Some(p), Some(f)) => format!(" ({} passed, {} failed)", p, f),
                    (Some(p), None) => format!(" ({} passed)", p),
                    _ => String::new(),
                };
                let verdict = if info.test_success {
                    "tests passed"
                } else {
                    "tests failed"
                };
                StageOutcome::succeeded(stage, format!("{}{}", verdict, counts))
            }
            None => StageOutcome::failed(stage, "test executable not found or not runnable"),
        };
        self.finish_stage(state, outcome).await;
        info
    }

    /// Ask the provider for additional tests based on the test run
    pub async fn improve_coverage(
        &self,
        state: &mut RunState,
        coverage: &CoverageInfo,
    ) -> Result<StageOutcome> {
        let stage = StageKind::CoverageImprovement;
        info!("Improving test coverage...");
        self.emit_event(GenerationEvent::StageStarted { stage, total: 0 }).await;

        let instructions = self.load_instructions(InstructionKind::CoverageImprovement)?;
        self.ensure_output_dir().await?;
        let prompt = prompt::coverage_improvement_prompt(&instructions, coverage);

        let outcome = match self.ask(state, &prompt, &instructions).await {
            Ok(improvements) => {
                let path = self.write_artifact(COVERAGE_FILE, &improvements).await?;
                info!("Coverage improvements saved to: {}", path.display());
                StageOutcome::succeeded(stage, format!("saved to {}", COVERAGE_FILE))
            }
            Err(e) => {
                error!("Error improving coverage: {}", e);
                StageOutcome::failed(stage, e.to_string())
            }
        };
        Ok(self.finish_stage(state, outcome).await)
    }

    /// Write the markdown report for the run
    pub async fn generate_report(&self, state: &RunState) -> Result<PathBuf> {
        info!("Generating final report...");
        self.ensure_output_dir().await?;
        let test_files = self.list_test_files().await?;
        let report = render_report(&self.config, state, &test_files, chrono::Local::now());
        let path = self.write_artifact(REPORT_FILE, &report).await?;
        info!("Report saved to: {}", path.display());
        Ok(path)
    }

    /// Convert a hard stage error into a failed outcome, for stages the
    /// full pipeline treats as optional
    async fn soften(
        &self,
        state: &mut RunState,
        stage: StageKind,
        result: Result<StageOutcome>,
    ) -> StageOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{} failed: {:#}", stage, e);
                self.finish_stage(state, StageOutcome::failed(stage, format!("{:#}", e)))
                    .await
            }
        }
    }

    /// Run every stage in order
    ///
    /// Only initial generation is fatal; the remaining stages log and move on.
    pub async fn run_full_pipeline(&self, state: &mut RunState) -> Result<bool> {
        info!("Starting full test generation pipeline...");

        let initial = self.generate_initial_tests(state).await?;
        if !initial.is_success() {
            error!("Initial test generation failed");
            return Ok(false);
        }

        let refine = self.refine_tests(state).await;
        if !self.soften(state, StageKind::Refinement, refine).await.is_success() {
            warn!("Test refinement failed, continuing with original tests");
        }

        let build = self.build_tests(state).await?;
        if !build.success {
            warn!("Build failed, attempting to fix...");
            let fix = self.fix_build_issues(state, &build.output).await;
            self.soften(state, StageKind::BuildFix, fix).await;
            error!("Could not fix build issues automatically");
        }

        if let Some(coverage) = self.run_coverage_analysis(state).await {
            let improve = self.improve_coverage(state, &coverage).await;
            self.soften(state, StageKind::CoverageImprovement, improve).await;
        }

        self.generate_report(state).await?;

        info!("Test generation pipeline completed successfully");
        Ok(true)
    }

    async fn run_step(&self, step: PipelineStep, state: &mut RunState) -> Result<bool> {
        match step {
            PipelineStep::Initial => Ok(self.generate_initial_tests(state).await?.is_success()),
            PipelineStep::Refine => Ok(self.refine_tests(state).await?.is_success()),
            PipelineStep::Build => Ok(self.build_tests(state).await?.success),
            PipelineStep::Coverage => {
                let coverage = self.run_coverage_analysis(state).await.unwrap_or_default();
                Ok(self.improve_coverage(state, &coverage).await?.is_success())
            }
            PipelineStep::Full => self.run_full_pipeline(state).await,
        }
    }

    /// Execute the selected step and return the recorded run state
    pub async fn run(&self, step: PipelineStep) -> RunState {
        let mut state = RunState::new(step);
        state.start();
        info!("Starting run {} (step: {})", state.run_id, step);
        self.emit_event(GenerationEvent::RunStarted {
            run_id: state.run_id,
            step,
        })
        .await;

        match self.run_step(step, &mut state).await {
            Ok(success) => state.finish(success),
            Err(e) => {
                error!("Run failed: {:#}", e);
                state.abort(format!("{:#}", e));
            }
        }

        if state.is_success() {
            info!("Operation completed successfully");
        } else {
            error!("Operation failed");
        }

        self.emit_event(GenerationEvent::RunFinished {
            run_id: state.run_id,
            status: state.status,
        })
        .await;
        state
    }
}
