//! CLI output formatting

use crate::{
    core::{RunState, RunStatus, SourceFile, StageOutcome},
    execution::GenerationEvent,
    persistence::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static FILE: Emoji<'_, '_> = Emoji("📄 ", "- ");

const DEFAULT_WIDTH: usize = 60;

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// A horizontal rule sized to the terminal
pub fn separator() -> String {
    let width = term_size::dimensions()
        .map(|(w, _)| w.min(100))
        .unwrap_or(DEFAULT_WIDTH);
    style("─".repeat(width)).dim().to_string()
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Format a stored run for the history listing
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Completed => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running => SPINNER,
        RunStatus::Pending => INFO,
    };

    format!(
        "{} {} - {} - {} {} - {} ({} files, {}/{} stages) - {}",
        status_icon,
        style(short_id(&summary.run_id)).dim(),
        style(summary.started_at.format("%Y-%m-%d %H:%M")).dim(),
        style(&summary.step).cyan(),
        style(&summary.project_path).bold(),
        format_status(summary.status),
        summary.files_generated,
        summary.stages_succeeded,
        summary.stages_run,
        style(format!("{}/{}", summary.provider, summary.model)).dim(),
    )
}

/// Format one stage outcome line
pub fn format_stage_outcome(outcome: &StageOutcome) -> String {
    let icon = if outcome.is_success() { CHECK } else { CROSS };
    format!(
        "{} {}: {}",
        icon,
        style(outcome.stage.label()).bold(),
        outcome.detail
    )
}

/// Format the end-of-run summary block
pub fn format_run_state(state: &RunState) -> String {
    let mut lines = vec![separator()];
    lines.push(format!(
        "Run {} ({}) {}",
        style(short_id(&state.run_id)).dim(),
        style(state.step).cyan(),
        format_status(state.status)
    ));
    for outcome in &state.stages {
        lines.push(format!("  {}", format_stage_outcome(outcome)));
    }
    if !state.generated_files.is_empty() {
        lines.push(format!(
            "  {}{} test files written",
            FILE,
            style(state.generated_files.len()).cyan()
        ));
    }
    if state.usage.total_tokens > 0 {
        lines.push(format!(
            "  Tokens: {} prompt, {} completion",
            state.usage.prompt_tokens, state.usage.completion_tokens
        ));
    }
    if let Some(error) = &state.error {
        lines.push(format!("  {}{}", WARN, style(error).red()));
    }
    lines.join("\n")
}

/// Format a scanned source file
pub fn format_source_file(source: &SourceFile) -> String {
    format!(
        "{}{} {}",
        FILE,
        source.relative_path.display(),
        style(format!("→ {}", source.test_file_name())).dim()
    )
}

/// Format a generation event for display
///
/// Returns `None` for events the progress bar already reflects.
pub fn format_generation_event(event: &GenerationEvent) -> Option<String> {
    match event {
        GenerationEvent::RunStarted { run_id, step } => Some(format!(
            "{} Starting {} run ({})",
            ROCKET,
            style(step).bold(),
            style(short_id(run_id)).dim()
        )),
        GenerationEvent::StageStarted { stage, total } => {
            if *total > 0 {
                Some(format!(
                    "{} {} ({} files)",
                    SPINNER,
                    style(stage.label()).cyan(),
                    total
                ))
            } else {
                Some(format!("{} {}", SPINNER, style(stage.label()).cyan()))
            }
        }
        GenerationEvent::FileWritten { .. } => None,
        GenerationEvent::FileSkipped { file, reason, .. } => Some(format!(
            "{} Skipped {} ({})",
            WARN,
            style(file).yellow(),
            reason
        )),
        GenerationEvent::FileFailed { file, error, .. } => Some(format!(
            "{} {}: {}",
            CROSS,
            style(file).red(),
            style(error).dim()
        )),
        GenerationEvent::BuildFinished { outcome } => {
            if outcome.success {
                Some(format!("{} Tests built", CHECK))
            } else {
                Some(format!(
                    "{} Build failed:\n{}",
                    CROSS,
                    format_output(&outcome.output, 10)
                ))
            }
        }
        GenerationEvent::StageFinished { outcome } => Some(format_stage_outcome(outcome)),
        GenerationEvent::RunFinished { run_id, status } => Some(format!(
            "{} Run ({}) {}",
            INFO,
            style(short_id(run_id)).dim(),
            format_status(*status)
        )),
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.trim().lines().collect();

    if lines.len() <= max_lines {
        lines.join("\n")
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Console handler for generation events
///
/// Per-file stages get a progress bar; other events print a line.
#[derive(Default)]
pub struct EventPrinter {
    progress: Mutex<Option<ProgressBar>>,
}

impl EventPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, bar: Option<&ProgressBar>, line: String) {
        match bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    pub fn handle(&self, event: &GenerationEvent) {
        let Ok(mut progress) = self.progress.lock() else {
            return;
        };

        match event {
            GenerationEvent::StageStarted { total, .. } if *total > 0 => {
                if let Some(line) = format_generation_event(event) {
                    println!("{}", line);
                }
                *progress = Some(create_progress_bar(*total));
            }
            GenerationEvent::FileWritten { output, .. } => {
                if let Some(bar) = progress.as_ref() {
                    bar.set_message(output.clone());
                    bar.inc(1);
                }
            }
            GenerationEvent::FileSkipped { .. } | GenerationEvent::FileFailed { .. } => {
                if let Some(line) = format_generation_event(event) {
                    self.print(progress.as_ref(), line);
                }
                if let Some(bar) = progress.as_ref() {
                    bar.inc(1);
                }
            }
            GenerationEvent::StageFinished { .. } => {
                if let Some(bar) = progress.take() {
                    bar.finish_and_clear();
                }
                if let Some(line) = format_generation_event(event) {
                    println!("{}", line);
                }
            }
            _ => {
                if let Some(line) = format_generation_event(event) {
                    self.print(progress.as_ref(), line);
                }
            }
        }
    }
}
