//! Markdown report of a generator run

use crate::core::{GeneratorConfig, RunState, StageKind, StageStatus};
use chrono::{DateTime, Local};

pub const REPORT_FILE: &str = "test_generation_report.md";

const STAGE_ORDER: [StageKind; 6] = [
    StageKind::InitialGeneration,
    StageKind::Refinement,
    StageKind::Build,
    StageKind::BuildFix,
    StageKind::CoverageAnalysis,
    StageKind::CoverageImprovement,
];

fn stage_line(index: usize, state: &RunState, kind: StageKind) -> String {
    match state.stage(kind) {
        Some(outcome) => {
            let mark = match outcome.status {
                StageStatus::Succeeded => "✅",
                StageStatus::Failed => "❌",
            };
            format!("{}. {} {}: {}", index, mark, kind.label(), outcome.detail)
        }
        None => format!("{}. ⏭️ {}: not run", index, kind.label()),
    }
}

/// Render the report for a run
///
/// `test_files` is the list of `test_*.cpp` files currently in the output
/// directory, which may include files from earlier runs.
pub fn render_report(
    config: &GeneratorConfig,
    state: &RunState,
    test_files: &[String],
    generated_on: DateTime<Local>,
) -> String {
    let file_list = test_files
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n");

    let stages = STAGE_ORDER
        .iter()
        .enumerate()
        .map(|(i, kind)| stage_line(i + 1, state, *kind))
        .collect::<Vec<_>>()
        .join("\n");

    let usage = if state.usage.total_tokens > 0 {
        format!(
            "- **Prompt Tokens**: {}\n- **Completion Tokens**: {}\n- **Total Tokens**: {}",
            state.usage.prompt_tokens, state.usage.completion_tokens, state.usage.total_tokens
        )
    } else {
        "- Not reported by the provider".to_string()
    };

    format!(
        r#"
# C++ Unit Test Generation Report

## Summary
- **Run ID**: {run_id}
- **Project Path**: {project}
- **Output Directory**: {output}
- **Model Used**: {provider} - {model}
- **Step**: {step}
- **Generated Test Files**: {count}

## Generated Test Files
{file_list}

## Test Generation Process
{stages}

## Token Usage
{usage}

## Recommendations
- Review generated tests for accuracy
- Run tests manually to verify functionality
- Adjust test parameters based on specific requirements
- Consider integrating with CI/CD pipeline

## Files Generated
- Test source files: {count} files
- CMakeLists.txt for building tests
- Coverage improvement suggestions
- This report

Generated on: {timestamp}
"#,
        run_id = state.run_id,
        project = config.project_path.display(),
        output = config.output_dir.display(),
        provider = config.provider.kind,
        model = config.provider.model,
        step = state.step,
        count = test_files.len(),
        timestamp = generated_on.format("%Y-%m-%d %H:%M:%S"),
    )
}
