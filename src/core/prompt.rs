//! Prompt rendering for each stage

use crate::core::{CoverageInfo, InstructionSet};

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

/// Prompt asking for an initial test file for one source file
pub fn initial_test_prompt(
    instructions: &InstructionSet,
    file_name: &str,
    source_code: &str,
) -> String {
    format!(
        r#"
{objective}

Source File: {file_name}
Source Code:
```cpp
{source_code}
```

Requirements:
{requirements}

Output Format:
{output_format}

Constraints:
{constraints}

Example Structure:
{example_structure}

Please generate comprehensive unit tests for this C++ file following the above requirements.
"#,
        objective = instructions.objective,
        requirements = bullets(&instructions.requirements),
        output_format = instructions.output_format,
        constraints = bullets(&instructions.constraints),
        example_structure = instructions.example_structure,
    )
}

/// Prompt asking to refine an existing generated test file
pub fn refinement_prompt(
    instructions: &InstructionSet,
    file_name: &str,
    test_content: &str,
) -> String {
    format!(
        r#"
{objective}

Test File: {file_name}
Current Test Content:
```cpp
{test_content}
```

Refinement Tasks:
{tasks}

Quality Checks:
{checks}

Please refine these unit tests according to the above requirements.
"#,
        objective = instructions.objective,
        tasks = bullets(&instructions.refinement_tasks),
        checks = bullets(&instructions.quality_checks),
    )
}

/// Prompt asking for fixes to a failed build
pub fn build_fix_prompt(instructions: &InstructionSet, build_output: &str) -> String {
    format!(
        r#"
{objective}

Build Output/Errors:
```
{build_output}
```

Analysis Steps:
{steps}

Fix Priorities:
{priorities}

Please analyze the build errors and provide specific fixes following the response structure.
"#,
        objective = instructions.objective,
        steps = bullets(&instructions.analysis_steps),
        priorities = numbered(&instructions.fix_priorities),
    )
}

/// Prompt asking for additional tests based on a test run
pub fn coverage_improvement_prompt(
    instructions: &InstructionSet,
    coverage: &CoverageInfo,
) -> String {
    format!(
        r#"
{objective}

Current Coverage Information:
- Test Success: {success}
- Test Output: {output}
- Test Errors: {errors}

Coverage Analysis Tasks:
{analysis}

Improvement Strategies:
{strategies}

Please generate additional test methods to improve coverage.
"#,
        objective = instructions.objective,
        success = coverage.test_success,
        output = or_placeholder(&coverage.test_output, "No output"),
        errors = or_placeholder(&coverage.test_errors, "No errors"),
        analysis = bullets(&instructions.coverage_analysis),
        strategies = bullets(&instructions.improvement_strategies),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instructions() -> InstructionSet {
        InstructionSet {
            role: "You are a C++ testing expert".to_string(),
            objective: "Generate unit tests".to_string(),
            requirements: vec!["Use Google Test".to_string(), "Mock dependencies".to_string()],
            output_format: "One .cpp file".to_string(),
            constraints: vec!["Compile with C++17".to_string()],
            example_structure: "TEST(A, B) {}".to_string(),
            refinement_tasks: vec!["Remove duplicates".to_string()],
            quality_checks: vec!["Meaningful assertions".to_string()],
            analysis_steps: vec!["Read the first error".to_string()],
            fix_priorities: vec!["Missing includes".to_string(), "Linker errors".to_string()],
            coverage_analysis: vec!["Find untested branches".to_string()],
            improvement_strategies: vec!["Boundary values".to_string()],
        }
    }

    #[test]
    fn test_initial_prompt_layout() {
        let prompt = initial_test_prompt(&instructions(), "Person.h", "class Person {};");

        assert!(prompt.starts_with("\nGenerate unit tests\n"));
        assert!(prompt.contains("Source File: Person.h\n"));
        assert!(prompt.contains("```cpp\nclass Person {};\n```"));
        assert!(prompt.contains("Requirements:\n- Use Google Test\n- Mock dependencies\n"));
        assert!(prompt.contains("Output Format:\nOne .cpp file\n"));
        assert!(prompt.contains("Constraints:\n- Compile with C++17\n"));
        assert!(prompt.contains("Example Structure:\nTEST(A, B) {}\n"));
    }

    #[test]
    fn test_refinement_prompt_includes_tasks_and_checks() {
        let prompt = refinement_prompt(&instructions(), "test_Person.cpp", "TEST(P, Q) {}");

        assert!(prompt.contains("Test File: test_Person.cpp"));
        assert!(prompt.contains("Current Test Content:\n```cpp\nTEST(P, Q) {}\n```"));
        assert!(prompt.contains("Refinement Tasks:\n- Remove duplicates"));
        assert!(prompt.contains("Quality Checks:\n- Meaningful assertions"));
    }

    #[test]
    fn test_build_fix_priorities_are_numbered_from_one() {
        let prompt = build_fix_prompt(&instructions(), "error: 'memory' file not found");

        assert!(prompt.contains("```\nerror: 'memory' file not found\n```"));
        assert!(prompt.contains("Fix Priorities:\n1. Missing includes\n2. Linker errors\n"));
        assert!(prompt.contains("Analysis Steps:\n- Read the first error"));
    }

    #[test]
    fn test_coverage_prompt_uses_placeholders_for_empty_output() {
        let prompt = coverage_improvement_prompt(&instructions(), &CoverageInfo::default());

        assert!(prompt.contains("- Test Success: false"));
        assert!(prompt.contains("- Test Output: No output"));
        assert!(prompt.contains("- Test Errors: No errors"));
        assert!(prompt.contains("Improvement Strategies:\n- Boundary values"));
    }

    #[test]
    fn test_empty_lists_render_empty_sections() {
        let minimal = InstructionSet {
            role: "r".to_string(),
            objective: "o".to_string(),
            ..InstructionSet::default()
        };
        let prompt = build_fix_prompt(&minimal, "boom");
        assert!(prompt.contains("Fix Priorities:\n\n"));
    }
}
