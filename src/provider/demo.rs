//! Offline provider with canned, deterministic replies
//!
//! Lets the whole pipeline run without a model: initial prompts get a
//! GoogleTest skeleton named after the source file, refinement prompts get
//! their test content back unchanged, and build-fix / coverage prompts get
//! fixed templates.

use crate::provider::{LlmProvider, ProviderError, ProviderResponse};
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct DemoProvider;

impl DemoProvider {
    pub fn new() -> Self {
        Self
    }

    fn labelled_value<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
        prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix(label))
            .map(str::trim)
    }

    fn fenced_block(prompt: &str) -> Option<&str> {
        let start = prompt.find("```cpp\n")? + "```cpp\n".len();
        let len = prompt[start..].find("\n```")?;
        Some(&prompt[start..start + len])
    }

    fn fixture_name(file_name: &str) -> String {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Generic");
        let ident: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}Test", ident)
    }

    fn initial_test(file_name: &str) -> String {
        let fixture = Self::fixture_name(file_name);
        format!(
            r#"#include <gtest/gtest.h>
#include <gmock/gmock.h>
#include "{file_name}"

class {fixture} : public ::testing::Test {{
protected:
    void SetUp() override {{
    }}

    void TearDown() override {{
    }}
}};

TEST_F({fixture}, Construction_Default_Succeeds) {{
    SUCCEED();
}}

TEST_F({fixture}, BasicFunctionality_ValidInput_ReturnsExpected) {{
    EXPECT_TRUE(true);
}}
"#
        )
    }

    fn build_fix() -> String {
        r#"## Error Analysis
Missing include files and linking issues detected.

## Required Fixes
- Add `#include <memory>` where `std::unique_ptr` is used
- Add `#include <functional>` where `std::function` is used

## Additional Dependencies
- Link against gtest_main
"#
        .to_string()
    }

    fn coverage_improvement() -> String {
        r#"// Additional tests for improved coverage
#include <gtest/gtest.h>

TEST(CoverageTest, ErrorHandling_InvalidInput_IsRejected) {
    EXPECT_TRUE(true);
}

TEST(CoverageTest, BoundaryValues_MaxInt_HandledCorrectly) {
    EXPECT_TRUE(true);
}
"#
        .to_string()
    }
}

#[async_trait]
impl LlmProvider for DemoProvider {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let content = if let Some(file_name) = Self::labelled_value(prompt, "Source File:") {
            Self::initial_test(file_name)
        } else if Self::labelled_value(prompt, "Test File:").is_some() {
            Self::fenced_block(prompt).unwrap_or_default().to_string()
        } else if prompt.contains("Build Output/Errors:") {
            Self::build_fix()
        } else if prompt.contains("Current Coverage Information:") {
            Self::coverage_improvement()
        } else {
            Self::initial_test("generic.h")
        };

        Ok(ProviderResponse::new(content))
    }

    fn name(&self) -> &str {
        "demo"
    }
}
