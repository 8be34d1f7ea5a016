//! Shared fixtures for generator integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use testgen::core::{GeneratorConfig, Settings};
use testgen::provider::{LlmProvider, ProviderError, ProviderKind, ProviderResponse, TokenUsage};

/// One scripted provider reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Provider that returns scripted replies in order and records every prompt
///
/// Once the script runs out it answers with a fixed test body.
#[derive(Clone, Default)]
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
    usage: Option<TokenUsage>,
}

pub const FALLBACK_REPLY: &str = "TEST(Fallback, Works) { EXPECT_TRUE(true); }";

impl MockProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// (prompt, system prompt) pairs in call order
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), system_prompt.to_string()));

        let reply = self.replies.lock().unwrap().pop_front();
        let content = match reply {
            Some(Reply::Text(text)) => text,
            Some(Reply::Fail(message)) => return Err(ProviderError::Network(message)),
            None => FALLBACK_REPLY.to_string(),
        };

        let response = ProviderResponse::new(content);
        Ok(match self.usage {
            Some(usage) => response.with_usage(usage),
            None => response,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Write `files` (relative path, content) under `root`
pub fn write_project(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

/// Directory holding the shipped instruction files
pub fn instructions_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// Config for a scratch project, using the shipped instructions
pub fn config_for(project: &Path, output: &Path) -> GeneratorConfig {
    let cli = Settings {
        project_path: Some(project.to_path_buf()),
        output_dir: Some(output.to_path_buf()),
        provider: Some(ProviderKind::Demo),
        instructions_dir: Some(instructions_dir()),
        ..Settings::default()
    };
    GeneratorConfig::resolve(Settings::default(), cli, |_| None).unwrap()
}

/// Write an executable shell script (Unix only)
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
