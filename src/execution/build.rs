//! Build runner - drives cmake and the test binary as subprocesses

use crate::core::{BuildOutcome, CoverageInfo};
use crate::execution::cmake::TEST_EXECUTABLE;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub const CONFIGURE_TIMEOUT_SECS: u64 = 300;
pub const BUILD_TIMEOUT_SECS: u64 = 600;
pub const TEST_TIMEOUT_SECS: u64 = 300;

/// Why a subprocess produced no usable output
#[derive(Debug)]
enum RunFailure {
    Spawn(std::io::Error),
    Timeout(u64),
}

impl RunFailure {
    fn describe(&self, what: &str) -> String {
        match self {
            RunFailure::Spawn(e) => format!("Failed to run {}: {}", what, e),
            RunFailure::Timeout(_) => format!("{} process timed out", what),
        }
    }
}

/// Children run with the build dir as cwd, so relative paths are resolved
/// against ours before spawning
fn anchor(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// A bare program name is left for `PATH` lookup
fn anchor_program(program: String) -> String {
    let path = Path::new(&program);
    if path.is_relative() && path.components().count() > 1 {
        anchor(path).to_string_lossy().into_owned()
    } else {
        program
    }
}

/// Runs cmake configure/build in `<output_dir>/build`
#[derive(Debug, Clone)]
pub struct BuildRunner {
    cmake_program: String,
    build_dir: PathBuf,
    configure_timeout_secs: u64,
    build_timeout_secs: u64,
    test_timeout_secs: u64,
}

impl BuildRunner {
    pub fn new(cmake_program: impl Into<String>, output_dir: &Path) -> Self {
        Self {
            cmake_program: anchor_program(cmake_program.into()),
            build_dir: anchor(&output_dir.join("build")),
            configure_timeout_secs: CONFIGURE_TIMEOUT_SECS,
            build_timeout_secs: BUILD_TIMEOUT_SECS,
            test_timeout_secs: TEST_TIMEOUT_SECS,
        }
    }

    pub fn with_timeouts(mut self, configure_secs: u64, build_secs: u64, test_secs: u64) -> Self {
        self.configure_timeout_secs = configure_secs;
        self.build_timeout_secs = build_secs;
        self.test_timeout_secs = test_secs;
        self
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn test_executable(&self) -> PathBuf {
        self.build_dir.join(TEST_EXECUTABLE)
    }

    async fn run(
        &self,
        program: &Path,
        args: &[&str],
        timeout_secs: u64,
    ) -> Result<Output, RunFailure> {
        debug!("Running {} {:?} in {}", program.display(), args, self.build_dir.display());

        timeout(
            Duration::from_secs(timeout_secs),
            Command::new(program)
                .args(args)
                .current_dir(&self.build_dir)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| RunFailure::Timeout(timeout_secs))?
        .map_err(RunFailure::Spawn)
    }

    /// Configure and build; a failed step is reported in the outcome
    pub async fn build(&self) -> std::io::Result<BuildOutcome> {
        tokio::fs::create_dir_all(&self.build_dir).await?;
        let cmake = PathBuf::from(&self.cmake_program);

        let configure = match self
            .run(&cmake, &["..", "-DCMAKE_BUILD_TYPE=Debug"], self.configure_timeout_secs)
            .await
        {
            Ok(output) => output,
            Err(failure) => {
                error!("CMake configuration could not run: {:?}", failure);
                return Ok(BuildOutcome::failure(failure.describe("CMake configure")));
            }
        };

        if !configure.status.success() {
            error!("CMake configuration failed");
            return Ok(BuildOutcome::failure(
                String::from_utf8_lossy(&configure.stderr).into_owned(),
            ));
        }

        let build = match self
            .run(&cmake, &["--build", "."], self.build_timeout_secs)
            .await
        {
            Ok(output) => output,
            Err(failure) => {
                error!("Build could not run: {:?}", failure);
                return Ok(BuildOutcome::failure(failure.describe("Build")));
            }
        };

        let output = format!(
            "{}\n{}",
            String::from_utf8_lossy(&build.stdout),
            String::from_utf8_lossy(&build.stderr)
        );

        if build.status.success() {
            info!("Tests built successfully");
            Ok(BuildOutcome::success(output))
        } else {
            error!(
                "Build failed with exit code {}",
                build.status.code().unwrap_or(-1)
            );
            Ok(BuildOutcome::failure(output))
        }
    }

    /// Run the built test binary; `None` when it does not exist or cannot run
    pub async fn run_tests(&self) -> Option<CoverageInfo> {
        let executable = self.test_executable();
        if !executable.is_file() {
            error!("Test executable not found: {}", executable.display());
            return None;
        }

        match self.run(&executable, &[], self.test_timeout_secs).await {
            Ok(output) => {
                let info = CoverageInfo::from_test_run(
                    output.status.success(),
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                );
                info!("Tests {}", if info.test_success { "passed" } else { "failed" });
                Some(info)
            }
            Err(failure) => {
                warn!("Coverage analysis error: {}", failure.describe("Test binary"));
                None
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_build_success() {
        let dir = tempfile::tempdir().unwrap();
        let cmake = dir.path().join("fake-cmake");
        write_script(&cmake, "echo \"cmake $@\"\nexit 0");

        let runner = BuildRunner::new(cmake.to_string_lossy(), dir.path());
        let outcome = runner.build().await.unwrap();

        assert!(outcome.success);
        assert!(outcome.output.contains("cmake --build ."));
        assert!(runner.build_dir().is_dir());
    }

    #[tokio::test]
    async fn test_configure_failure_returns_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let cmake = dir.path().join("fake-cmake");
        write_script(&cmake, "echo 'Could not find GTest' >&2\nexit 1");

        let outcome = BuildRunner::new(cmake.to_string_lossy(), dir.path())
            .build()
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.output.contains("Could not find GTest"));
    }

    #[tokio::test]
    async fn test_build_failure_returns_combined_output() {
        let dir = tempfile::tempdir().unwrap();
        let cmake = dir.path().join("fake-cmake");
        write_script(
            &cmake,
            "if [ \"$1\" = \"--build\" ]; then\n\
             echo 'compiling'; echo 'error: no member' >&2; exit 2\n\
             fi\nexit 0",
        );

        let outcome = BuildRunner::new(cmake.to_string_lossy(), dir.path())
            .build()
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.output.contains("compiling"));
        assert!(outcome.output.contains("error: no member"));
    }

    #[tokio::test]
    async fn test_missing_cmake_is_a_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = BuildRunner::new("/nonexistent/cmake-binary", dir.path())
            .build()
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.output.contains("Failed to run CMake configure"));
    }

    #[tokio::test]
    async fn test_configure_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let cmake = dir.path().join("slow-cmake");
        write_script(&cmake, "sleep 5");

        let outcome = BuildRunner::new(cmake.to_string_lossy(), dir.path())
            .with_timeouts(1, 1, 1)
            .build()
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_run_tests_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BuildRunner::new("cmake", dir.path());
        assert!(runner.run_tests().await.is_none());

        std::fs::create_dir_all(runner.build_dir()).unwrap();
        write_script(
            &runner.test_executable(),
            "echo '[  PASSED  ] 3 tests.'\necho 'warning' >&2\nexit 0",
        );

        let info = runner.run_tests().await.unwrap();
        assert!(info.test_success);
        assert_eq!(info.tests_passed, Some(3));
        assert_eq!(info.test_errors.trim(), "warning");
    }

    #[test]
    fn test_bare_program_name_is_left_for_path_lookup() {
        assert_eq!(anchor_program("cmake".to_string()), "cmake");
        assert_eq!(anchor_program("/usr/bin/cmake".to_string()), "/usr/bin/cmake");

        let anchored = anchor_program("./tools/cmake".to_string());
        assert!(Path::new(&anchored).is_absolute());
        assert!(anchored.ends_with("tools/cmake"));
    }

    #[tokio::test]
    async fn test_relative_paths_resolve_from_the_caller_cwd() {
        let scratch = tempfile::tempdir_in(env!("CARGO_MANIFEST_DIR")).unwrap();
        let name = scratch.path().file_name().unwrap().to_owned();
        let relative = Path::new(&name);

        std::fs::create_dir_all(relative.join("tools")).unwrap();
        write_script(
            &relative.join("tools/cmake"),
            r#"if [ "$1" = "--build" ]; then
  printf '#!/bin/sh\necho "[  PASSED  ] 2 tests."\n' > run_tests
  chmod +x run_tests
fi
exit 0"#,
        );

        let runner = BuildRunner::new(
            relative.join("tools/cmake").to_string_lossy(),
            &relative.join("out"),
        );
        assert!(runner.build_dir().is_absolute());

        let outcome = runner.build().await.unwrap();
        assert!(outcome.success, "{}", outcome.output);

        let info = runner.run_tests().await.unwrap();
        assert!(info.test_success);
        assert_eq!(info.tests_passed, Some(2));
    }
}
