//! CMakeLists.txt generation for the generated tests

use std::path::Path;

/// Name of the test executable the generated project builds
pub const TEST_EXECUTABLE: &str = "run_tests";

/// Render a CMake project that compiles every test file into one binary
///
/// The project root is added as an include directory so generated tests
/// can include the sources they target by relative path.
pub fn render_cmake_lists(project_path: &Path, test_files: &[String]) -> String {
    let sources = test_files
        .iter()
        .map(|f| format!("    {}", f))
        .collect::<Vec<_>>()
        .join("\n");
    let include_dir = project_path.to_string_lossy().replace('\\', "/");

    format!(
        r#"cmake_minimum_required(VERSION 3.10)
project(UnitTests CXX)

set(CMAKE_CXX_STANDARD 17)
set(CMAKE_CXX_STANDARD_REQUIRED ON)

# Find packages
find_package(GTest REQUIRED)
find_package(GMock REQUIRED)

# Include directories
include_directories(${{GTEST_INCLUDE_DIRS}})
include_directories(${{GMOCK_INCLUDE_DIRS}})
include_directories("{include_dir}")

# Test executable
add_executable({TEST_EXECUTABLE}
{sources}
)

# Link libraries
target_link_libraries({TEST_EXECUTABLE}
    ${{GTEST_LIBRARIES}}
    ${{GMOCK_LIBRARIES}}
    pthread
)

# Enable testing
enable_testing()
add_test(NAME unit_tests COMMAND {TEST_EXECUTABLE})
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_lists_every_test_file() {
        let files = vec!["test_Person.cpp".to_string(), "test_User.cpp".to_string()];
        let cmake = render_cmake_lists(&PathBuf::from("/src/orgChartApi"), &files);

        assert!(
            cmake.contains("add_executable(run_tests\n    test_Person.cpp\n    test_User.cpp\n)")
        );
        assert!(cmake.contains("include_directories(\"/src/orgChartApi\")"));
        assert!(cmake.contains("include_directories(${GTEST_INCLUDE_DIRS})"));
        assert!(cmake.contains("add_test(NAME unit_tests COMMAND run_tests)"));
    }

    #[test]
    fn test_starts_with_minimum_version() {
        let cmake = render_cmake_lists(Path::new("."), &[]);
        assert!(cmake.starts_with("cmake_minimum_required(VERSION 3.10)"));
    }
}
