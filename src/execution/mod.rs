//! Stage execution: generator, CMake project, build runner and report

pub mod build;
pub mod cmake;
pub mod generator;
pub mod report;

pub use build::BuildRunner;
pub use cmake::{render_cmake_lists, TEST_EXECUTABLE};
pub use generator::{EventHandler, GenerationEvent, TestGenerator};
pub use report::{render_report, REPORT_FILE};
