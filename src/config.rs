use std::env;
use std::path::{Path, PathBuf};

// --- Generation Defaults ---
/// Artifact base name used when the caller does not provide one.
pub const DEFAULT_ARTIFACT_NAME: &str = "PDTCTC";
/// Name of the emitted prediction function.
pub const DEFAULT_FUNCTION_NAME: &str = "DTC_Predict";
/// Prefix of every per-node label in the emitted source (`NODE_<id>`).
pub const NODE_LABEL_PREFIX: &str = "NODE_";

// --- Harness / Build Configuration ---
/// Appended to the artifact name for the harness source and executable.
pub const TESTER_SUFFIX: &str = "_Tester";
/// Size of the line buffer in the generated harness (`fgets` chunk).
pub const HARNESS_LINE_BUFFER: usize = 4096;
/// Language standard passed to the external compiler.
pub const C_STANDARD_FLAG: &str = "-std=c99";
/// Compiler used when neither the options nor `$CC` name one.
pub const DEFAULT_COMPILER: &str = "gcc";

/// Where and under which names the generated artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Base name of the artifacts (`<name>.h`, `<name>.c`, `<name>_Tester.c`).
    pub name: String,
    /// Destination directory, created recursively if absent.
    pub out_dir: PathBuf,
    /// Name of the emitted prediction function.
    pub function_name: String,
    /// External C compiler used by the optional build step.
    pub compiler: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_ARTIFACT_NAME.to_string(),
            out_dir: PathBuf::from("."),
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            compiler: env::var("CC").unwrap_or_else(|_| DEFAULT_COMPILER.to_string()),
        }
    }
}

impl GenerationOptions {
    pub fn new(name: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    pub fn header_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.h", self.name))
    }

    pub fn source_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.c", self.name))
    }

    pub fn tester_source_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}{}.c", self.name, TESTER_SUFFIX))
    }

    pub fn tester_executable_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}{}", self.name, TESTER_SUFFIX))
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_follow_name_and_directory() {
        let options = GenerationOptions::new("Model", "out/code");
        assert_eq!(options.header_path(), PathBuf::from("out/code/Model.h"));
        assert_eq!(options.source_path(), PathBuf::from("out/code/Model.c"));
        assert_eq!(options.tester_source_path(), PathBuf::from("out/code/Model_Tester.c"));
        assert_eq!(options.tester_executable_path(), PathBuf::from("out/code/Model_Tester"));
    }

    #[test]
    fn defaults_use_placeholder_name_and_current_dir() {
        let options = GenerationOptions::default();
        assert_eq!(options.name, DEFAULT_ARTIFACT_NAME);
        assert_eq!(options.function_name, DEFAULT_FUNCTION_NAME);
        assert_eq!(options.out_dir, PathBuf::from("."));
    }
}
