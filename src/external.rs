//! Best-effort invocation of an external C compiler on the generated sources.
//!
//! Nothing in here returns an error: a missing toolchain or a failed compile
//! is logged and reported through [`BuildOutcome`], and the generated source
//! files stay on disk untouched.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use tracing::{info, warn};

use crate::config::{GenerationOptions, C_STANDARD_FLAG};

/// Result of the optional build step.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The executable was produced at this path.
    Built(PathBuf),
    /// The compiler ran but exited unsuccessfully.
    Failed { status: ExitStatus, stderr: String },
    /// The compiler could not be started at all.
    ToolchainMissing { compiler: String, reason: String },
}

impl BuildOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, BuildOutcome::Built(_))
    }
}

/// Compiles `<name>_Tester.c` and `<name>.c` into `<name>_Tester`.
///
/// Equivalent to
/// `cc -o <dir>/<name>_Tester <dir>/<name>_Tester.c <dir>/<name>.c -w -std=c99`.
/// Blocks until the compiler exits; there is no timeout.
pub fn compile_tester(options: &GenerationOptions) -> BuildOutcome {
    let executable = options.tester_executable_path();
    let mut cmd = Command::new(&options.compiler);
    cmd.arg("-o")
        .arg(&executable)
        .arg(options.tester_source_path())
        .arg(options.source_path())
        .arg("-w")
        .arg(C_STANDARD_FLAG);

    info!(compiler = %options.compiler, output = %executable.display(), "Compiling test harness");
    match cmd.output() {
        Ok(output) if output.status.success() => {
            info!(path = %executable.display(), "Test harness compiled");
            BuildOutcome::Built(executable)
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(status = %output.status, "Compiler failed; generated sources were kept");
            if !stderr.is_empty() {
                warn!("Compiler error:\n{}", stderr);
            }
            BuildOutcome::Failed {
                status: output.status,
                stderr,
            }
        }
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                warn!(compiler = %options.compiler, "Compiler not found; generated sources were kept");
            } else {
                warn!(compiler = %options.compiler, error = %e, "Failed to run compiler; generated sources were kept");
            }
            BuildOutcome::ToolchainMissing {
                compiler: options.compiler.clone(),
                reason: e.to_string(),
            }
        }
    }
}
