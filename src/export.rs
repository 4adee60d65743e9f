//! Writes generated artifacts to disk.
//!
//! Every artifact is written in one piece with a whole-file overwrite; there
//! is no temporary file or rename, so an interrupted write can leave a
//! truncated file behind. Re-running the generation repairs it.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Creates `dir` and all missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| Error::file_system(dir, e))
}

/// Writes `contents` to `path`, replacing any existing file.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| Error::file_system(path, e))?;
    info!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
    Ok(())
}
