//! Small filesystem helpers shared by the workspace binaries.

use std::fs;
use std::path::Path;

use log::info;

/// Create `path` and any missing parents, logging only when something was
/// actually created.
pub fn create_dir_all(path: &str) -> std::io::Result<()> {
    let target = Path::new(path);
    if !target.exists() {
        fs::create_dir_all(target)?;
        info!("Created directory: {}", target.display());
    }
    Ok(())
}

/// Check whether a path exists at all.
pub fn path_exists(path: &str) -> bool {
    Path::new(path).exists()
}
