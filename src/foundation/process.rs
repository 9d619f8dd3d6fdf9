use std::{
    path::Path,
    process::{Command, Stdio},
};

/// Return `true` when `bin` can be invoked from `PATH`.
///
/// `version_flag` is whatever makes the tool print its version and exit zero.
pub fn is_tool_on_path(bin: &str, version_flag: &str) -> bool {
    Command::new(bin)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> crate::ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Owns a scratch file and removes it on drop.
pub(crate) struct TempFileGuard(pub(crate) Option<std::path::PathBuf>);

impl TempFileGuard {
    /// Stop tracking the file so it survives the guard.
    pub(crate) fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
