use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

/// Append-only text file that receives one block per chapter attempt.
///
/// The file is opened for each block and closed again, so a crash loses at
/// most the block being written.
#[derive(Debug, Clone)]
pub struct OutputLog {
    path: PathBuf,
}

impl OutputLog {
    /// Creates an empty file if none exists. Existing content is left alone.
    pub fn create_if_missing(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent_dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent_dir)
                .with_context(|| format!("create output dir: {}", parent_dir.display()))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("create output log: {}", path.display()))?;

        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, block: &str) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open output log: {}", self.path.display()))?;
        file.write_all(block.as_bytes())
            .with_context(|| format!("append to output log: {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("flush output log: {}", self.path.display()))?;
        Ok(())
    }
}
