use crate::error::{Result, SplitterError};
use crate::types::SplitOutcome;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes split results into an output directory.
pub struct OutputWriter {
    output_dir: PathBuf,
    force: bool,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            force,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn archive_path(&self, archive_name: &str) -> PathBuf {
        self.output_dir.join(archive_name)
    }

    /// Fails if the archive already exists and overwriting was not requested.
    pub fn check_target(&self, archive_name: &str) -> Result<PathBuf> {
        let path = self.archive_path(archive_name);
        if path.exists() && !self.force {
            return Err(SplitterError::OutputDirectory {
                reason: format!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                ),
            });
        }
        Ok(path)
    }

    pub async fn ensure_output_directory(&self) -> Result<()> {
        if !self.output_dir.exists() {
            tokio::fs::create_dir_all(&self.output_dir)
                .await
                .map_err(|e| SplitterError::OutputDirectory {
                    reason: format!("Failed to create output directory: {}", e),
                })?;
            info!("Created output directory: {}", self.output_dir.display());
        }
        Ok(())
    }

    /// Writes the parts (when `unpacked`) and then the archive.
    ///
    /// The archive is written last, so its presence means every other file of
    /// the run was written.
    pub async fn write_outcome(
        &self,
        archive_name: &str,
        outcome: &SplitOutcome,
        unpacked: bool,
    ) -> Result<PathBuf> {
        let archive_path = self.check_target(archive_name)?;
        self.ensure_output_directory().await?;

        if unpacked {
            for doc in &outcome.outputs {
                let path = self.output_dir.join(&doc.name);
                write_atomically(&path, &doc.content).await?;
                info!(
                    "  - {} (pages {}-{})",
                    path.display(),
                    doc.range.start + 1,
                    doc.range.end
                );
            }
        }

        write_atomically(&archive_path, &outcome.archive).await?;
        info!("Archive written to {}", archive_path.display());

        Ok(archive_path)
    }
}

/// Writes to a sibling `.partial` file and renames it into place, so a failed
/// write never leaves a truncated file under the final name.
pub async fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let partial = partial_path(path);

    if let Err(e) = write_then_rename(&partial, path, content).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(SplitterError::Packaging {
            reason: format!("Failed to write {}: {}", path.display(), e),
        });
    }

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    PathBuf::from(partial)
}

async fn write_then_rename(partial: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(partial, content).await?;
    tokio::fs::rename(partial, path).await
}
